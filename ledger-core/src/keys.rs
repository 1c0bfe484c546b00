//! Composite key encoding for the ordered state store
//!
//! Key format: {namespace:1}{segment}{0x00}{segment}{0x00}...
//!
//! Every segment is terminated by `0x00`, and segments may not contain it.
//! Since `0x00` is the lowest byte, encoding the first N segments of a key
//! yields a prefix whose ascending scan visits exactly the keys that share
//! those segments, ordered by the remaining ones.

use crate::{Error, Result};

const SEPARATOR: u8 = 0x00;

/// Key namespaces, one per record family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Namespace {
    /// (owner, materialKind, batchId) => quantity
    MaterialInventory = 0x01,
    /// (identity) => balance
    Balance = 0x02,
    /// (batchId) => MaterialLot
    MaterialLot = 0x03,
    /// (producer, materialKind) => price
    MaterialPrice = 0x04,
    /// (producer, productKind) => price
    ProductPrice = 0x05,
    /// (productId) => Product
    Product = 0x06,
    /// (materialBatchId, productId) => marker
    Provenance = 0x07,
    /// (owner, productKind, productId) => marker
    ProductInventory = 0x08,
    /// (orderId) => Order
    Order = 0x09,
    /// () => ratio
    CancelCompensate = 0x10,
}

impl Namespace {
    fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => Namespace::MaterialInventory,
            0x02 => Namespace::Balance,
            0x03 => Namespace::MaterialLot,
            0x04 => Namespace::MaterialPrice,
            0x05 => Namespace::ProductPrice,
            0x06 => Namespace::Product,
            0x07 => Namespace::Provenance,
            0x08 => Namespace::ProductInventory,
            0x09 => Namespace::Order,
            0x10 => Namespace::CancelCompensate,
            _ => return None,
        })
    }
}

/// Decoded composite key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKey {
    /// Record family
    pub namespace: Namespace,
    /// Ordered key segments
    pub segments: Vec<String>,
}

impl CompositeKey {
    /// Build a key, validating every segment
    pub fn new<S: AsRef<str>>(namespace: Namespace, segments: &[S]) -> Result<Self> {
        let segments = segments
            .iter()
            .map(|s| {
                let s = s.as_ref();
                check_segment(s)?;
                Ok(s.to_string())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { namespace, segments })
    }

    /// Encode to the store's byte form
    pub fn encode(&self) -> Vec<u8> {
        encode_parts(self.namespace, &self.segments)
    }

    /// Decode from the store's byte form
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| Error::Storage("empty key".to_string()))?;
        let namespace = Namespace::from_byte(tag)
            .ok_or_else(|| Error::Storage(format!("unknown key namespace {:#04x}", tag)))?;

        let body = match rest.split_last() {
            None => &[][..],
            Some((&SEPARATOR, body)) => body,
            Some(_) => return Err(Error::Storage("unterminated key segment".to_string())),
        };
        let segments = if rest.is_empty() {
            Vec::new()
        } else {
            body.split(|b| *b == SEPARATOR)
                .map(|s| {
                    String::from_utf8(s.to_vec())
                        .map_err(|e| Error::Storage(format!("invalid utf8 key segment: {}", e)))
                })
                .collect::<Result<Vec<_>>>()?
        };
        Ok(Self { namespace, segments })
    }

    /// Segment at `index`, failing on keys of the wrong shape
    pub fn segment(&self, index: usize) -> Result<&str> {
        self.segments
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::Storage(format!(
                    "{:?} key has {} segments, wanted index {}",
                    self.namespace,
                    self.segments.len(),
                    index
                ))
            })
    }
}

/// Encode a full key directly
pub fn key<S: AsRef<str>>(namespace: Namespace, segments: &[S]) -> Result<Vec<u8>> {
    for s in segments {
        check_segment(s.as_ref())?;
    }
    Ok(encode_parts(namespace, segments))
}

/// Encode a scan prefix from the leading segments of a key
pub fn prefix<S: AsRef<str>>(namespace: Namespace, leading: &[S]) -> Result<Vec<u8>> {
    key(namespace, leading)
}

fn encode_parts<S: AsRef<str>>(namespace: Namespace, segments: &[S]) -> Vec<u8> {
    let len = 1 + segments.iter().map(|s| s.as_ref().len() + 1).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    out.push(namespace as u8);
    for s in segments {
        out.extend_from_slice(s.as_ref().as_bytes());
        out.push(SEPARATOR);
    }
    out
}

fn check_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::InvalidArguments("key segment is empty".to_string()));
    }
    if segment.as_bytes().contains(&SEPARATOR) {
        return Err(Error::InvalidArguments(format!(
            "key segment {:?} contains a NUL byte",
            segment
        )));
    }
    Ok(())
}
