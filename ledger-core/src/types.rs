//! Core types for the ledger
//!
//! Records are stored with bincode and rendered to callers as camelCase JSON.
//! Counted quantities (inventory, balances, prices) are plain `u64` values
//! stored as 8 big-endian bytes.

use crate::config::AuthorityConfig;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller identity handed over by the host runtime
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create identity, rejecting values that cannot be a key segment
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.contains('\0') {
            return Err(Error::InvalidArguments(format!("invalid identity {:?}", id)));
        }
        Ok(Self(id))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify against the configured role prefixes
    pub fn role_class(&self, authority: &AuthorityConfig) -> RoleClass {
        if self.0 == authority.payment_authority {
            RoleClass::PaymentAuthority
        } else if self.0.starts_with(&authority.material_producer_prefix) {
            RoleClass::MaterialProducer
        } else if self.0.starts_with(&authority.product_producer_prefix) {
            RoleClass::ProductProducer
        } else {
            RoleClass::Buyer
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authorization class of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleClass {
    /// Registers and sells bulk materials
    MaterialProducer,
    /// Registers and sells finished products
    ProductProducer,
    /// Mints, burns and sets the cancel compensation
    PaymentAuthority,
    /// Any other participant
    Buyer,
}

/// The two asset classes tracked by the inventory ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Bulk material, counted by quantity per batch
    Material,
    /// Finished product, tracked per unit
    Product,
}

impl AssetClass {
    /// Producer class allowed to price and register this asset
    pub fn producer_class(self) -> RoleClass {
        match self {
            AssetClass::Material => RoleClass::MaterialProducer,
            AssetClass::Product => RoleClass::ProductProducer,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Material => write!(f, "material"),
            AssetClass::Product => write!(f, "product"),
        }
    }
}

/// A registered batch of material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialLot {
    /// Producer that registered the batch
    pub producer: Identity,
    /// Registration time (host timestamp)
    pub created_at: DateTime<Utc>,
    /// Batch id, unique across the ledger
    pub batch_id: String,
    /// Material kind, e.g. "LCD"
    pub material_kind: String,
    /// Quantity registered
    pub total_quantity: u64,
}

/// A unit-tracked finished product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Current owner
    pub owner: Identity,
    /// Registration time (host timestamp)
    pub created_at: DateTime<Utc>,
    /// Product batch id
    pub batch_id: String,
    /// Material batches consumed by this product
    pub material_batches: Vec<String>,
    /// Product kind, e.g. "TV"
    pub product_kind: String,
}

/// Encode a counted quantity
pub fn encode_u64(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Decode a counted quantity, rejecting anything that is not 8 bytes
pub fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        Error::Storage(format!("expected 8-byte integer, found {} bytes", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(raw))
}

/// Serialize a stored record
pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(record)?)
}

/// Deserialize a stored record
pub fn decode_record<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}
