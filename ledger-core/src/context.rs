//! Per-request transaction context
//!
//! A `TxContext` carries what the host hands to every call (caller identity,
//! request id, timestamp) and buffers the call's writes in an ordered overlay
//! on top of the store. Reads and prefix scans see the call's own writes.
//! Nothing reaches the store until [`TxContext::commit`]; dropping the
//! context discards the call.

use crate::{
    config::AuthorityConfig,
    events::{AuditEvent, EventName},
    storage::{Entry, KvStore, WriteSet},
    types::{Identity, RoleClass},
    Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Transaction context for a single request
pub struct TxContext<'a> {
    store: &'a dyn KvStore,
    authority: &'a AuthorityConfig,
    caller: Identity,
    request_id: String,
    timestamp: DateTime<Utc>,
    writes: WriteSet,
    event: Option<AuditEvent>,
}

impl std::fmt::Debug for TxContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxContext")
            .field("caller", &self.caller)
            .field("request_id", &self.request_id)
            .field("pending_writes", &self.writes.len())
            .finish()
    }
}

impl<'a> TxContext<'a> {
    /// Open a context over `store`
    pub fn new(
        store: &'a dyn KvStore,
        authority: &'a AuthorityConfig,
        caller: Identity,
        request_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            store,
            authority,
            caller,
            request_id: request_id.into(),
            timestamp,
            writes: WriteSet::default(),
            event: None,
        }
    }

    /// Caller identity
    pub fn caller(&self) -> &Identity {
        &self.caller
    }

    /// Caller's role class
    pub fn caller_class(&self) -> RoleClass {
        self.caller.role_class(self.authority)
    }

    /// Role configuration
    pub fn authority(&self) -> &AuthorityConfig {
        self.authority
    }

    /// Host-assigned request id
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Host timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Point read through the overlay
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.map(<[u8]>::to_vec)),
            None => self.store.get(key),
        }
    }

    /// Prefix scan through the overlay, ascending by key
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<Entry>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan_prefix(prefix)?.into_iter().collect();
        for (key, op) in self.writes.scan_prefix(prefix) {
            match op {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Buffer a put
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.put(key, value);
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: Vec<u8>) {
        self.writes.delete(key);
    }

    /// Set the call's audit event
    ///
    /// A call carries one event slot; a later event replaces an earlier one,
    /// so the outermost operation's event is the one committed.
    pub fn set_event<T: Serialize>(&mut self, name: EventName, payload: &T) -> Result<()> {
        let payload = serde_json::to_value(payload)?;
        if let Some(previous) = &self.event {
            tracing::debug!(
                request_id = %self.request_id,
                superseded = %previous.name,
                by = %name,
                "Audit event superseded"
            );
        }
        self.event = Some(AuditEvent {
            name,
            request_id: self.request_id.clone(),
            timestamp: self.timestamp,
            payload,
        });
        Ok(())
    }

    /// Event currently set for this call
    pub fn event(&self) -> Option<&AuditEvent> {
        self.event.as_ref()
    }

    /// Number of buffered writes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Commit buffered writes and the event atomically
    pub fn commit(self) -> Result<Option<AuditEvent>> {
        self.store.commit(&self.writes, self.event.as_ref())?;
        Ok(self.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn ctx<'a>(store: &'a MemoryStore, authority: &'a AuthorityConfig) -> TxContext<'a> {
        TxContext::new(
            store,
            authority,
            Identity::new("buyer").unwrap(),
            "tx-1",
            Utc::now(),
        )
    }

    #[test]
    fn test_overlay_reads_own_writes() {
        let store = MemoryStore::new();
        let authority = AuthorityConfig::default();
        let mut tx = ctx(&store, &authority);

        tx.put(b"k".to_vec(), b"v".to_vec());
        assert_eq!(tx.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get(b"k").unwrap(), None);

        tx.delete(b"k".to_vec());
        assert_eq!(tx.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_scan_merges_overlay_in_order() {
        let store = MemoryStore::new();
        let mut seed = WriteSet::default();
        seed.put(b"p/1".to_vec(), b"a".to_vec());
        seed.put(b"p/3".to_vec(), b"c".to_vec());
        store.commit(&seed, None).unwrap();

        let authority = AuthorityConfig::default();
        let mut tx = ctx(&store, &authority);
        tx.put(b"p/2".to_vec(), b"b".to_vec());
        tx.delete(b"p/3".to_vec());
        tx.put(b"q/1".to_vec(), b"x".to_vec());

        let scanned = tx.scan_prefix(b"p/").unwrap();
        assert_eq!(
            scanned,
            vec![
                (b"p/1".to_vec(), b"a".to_vec()),
                (b"p/2".to_vec(), b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn test_drop_discards_and_commit_applies() {
        let store = MemoryStore::new();
        let authority = AuthorityConfig::default();

        let mut tx = ctx(&store, &authority);
        tx.put(b"k".to_vec(), b"v".to_vec());
        drop(tx);
        assert!(store.is_empty());

        let mut tx = ctx(&store, &authority);
        tx.put(b"k".to_vec(), b"v".to_vec());
        tx.set_event(EventName::Mint, &serde_json::json!({ "amount": 1 }))
            .unwrap();
        tx.set_event(EventName::Burn, &serde_json::json!({ "amount": 1 }))
            .unwrap();
        let event = tx.commit().unwrap().unwrap();

        assert_eq!(event.name, EventName::Burn);
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.audit_log().unwrap().len(), 1);
    }
}
