//! Ordered key-value store contract and its backends
//!
//! The ledger only needs point reads, ordered prefix scans, and an atomic
//! commit of a call's buffered writes together with its audit event.
//!
//! # RocksDB column families
//!
//! - `state` - Ledger state (key: composite key)
//! - `events` - Audit log (key: sequence number, big-endian)

use crate::{
    error::{Error, Result},
    events::AuditEvent,
    Config,
};
use parking_lot::{Mutex, RwLock};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column family names
const CF_STATE: &str = "state";
const CF_EVENTS: &str = "events";

/// Key/value pair returned by scans
pub type Entry = (Vec<u8>, Vec<u8>);

/// Ordered key-value store
pub trait KvStore: Send + Sync {
    /// Point read
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, in ascending key order
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<Entry>>;

    /// Apply `writes` and append `event` atomically
    fn commit(&self, writes: &WriteSet, event: Option<&AuditEvent>) -> Result<()>;

    /// Committed audit events, oldest first
    fn audit_log(&self) -> Result<Vec<AuditEvent>>;
}

/// Buffered puts and deletes, ordered by key
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    ops: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteSet {
    /// Buffer a put
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.insert(key, Some(value));
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.insert(key, None);
    }

    /// `Some(None)` for a buffered delete, `None` when the key is untouched
    pub fn get(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.ops.get(key).map(|v| v.as_deref())
    }

    /// Buffered operations under `prefix`, in key order
    pub fn scan_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Option<Vec<u8>>)> + 'a {
        self.ops
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
    }

    /// All buffered operations in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Option<Vec<u8>>)> {
        self.ops.iter()
    }

    /// Number of buffered operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// In-memory store backed by a B-tree
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// True when no key is stored
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.state.read().get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<Entry>> {
        Ok(self
            .state
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn commit(&self, writes: &WriteSet, event: Option<&AuditEvent>) -> Result<()> {
        let mut state = self.state.write();
        let mut events = self.events.write();
        for (key, op) in writes.iter() {
            match op {
                Some(value) => {
                    state.insert(key.clone(), value.clone());
                }
                None => {
                    state.remove(key);
                }
            }
        }
        if let Some(event) = event {
            events.push(event.clone());
        }
        Ok(())
    }

    fn audit_log(&self) -> Result<Vec<AuditEvent>> {
        Ok(self.events.read().clone())
    }
}

/// Persistent store using RocksDB
pub struct RocksStore {
    db: Arc<DB>,
    /// Next audit sequence number; held across the write to keep it gapless
    next_event_seq: Mutex<u64>,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_STATE, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_events()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        let next_event_seq = Self::last_event_seq(&db)?.map_or(0, |seq| seq + 1);

        tracing::info!(path = ?path, next_event_seq, "Opened RocksDB state store");

        Ok(Self {
            db: Arc::new(db),
            next_event_seq: Mutex::new(next_event_seq),
        })
    }

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // State is frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_events() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn last_event_seq(db: &DB) -> Result<Option<u64>> {
        let cf = db
            .cf_handle(CF_EVENTS)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_EVENTS)))?;
        match db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(Some(crate::types::decode_u64(&key)?))
            }
            None => Ok(None),
        }
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

impl KvStore for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(CF_STATE)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<Entry>> {
        let cf = self.cf_handle(CF_STATE)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        let mut out = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.into_vec(), value.into_vec()));
        }
        Ok(out)
    }

    fn commit(&self, writes: &WriteSet, event: Option<&AuditEvent>) -> Result<()> {
        let cf_state = self.cf_handle(CF_STATE)?;
        let cf_events = self.cf_handle(CF_EVENTS)?;

        let mut next_seq = self.next_event_seq.lock();
        let mut batch = WriteBatch::default();
        for (key, op) in writes.iter() {
            match op {
                Some(value) => batch.put_cf(cf_state, key, value),
                None => batch.delete_cf(cf_state, key),
            }
        }
        if let Some(event) = event {
            batch.put_cf(cf_events, next_seq.to_be_bytes(), serde_json::to_vec(event)?);
        }

        // Atomic commit
        self.db.write(batch)?;

        if event.is_some() {
            *next_seq += 1;
        }
        tracing::debug!(writes = writes.len(), "Committed write set");
        Ok(())
    }

    fn audit_log(&self) -> Result<Vec<AuditEvent>> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let mut events = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            events.push(serde_json::from_slice(&value)?);
        }
        Ok(events)
    }
}
