//! Supply Ledger Core
//!
//! State-transition primitives for a permissioned supply-chain ledger:
//! material and product inventory, catalog prices, token balances and the
//! provenance index, all expressed as mutations on an ordered key-value
//! store.
//!
//! # Architecture
//!
//! - **Composite keys**: multi-segment keys whose prefixes scan in order
//! - **Transaction context**: every call buffers writes and one audit event,
//!   committed atomically by the host or dropped on error
//! - **Scan-to-plan**: inventory draws are planned in full before any write

#![forbid(unsafe_code)]
//!
//! # Invariants
//!
//! - Token conservation: supply changes only through mint and burn
//! - Inventory conservation: transfers move quantity, never create it
//! - No zero entries: exhausted inventory entries and balances are deleted
//! - One owner: each product unit has exactly one inventory entry

#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod balance;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod inventory;
pub mod keys;
pub mod metrics;
pub mod product;
pub mod storage;
pub mod types;

// Re-exports
pub use config::{AuthorityConfig, Config};
pub use context::TxContext;
pub use error::{Error, Result};
pub use events::{AuditEvent, EventName};
pub use metrics::Metrics;
pub use storage::{KvStore, MemoryStore, RocksStore, WriteSet};
pub use types::{AssetClass, Identity, MaterialLot, Product, RoleClass};
