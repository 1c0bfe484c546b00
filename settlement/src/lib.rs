//! Supply Settlement
//!
//! Escrowed orders between buyers and producers, and the host that runs
//! supply-chain calls against the ledger core.
//!
//! # Architecture
//!
//! Every external call is a function name, string arguments and a caller
//! identity. The host turns it into a transaction:
//!
//! 1. **Admission**: the actor assigns a request id and timestamp
//! 2. **Dispatch**: the contract table parses arguments and runs the operation
//! 3. **Commit**: buffered writes and the audit event are committed together,
//!    or dropped entirely when the operation fails
//!
//! # Order lifecycle
//!
//! `Pending` → `Settled`, exactly once, through confirmation (goods move,
//! producer is paid) or cancellation (escrow split by who cancels).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use supply_ledger_core::{AuthorityConfig, MemoryStore, Metrics};
//! use supply_settlement::{spawn_host, Executor};
//!
//! #[tokio::main]
//! async fn main() -> supply_settlement::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let metrics = Metrics::new().expect("metrics");
//!     let host = spawn_host(Executor::new(store, AuthorityConfig::default(), metrics), 1000);
//!
//!     host.invoke("payment", "mint", vec!["buyer".into(), "1000".into()]).await?;
//!     let receipt = host.invoke("buyer", "balanceOf", vec!["buyer".into()]).await?;
//!     println!("{}", receipt.payload);
//!
//!     host.shutdown().await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod executor;
pub mod telemetry;
pub mod types;

// Re-exports
pub use actor::{spawn_host, HostHandle};
pub use config::{Backend, Config};
pub use contract::Contract;
pub use error::{Error, Result};
pub use executor::Executor;
pub use telemetry::TelemetryState;
pub use types::{Invocation, Order, OrderResolution, OrderStatus, Receipt};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};
    use supply_ledger_core::{AuthorityConfig, Identity, MemoryStore, Result, TxContext};

    static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

    pub(crate) fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    /// Run `f` as one call by `caller`, committing only on success
    pub(crate) fn run<T>(
        store: &MemoryStore,
        caller: &str,
        f: impl FnOnce(&mut TxContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let authority = AuthorityConfig::default();
        let request_id = format!("order-{}", NEXT_REQUEST.fetch_add(1, Ordering::Relaxed));
        let mut tx = TxContext::new(store, &authority, id(caller), request_id, chrono::Utc::now());
        let out = f(&mut tx)?;
        tx.commit()?;
        Ok(out)
    }
}
