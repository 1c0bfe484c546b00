//! Synchronous call executor
//!
//! Runs one invocation at a time: opens a transaction context for the
//! caller, dispatches the entry point, and commits the buffered writes with
//! the call's audit event only if the entry point succeeded. A failed call
//! leaves the store untouched.

use crate::{
    contract::Contract,
    types::{Invocation, Receipt},
    Result,
};
use std::sync::Arc;
use std::time::Instant;
use supply_ledger_core::{AuditEvent, AuthorityConfig, Identity, KvStore, Metrics, TxContext};

/// Executes invocations against a store
pub struct Executor {
    store: Arc<dyn KvStore>,
    authority: AuthorityConfig,
    contract: Contract,
    metrics: Metrics,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("authority", &self.authority)
            .field("contract", &self.contract)
            .finish()
    }
}

impl Executor {
    /// Create executor over `store`
    pub fn new(store: Arc<dyn KvStore>, authority: AuthorityConfig, metrics: Metrics) -> Self {
        Self {
            store,
            authority,
            contract: Contract::new(),
            metrics,
        }
    }

    /// Run one invocation, committing on success
    pub fn invoke(&self, invocation: &Invocation) -> Result<Receipt> {
        let start = Instant::now();
        let label = self.metric_label(&invocation.function);

        let result = self.execute(invocation);
        self.metrics
            .record_invocation(label, start.elapsed().as_secs_f64());

        match &result {
            Ok(receipt) => {
                if let Some(event) = &receipt.event {
                    self.metrics.record_event(event.name.as_str());
                }
                tracing::debug!(
                    request_id = %invocation.request_id,
                    function = %invocation.function,
                    caller = %invocation.caller,
                    "Call committed"
                );
            }
            Err(err) => {
                self.metrics.record_failure(label, err.code());
                tracing::warn!(
                    request_id = %invocation.request_id,
                    function = %invocation.function,
                    caller = %invocation.caller,
                    code = err.code(),
                    error = %err,
                    "Call rejected"
                );
            }
        }

        Ok(result?)
    }

    /// Committed audit events in commit order
    pub fn audit_log(&self) -> Result<Vec<AuditEvent>> {
        Ok(self.store.audit_log()?)
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Entry-point table
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    fn execute(&self, invocation: &Invocation) -> supply_ledger_core::Result<Receipt> {
        let caller = Identity::new(invocation.caller.as_str())?;
        let mut tx = TxContext::new(
            self.store.as_ref(),
            &self.authority,
            caller,
            invocation.request_id.as_str(),
            invocation.timestamp,
        );

        let payload = self
            .contract
            .dispatch(&mut tx, &invocation.function, &invocation.args)?;
        let event = tx.commit()?;

        Ok(Receipt {
            request_id: invocation.request_id.clone(),
            payload,
            event,
        })
    }

    /// Unknown names share one label so callers cannot grow the metric set
    fn metric_label<'a>(&self, function: &'a str) -> &'a str {
        if self.contract.contains(function) {
            function
        } else {
            "unknown"
        }
    }
}
