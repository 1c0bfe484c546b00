//! Single-writer host
//!
//! All invocations flow through one actor task that owns the executor, so
//! calls are applied strictly one at a time and each commits or fails as a
//! whole:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               HostHandle (Clone)                      │
//! │   assigns request id + timestamp, sends to mailbox   │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               HostActor (Single Task)                 │
//! │      Executor::invoke → commit or discard             │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::{
    executor::Executor,
    types::{Invocation, Receipt},
    Error, Result,
};
use chrono::Utc;
use supply_ledger_core::AuditEvent;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the host actor
#[derive(Debug)]
pub enum HostMessage {
    /// Run one invocation
    Invoke {
        /// Call to run
        invocation: Invocation,
        /// Reply channel
        response: oneshot::Sender<Result<Receipt>>,
    },

    /// Read the committed audit log
    AuditLog {
        /// Reply channel
        response: oneshot::Sender<Result<Vec<AuditEvent>>>,
    },

    /// Stop after the messages already queued ahead of this one
    Shutdown {
        /// Acknowledged once the actor has stopped and released the store
        response: oneshot::Sender<()>,
    },
}

/// Actor that owns the executor
#[derive(Debug)]
pub struct HostActor {
    executor: Executor,
    mailbox: mpsc::Receiver<HostMessage>,
}

impl HostActor {
    /// Create new actor
    pub fn new(executor: Executor, mailbox: mpsc::Receiver<HostMessage>) -> Self {
        Self { executor, mailbox }
    }

    /// Run the actor event loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        tracing::info!("Host actor started");
        let mut shutdown_ack = None;

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                HostMessage::Invoke {
                    invocation,
                    response,
                } => {
                    let result = self.executor.invoke(&invocation);
                    if response.send(result).is_err() {
                        tracing::debug!(
                            request_id = %invocation.request_id,
                            "Caller went away before the reply"
                        );
                    }
                }

                HostMessage::AuditLog { response } => {
                    let _ = response.send(self.executor.audit_log());
                }

                HostMessage::Shutdown { response } => {
                    self.mailbox.close();
                    shutdown_ack = Some(response);
                    break;
                }
            }
        }

        // Release the store before acknowledging so callers can reopen it
        drop(self.executor);
        tracing::info!("Host actor stopped");
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }
}

/// Handle for sending calls to the actor
#[derive(Clone, Debug)]
pub struct HostHandle {
    sender: mpsc::Sender<HostMessage>,
}

impl HostHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<HostMessage>) -> Self {
        Self { sender }
    }

    /// Invoke `function` as `caller`
    ///
    /// The host assigns a fresh time-ordered request id and the current time.
    pub async fn invoke(
        &self,
        caller: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
    ) -> Result<Receipt> {
        let invocation = Invocation {
            function: function.into(),
            args,
            caller: caller.into(),
            request_id: Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
        };
        self.submit(invocation).await
    }

    /// Submit a fully formed invocation
    pub async fn submit(&self, invocation: Invocation) -> Result<Receipt> {
        let (tx, rx) = oneshot::channel();
        self.send(HostMessage::Invoke {
            invocation,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Host("Response channel closed".to_string()))?
    }

    /// Committed audit events in commit order
    pub async fn audit_log(&self) -> Result<Vec<AuditEvent>> {
        let (tx, rx) = oneshot::channel();
        self.send(HostMessage::AuditLog { response: tx }).await?;

        rx.await
            .map_err(|_| Error::Host("Response channel closed".to_string()))?
    }

    /// Shutdown actor, waiting for it to stop
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(HostMessage::Shutdown { response: tx }).await?;

        rx.await
            .map_err(|_| Error::Host("Response channel closed".to_string()))
    }

    async fn send(&self, msg: HostMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Host("Actor mailbox closed".to_string()))
    }
}

/// Spawn the host actor
pub fn spawn_host(executor: Executor, mailbox_capacity: usize) -> HostHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = HostActor::new(executor, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    HostHandle::new(tx)
}
