//! Core types for the order engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use supply_ledger_core::{AssetClass, AuditEvent, Identity};

/// Order status
///
/// An order leaves `Pending` exactly once, through confirmation or
/// cancellation; `Settled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Escrow held, awaiting confirm or cancel
    Pending,
    /// Escrow released
    Settled,
}

/// How a settled order was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderResolution {
    /// Payer confirmed delivery; producer received the full amount
    Confirmed,
    /// Payer or producer cancelled
    #[serde(rename_all = "camelCase")]
    Cancelled {
        /// Identity that cancelled
        cancelled_by: Identity,
        /// Escrow returned to the payer
        return_to_payer: u64,
        /// Escrow paid to the producer as compensation
        pay_to_producer: u64,
    },
}

/// Escrowed purchase of `count` units of `item_kind` from `producer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Request id of the call that created the order
    pub order_id: String,
    /// Buyer whose balance is held in escrow
    pub payer: Identity,
    /// Seller
    pub producer: Identity,
    /// Escrowed amount: listed price times count
    pub amount: u64,
    /// Units ordered
    pub count: u64,
    /// Material or product kind
    pub item_kind: String,
    /// Whether the order moves materials or products
    pub order_class: AssetClass,
    /// Host timestamp of creation
    pub created_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Host timestamp of settlement
    pub settled_at: Option<DateTime<Utc>>,
    /// Set together with `Settled`
    pub resolution: Option<OrderResolution>,
}

impl Order {
    /// True while the order still holds escrow
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// One external call as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    /// Entry-point name, e.g. `makeMaterialOrder`
    pub function: String,
    /// Positional string arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Authenticated caller identity
    pub caller: String,
    /// Unique request id
    pub request_id: String,
    /// Host timestamp
    pub timestamp: DateTime<Utc>,
}

/// Result of a successful call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Request id the call ran under
    pub request_id: String,
    /// Response payload; `null` for calls that return nothing
    pub payload: serde_json::Value,
    /// Audit event committed with the call
    pub event: Option<AuditEvent>,
}
