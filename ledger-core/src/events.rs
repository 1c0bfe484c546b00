//! Audit events emitted by state-mutating calls

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventName {
    /// Material batch registered
    MaterialCreated,
    /// Material drawn down by its owner
    MaterialConsumed,
    /// Material moved between owners
    MaterialTransferred,
    /// Product unit registered
    ProductCreated,
    /// Product unit changed owner
    ProductOwnerChanged,
    /// Order created and escrowed
    MakeOrder,
    /// Order confirmed and paid out
    ConfirmOrder,
    /// Order cancelled and escrow split
    CancelOrder,
    /// Material price updated
    MaterialPriceSet,
    /// Product price updated
    ProductPriceSet,
    /// Cancel compensation updated
    CancelCompensateSet,
    /// Tokens minted
    Mint,
    /// Tokens burned
    Burn,
}

impl EventName {
    /// Name as published to auditors
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::MaterialCreated => "MaterialCreated",
            EventName::MaterialConsumed => "MaterialConsumed",
            EventName::MaterialTransferred => "MaterialTransferred",
            EventName::ProductCreated => "ProductCreated",
            EventName::ProductOwnerChanged => "ProductOwnerChanged",
            EventName::MakeOrder => "MakeOrder",
            EventName::ConfirmOrder => "ConfirmOrder",
            EventName::CancelOrder => "CancelOrder",
            EventName::MaterialPriceSet => "MaterialPriceSet",
            EventName::ProductPriceSet => "ProductPriceSet",
            EventName::CancelCompensateSet => "CancelCompensateSet",
            EventName::Mint => "Mint",
            EventName::Burn => "Burn",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event committed together with the writes of one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Event name
    pub name: EventName,
    /// Request that produced the event
    pub request_id: String,
    /// Host timestamp of the request
    pub timestamp: DateTime<Utc>,
    /// Resulting record or delta
    pub payload: serde_json::Value,
}
