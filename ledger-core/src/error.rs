//! Error types for the ledger core

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Every variant is terminal for the current call: the host discards all
/// writes buffered by the call that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// Wrong arity, unparsable number, or malformed identifier
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Role or identity check failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Order, lot or product absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate batch id or product id
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Debit larger than the current balance
    #[error("Insufficient balance: {role} holds {available}, needs {requested}")]
    InsufficientBalance {
        /// Account being debited
        role: String,
        /// Current balance
        available: u64,
        /// Requested debit
        requested: u64,
    },

    /// Draw larger than the held quantity
    #[error("Insufficient inventory: {owner} holds {available} {kind}, needs {requested}")]
    InsufficientInventory {
        /// Owner being drawn from
        owner: String,
        /// Material or product kind
        kind: String,
        /// Total held quantity
        available: u64,
        /// Requested quantity
        requested: u64,
    },

    /// Order is not in the state the operation requires
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Transfer whose source and destination coincide
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    /// Listed price exceeds the buyer's ceiling
    #[error("Price mismatch: offered {offered}, listed {listed}")]
    PriceMismatch {
        /// Buyer's maximum price
        offered: u64,
        /// Current catalog price
        listed: u64,
    },

    /// No catalog price for the producer and kind
    #[error("Price not set: {producer} has no price for {kind}")]
    PriceNotSet {
        /// Producer queried
        producer: String,
        /// Kind queried
        kind: String,
    },

    /// Fixed-width arithmetic overflow
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Storage error (RocksDB or malformed stored value)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON payload error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code returned to callers next to the message
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidArguments(_) => "InvalidArguments",
            Error::Unauthorized(_) => "Unauthorized",
            Error::NotFound(_) => "NotFound",
            Error::AlreadyExists(_) => "AlreadyExists",
            Error::InsufficientBalance { .. } => "InsufficientBalance",
            Error::InsufficientInventory { .. } => "InsufficientInventory",
            Error::InvalidState(_) => "InvalidState",
            Error::InvalidTransfer(_) => "InvalidTransfer",
            Error::PriceMismatch { .. } => "PriceMismatch",
            Error::PriceNotSet { .. } => "PriceNotSet",
            Error::Overflow(_) => "Overflow",
            Error::Config(_) => "InvalidConfiguration",
            Error::Storage(_) | Error::Serialization(_) | Error::Json(_) | Error::Io(_) => {
                "InternalStorageError"
            }
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
