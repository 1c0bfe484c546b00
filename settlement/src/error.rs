//! Error types for the settlement layer

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error, carrying the caller-facing taxonomy
    #[error("{0}")]
    Ledger(#[from] supply_ledger_core::Error),

    /// Host actor unavailable
    #[error("Host error: {0}")]
    Host(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code returned to callers next to the message
    pub fn code(&self) -> &'static str {
        match self {
            Error::Ledger(err) => err.code(),
            Error::Host(_) => "HostUnavailable",
            Error::Config(_) => "InvalidConfiguration",
            Error::Io(_) => "InternalStorageError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_code_passes_through() {
        let err: Error = supply_ledger_core::Error::InvalidState("settled".into()).into();
        assert_eq!(err.code(), "InvalidState");
        assert_eq!(err.to_string(), "Invalid state: settled");
    }

    #[test]
    fn test_host_and_config_codes() {
        assert_eq!(Error::Host("closed".into()).code(), "HostUnavailable");
        assert_eq!(Error::Config("bad".into()).code(), "InvalidConfiguration");
    }
}
