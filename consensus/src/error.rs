//! Error types for consensus

use thiserror::Error;

/// Result type for consensus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Consensus errors
#[derive(Error, Debug)]
pub enum Error {
    /// Engine call failed; fatal for Info/BeginBlock/EndBlock/Commit
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Envelope could not be encoded for the engine
    #[error("Marshal error: {0}")]
    Marshal(String),

    /// Envelope failed structural validation
    #[error("Invalid envelope: {0}")]
    Validation(#[from] crate::envelope::ValidationError),

    /// Block could not be persisted
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Commit returned but the engine height did not advance
    #[error("Commit of height {height} was not persisted")]
    CommitRejected {
        /// Engine height the commit should have persisted
        height: u64,
    },

    /// `start` called on a chain whose worker is already running
    #[error("Chain already started")]
    AlreadyStarted,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Failures reported by an [`EngineClient`](crate::client::EngineClient)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Connection to the engine failed
    #[error("transport failure: {0}")]
    Transport(String),

    /// Engine answered with something the protocol does not allow
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Engine connection is closed
    #[error("engine connection closed")]
    Closed,
}

impl From<ledger_core::Error> for Error {
    fn from(err: ledger_core::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
