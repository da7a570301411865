//! Error types for depot-core

use thiserror::Error;

/// Result type alias using depot-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classes surfaced to callers of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport, timeout or HTTP status failure
    Network,
    /// Local write/read failure
    Database,
    /// Server answered 200 but reported a non-success status
    Server,
    /// Malformed input that never reached the network or the store
    Validation,
}

/// Errors that can occur in depot-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (connection refused, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the download API
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Server reported a non-success status inside a 200 response
    #[error("Server error: {0}")]
    Server(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// A downloaded record could not be written to its mirror table
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Push payload could not be decoded
    #[error("Invalid notification payload: {0}")]
    InvalidPayload(String),

    /// A full sync run is already active
    #[error("A full sync is already running")]
    SyncInProgress,

    /// The orchestrator must be acknowledged before another run starts
    #[error("Sync orchestrator is {0}; acknowledge it before starting a new run")]
    SyncNotIdle(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Classify this error into the engine's failure taxonomy.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) | Self::Http(_) | Self::HttpStatus { .. } => FailureKind::Network,
            Self::Server(_) => FailureKind::Server,
            Self::Database(_) | Self::LibSql(_) | Self::InvalidRecord(_) | Self::Io(_) => {
                FailureKind::Database
            }
            Self::InvalidInput(_)
            | Self::InvalidPayload(_)
            | Self::SyncInProgress
            | Self::SyncNotIdle(_)
            | Self::Serialization(_) => FailureKind::Validation,
        }
    }
}
