use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] depot_core::Error),
    #[error(transparent)]
    Config(#[from] depot_core::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No user type given. Pass --user-type or set DEPOT_USER_TYPE")]
    MissingUserType,
    #[error("No user id given. Pass --user-id or set DEPOT_USER_ID")]
    MissingUserId,
    #[error("No notification payload provided")]
    EmptyPayload,
    #[error("Sync failed: {0}")]
    SyncFailed(String),
}
