//! depot-core - Core library for Depot
//!
//! This crate contains the table catalog, the local libSQL mirror, the
//! download API client and the sync engine shared by every Depot front end.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use catalog::{TableDescriptor, catalog, descriptor};
pub use config::{ClientConfig, ConfigError};
pub use error::{Error, FailureKind, Result};
pub use fetch::{BatchFetcher, HttpBatchFetcher};
pub use models::{TableId, UserType};
pub use services::DatabaseService;
pub use sync::{SyncEngine, SyncSession};
