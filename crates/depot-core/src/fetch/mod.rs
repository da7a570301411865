//! Download API client abstraction.
//!
//! A [`BatchFetcher`] issues one of two request shapes against a table's
//! download endpoint: a numbered page of a full sync, or a single entity by id.
//! Transport-level retries live beneath this trait; callers only ever see the
//! post-retry outcome.

mod http;
mod retry;

use async_trait::async_trait;

use crate::catalog::TableDescriptor;
use crate::error::Result;
use crate::models::{Record, UserType};

pub use http::HttpBatchFetcher;
pub use retry::{Idempotency, RetryPolicy, is_retryable, is_retryable_status};

/// Parameters of one full-sync page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullPageRequest {
    /// Zero-based page cursor
    pub part_no: u32,
    pub limit: u32,
    pub user_type: UserType,
    pub user_id: i64,
    /// Ledger stamp of the last completed sync of this table
    pub update_date: Option<String>,
}

/// Request shape for a download endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    Full(FullPageRequest),
    Single { id: i64 },
}

/// One page of downloaded rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    /// Server-side high-water mark returned with the page
    pub server_update_date: Option<String>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Source of server rows for the sync engine.
#[async_trait]
pub trait BatchFetcher: Send + Sync {
    async fn fetch(&self, table: &TableDescriptor, mode: &FetchMode) -> Result<Page>;
}
