//! `reqwest` implementation of the batch fetcher.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::retry::{Idempotency, RetryPolicy};
use super::{BatchFetcher, FetchMode, Page};
use crate::catalog::TableDescriptor;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{Record, value_as_i64};
use crate::util::{compact_text, normalize_text_option};

/// HTTP client for the `/{table}_downloads` endpoints.
#[derive(Clone)]
pub struct HttpBatchFetcher {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for HttpBatchFetcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpBatchFetcher")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl HttpBatchFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.clone(),
            api_token: config.api_token.clone(),
            client,
            timeout: config.http_timeout,
            retry: config.retry,
        })
    }

    /// Returns the base URL this fetcher was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query(mode: &FetchMode) -> Vec<(&'static str, String)> {
        match mode {
            FetchMode::Full(request) => vec![
                ("part_no", request.part_no.to_string()),
                ("limit", request.limit.to_string()),
                ("user_type", request.user_type.code().to_string()),
                ("user_id", request.user_id.to_string()),
                ("update_date", request.update_date.clone().unwrap_or_default()),
            ],
            FetchMode::Single { id } => vec![("id", id.to_string())],
        }
    }

    async fn get_once(&self, url: &str, query: &[(&'static str, String)]) -> Result<DownloadResponse> {
        let mut request = self
            .client
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = self.api_token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                Error::Network(format!("{url} timed out after {:?}", self.timeout))
            } else {
                Error::Http(error)
            }
        })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status,
                body: compact_text(&body),
            });
        }

        Ok(response.json::<DownloadResponse>().await?)
    }
}

#[async_trait]
impl BatchFetcher for HttpBatchFetcher {
    async fn fetch(&self, table: &TableDescriptor, mode: &FetchMode) -> Result<Page> {
        let url = format!("{}/{}", self.base_url, table.endpoint);
        let query = Self::query(mode);

        let response = self
            .retry
            .run(Idempotency::Idempotent, || self.get_once(&url, &query))
            .await?;
        response.into_page(table)
    }
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    updated_date: Option<String>,
}

impl DownloadResponse {
    fn into_page(self, table: &TableDescriptor) -> Result<Page> {
        if let Some(status) = self.status.as_ref() {
            if value_as_i64(status) != Some(1) {
                let message = normalize_text_option(self.message)
                    .unwrap_or_else(|| format!("status {status}"));
                return Err(Error::Server(format!("{}: {message}", table.name())));
            }
        }

        let records = match self.data {
            Value::Null => Vec::new(),
            Value::Array(rows) => rows
                .into_iter()
                .map(Record::from_value)
                .collect::<Result<Vec<_>>>()?,
            Value::Object(fields) if fields.is_empty() => Vec::new(),
            Value::Object(fields) => vec![Record::new(fields)],
            other => {
                return Err(Error::Server(format!(
                    "{}: unexpected data payload {}",
                    table.name(),
                    compact_text(&other.to_string())
                )));
            }
        };

        Ok(Page {
            records,
            server_update_date: normalize_text_option(self.updated_date),
        })
    }
}
