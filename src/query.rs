//! One-shot REST calls to the backend: query submission and snapshot
//! refresh.
//!
//! ```text
//! POST /api/query   {"query": "..."}  ──▶ {"success", "result"?, "message"?}
//! GET  /api/status                     ──▶ {"success", "status"?, "message"?}
//! GET  /api/metrics                    ──▶ {"success", "metrics"?, "message"?}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BackendSettings;
use crate::error::QueryError;
use crate::source::{normalize_status, PerformanceSnapshot, SystemStatusSnapshot};

/// One row of a query result, cells in column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultRow {
    pub values: Vec<String>,
}

/// Result of a successfully executed query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    pub query_id: String,
    pub sql_query: String,
    pub execution_time_ms: u64,
    pub rows_returned: u64,
    pub status: String,
    pub results: Vec<ResultRow>,
}

impl QueryResult {
    /// Number of columns, taken from the first row.
    pub fn column_count(&self) -> usize {
        self.results.first().map(|row| row.values.len()).unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// Common response wrapper; the payload key differs per endpoint.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    #[serde(alias = "result", alias = "status", alias = "metrics")]
    payload: Option<T>,
}

impl<T> ApiResponse<T> {
    fn into_payload(self, fallback: &str) -> Result<T, QueryError> {
        if !self.success {
            return Err(QueryError::Rejected(
                self.message.unwrap_or_else(|| fallback.to_string()),
            ));
        }
        self.payload
            .ok_or_else(|| QueryError::Decode("response has no payload".to_string()))
    }
}

/// The backend calls the UI makes outside the live channel.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Submit one SQL query and wait for its result.
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError>;

    /// Fetch the current system status.
    async fn fetch_status(&self) -> Result<SystemStatusSnapshot, QueryError>;

    /// Fetch the current performance metrics.
    async fn fetch_metrics(&self) -> Result<PerformanceSnapshot, QueryError>;
}

/// HTTP implementation of [`BackendApi`].
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    query_url: String,
    status_url: String,
    metrics_url: String,
}

impl QueryClient {
    pub fn new(backend: &BackendSettings) -> Result<Self, QueryError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = backend.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let base = backend.http_base();
        Ok(Self {
            http: builder.build()?,
            query_url: format!("{}{}", base, backend.query_path),
            status_url: format!("{}{}", base, backend.status_path),
            metrics_url: format!("{}{}", base, backend.metrics_path),
        })
    }

    /// Read a JSON body regardless of the HTTP status; the backend reports
    /// validation errors as 400 with a normal response object.
    async fn read<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>, QueryError> {
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(QueryError::Status(status.as_u16())),
            Err(e) => Err(QueryError::Decode(e.to_string())),
        }
    }
}

#[async_trait]
impl BackendApi for QueryClient {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        debug!("POST {}", self.query_url);
        let response = self
            .http
            .post(&self.query_url)
            .json(&QueryRequest { query: sql })
            .send()
            .await?;
        let result = Self::read::<QueryResult>(response)
            .await?
            .into_payload("Query execution failed")?;
        info!(
            "Query {} returned {} rows in {}ms",
            result.query_id, result.rows_returned, result.execution_time_ms
        );
        Ok(result)
    }

    async fn fetch_status(&self) -> Result<SystemStatusSnapshot, QueryError> {
        debug!("GET {}", self.status_url);
        let response = self.http.get(&self.status_url).send().await?;
        let status = Self::read::<SystemStatusSnapshot>(response)
            .await?
            .into_payload("Failed to retrieve system status")?;
        Ok(normalize_status(status))
    }

    async fn fetch_metrics(&self) -> Result<PerformanceSnapshot, QueryError> {
        debug!("GET {}", self.metrics_url);
        let response = self.http.get(&self.metrics_url).send().await?;
        Self::read::<PerformanceSnapshot>(response)
            .await?
            .into_payload("Failed to retrieve metrics")
    }
}
