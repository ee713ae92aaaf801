//! # stakewatch-store
//!
//! Everything that touches the time-series store: the line-protocol encoder,
//! the HTTP client for the InfluxDB v1 API, idempotent schema bootstrap, the
//! batched snapshot writer, and the read-side historical aggregation client.
//!
//! The store itself is behind the [`TimeSeriesStore`] trait so the sampling
//! pipeline and the query logic can be exercised against an in-memory fake.
//!
//! ## Modules
//!
//! - [`line`] — line-protocol encoding with tag/field escaping
//! - [`client`] — [`InfluxClient`], the HTTP implementation of the store trait
//! - [`schema`] — database and retention-policy bootstrap
//! - [`writer`] — [`SnapshotWriter`], one batched write per sampling cycle
//! - [`history`] — [`HistoryClient`], day-bucketed aggregation queries

pub mod client;
pub mod history;
pub mod line;
pub mod schema;
pub mod writer;

#[cfg(test)]
pub(crate) mod testutil;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::InfluxClient;
pub use history::HistoryClient;
pub use writer::SnapshotWriter;

/// Target database name.
pub const DB_NAME: &str = "network";

/// Measurement name for per-staker snapshot points.
pub const MEASUREMENT: &str = "moe_network_info";

/// Name of the retention policy attached at bootstrap.
pub const RETENTION_POLICY_NAME: &str = "network_info_retention";

/// How long snapshot data is kept (5 weeks).
pub const RETENTION_POLICY_DURATION: &str = "5w";

/// Replication factor of the retention policy.
pub const RETENTION_POLICY_REPLICATION: u16 = 1;

/// Maximum number of lines submitted in one write request.
pub const WRITE_BATCH_SIZE: usize = 10_000;

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP transport failed (store unreachable, connection reset, ...).
    #[error("store transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store rejected request (status {status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log line.
        body: String,
    },

    /// A query statement was accepted but reported an error.
    #[error("query failed: {0}")]
    Query(String),

    /// The store's response could not be interpreted.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// Convenience result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A retention policy applied to the target database at bootstrap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Policy name.
    pub name: String,
    /// Duration literal in the store's query language (e.g. `5w`).
    pub duration: String,
    /// Replication factor.
    pub replication: u16,
    /// Whether the policy becomes the database default.
    pub is_default: bool,
}

impl RetentionPolicy {
    /// The policy attached to the `network` database: 5 weeks of data,
    /// replication factor 1, default.
    pub fn network_info() -> Self {
        Self {
            name: RETENTION_POLICY_NAME.to_string(),
            duration: RETENTION_POLICY_DURATION.to_string(),
            replication: RETENTION_POLICY_REPLICATION,
            is_default: true,
        }
    }
}

/// One series of a query result: column names plus rows of JSON values.
///
/// Mirrors the shape of the InfluxDB v1 JSON response so the fake store in
/// tests can produce it directly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Series {
    /// Measurement name the series was drawn from, if reported.
    #[serde(default)]
    pub name: Option<String>,
    /// Tag set of the series, if grouped by tags.
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
    /// Column names, `time` first.
    pub columns: Vec<String>,
    /// Rows; each row has one JSON value per column.
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// The operations the crawler needs from a time-series store.
///
/// Implemented over HTTP by [`InfluxClient`]; tests use an in-memory fake.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Names of all databases in the store.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// Create a database. The store treats this as idempotent, but callers
    /// are expected to check existence first (see [`schema::ensure_schema`]).
    async fn create_database(&self, name: &str) -> Result<()>;

    /// Attach a retention policy to a database.
    async fn create_retention_policy(&self, database: &str, policy: &RetentionPolicy)
        -> Result<()>;

    /// Write a batch of line-protocol records with second precision.
    ///
    /// An empty batch must succeed without performing any I/O. A rejection by
    /// the store surfaces as [`StoreError::Rejected`].
    async fn write_lines(&self, database: &str, lines: &[String]) -> Result<()>;

    /// Run a read query against a database and return its series.
    ///
    /// Timestamps in the result are requested as epoch seconds.
    async fn query(&self, database: &str, statement: &str) -> Result<Vec<Series>>;
}
