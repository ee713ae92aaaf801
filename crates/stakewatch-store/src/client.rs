//! HTTP client for the InfluxDB v1 API.
//!
//! Three endpoints are enough for the crawler: `GET /query` for reads and
//! `SHOW` statements, `POST /query` for DDL, and `POST /write` for
//! line-protocol batches. Read queries always request epoch-second
//! timestamps so the caller never parses RFC3339 out of results.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{RetentionPolicy, Result, Series, StoreError, TimeSeriesStore, WRITE_BATCH_SIZE};

/// Default address of a local store.
pub const DEFAULT_STORE_URL: &str = "http://localhost:8086";

/// Time-series store client over the InfluxDB v1 HTTP API.
#[derive(Clone, Debug)]
pub struct InfluxClient {
    http: reqwest::Client,
    base_url: String,
}

/// Top-level shape of a `/query` response.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
}

/// Result of one statement within a `/query` response.
#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Option<Vec<Series>>,
    #[serde(default)]
    error: Option<String>,
}

impl InfluxClient {
    /// Create a client against the given base URL (e.g. `http://localhost:8086`).
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run a statement via `GET /query` and return the parsed response.
    async fn read_statement(&self, db: Option<&str>, statement: &str) -> Result<QueryResponse> {
        let mut params = vec![("q", statement), ("epoch", "s")];
        if let Some(db) = db {
            params.push(("db", db));
        }
        let response = self
            .http
            .get(format!("{}/query", self.base_url))
            .query(&params)
            .send()
            .await?;
        Self::parse_query_response(response).await
    }

    /// Run a DDL statement via `POST /query`.
    async fn post_statement(&self, statement: &str) -> Result<()> {
        debug!(statement, "executing store DDL");
        let response = self
            .http
            .post(format!("{}/query", self.base_url))
            .query(&[("q", statement)])
            .send()
            .await?;
        let parsed = Self::parse_query_response(response).await?;
        Self::first_series(parsed).map(|_| ())
    }

    async fn parse_query_response(response: reqwest::Response) -> Result<QueryResponse> {
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json::<QueryResponse>().await?)
    }

    /// Extract the first statement's series, surfacing statement-level errors.
    fn first_series(parsed: QueryResponse) -> Result<Vec<Series>> {
        let first = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("response carries no results".to_string()))?;
        if let Some(error) = first.error {
            return Err(StoreError::Query(error));
        }
        Ok(first.series.unwrap_or_default())
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxClient {
    async fn list_databases(&self) -> Result<Vec<String>> {
        let parsed = self.read_statement(None, "SHOW DATABASES").await?;
        let all = Self::first_series(parsed)?;
        // SHOW DATABASES answers a single series whose rows hold one name each.
        let mut names = Vec::new();
        for series in &all {
            for row in &series.values {
                if let Some(name) = row.first().and_then(|v| v.as_str()) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn create_database(&self, name: &str) -> Result<()> {
        self.post_statement(&format!("CREATE DATABASE \"{name}\"")).await
    }

    async fn create_retention_policy(
        &self,
        database: &str,
        policy: &RetentionPolicy,
    ) -> Result<()> {
        let mut statement = format!(
            "CREATE RETENTION POLICY \"{}\" ON \"{}\" DURATION {} REPLICATION {}",
            policy.name, database, policy.duration, policy.replication,
        );
        if policy.is_default {
            statement.push_str(" DEFAULT");
        }
        self.post_statement(&statement).await
    }

    async fn write_lines(&self, database: &str, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        for chunk in lines.chunks(WRITE_BATCH_SIZE) {
            let response = self
                .http
                .post(format!("{}/write", self.base_url))
                .query(&[("db", database), ("precision", "s")])
                .body(chunk.join("\n"))
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(StoreError::Rejected {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
            debug!(count = chunk.len(), database, "wrote snapshot batch");
        }
        Ok(())
    }

    async fn query(&self, database: &str, statement: &str) -> Result<Vec<Series>> {
        let parsed = self.read_statement(Some(database), statement).await?;
        Self::first_series(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = InfluxClient::new("http://localhost:8086/");
        assert_eq!(client.base_url, "http://localhost:8086");
    }

    #[test]
    fn test_statement_error_surfaces() {
        let parsed: QueryResponse = serde_json::from_str(
            r#"{"results":[{"error":"database not found: network"}]}"#,
        )
        .expect("parse");
        let err = InfluxClient::first_series(parsed).unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }

    #[test]
    fn test_empty_statement_result_is_no_series() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"results":[{}]}"#).expect("parse");
        let series = InfluxClient::first_series(parsed).expect("series");
        assert!(series.is_empty());
    }

    #[test]
    fn test_missing_results_is_malformed() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"results":[]}"#).expect("parse");
        let err = InfluxClient::first_series(parsed).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }
}
