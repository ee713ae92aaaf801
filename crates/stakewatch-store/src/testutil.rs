//! In-memory fake store used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{RetentionPolicy, Result, Series, StoreError, TimeSeriesStore};

/// A [`TimeSeriesStore`] that records every call and answers from canned data.
#[derive(Debug, Default)]
pub(crate) struct MockStore {
    databases: Mutex<Vec<String>>,
    created_databases: Mutex<Vec<String>>,
    created_policies: Mutex<Vec<(String, RetentionPolicy)>>,
    written: Mutex<Vec<(String, Vec<String>)>>,
    queries: Mutex<Vec<String>>,
    canned_series: Mutex<VecDeque<Vec<Series>>>,
    reject_writes: bool,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_databases(names: &[&str]) -> Self {
        let store = Self::default();
        *lock(&store.databases) = names.iter().map(|n| n.to_string()).collect();
        store
    }

    /// A store whose write endpoint rejects every batch.
    pub(crate) fn rejecting_writes() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    /// Queue the series answered by the next `query` call.
    pub(crate) fn push_canned_series(&self, series: Vec<Series>) {
        lock(&self.canned_series).push_back(series);
    }

    pub(crate) fn created_databases(&self) -> Vec<String> {
        lock(&self.created_databases).clone()
    }

    pub(crate) fn created_policies(&self) -> Vec<(String, RetentionPolicy)> {
        lock(&self.created_policies).clone()
    }

    pub(crate) fn written(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.written).clone()
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl TimeSeriesStore for MockStore {
    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(lock(&self.databases).clone())
    }

    async fn create_database(&self, name: &str) -> Result<()> {
        lock(&self.databases).push(name.to_string());
        lock(&self.created_databases).push(name.to_string());
        Ok(())
    }

    async fn create_retention_policy(
        &self,
        database: &str,
        policy: &RetentionPolicy,
    ) -> Result<()> {
        lock(&self.created_policies).push((database.to_string(), policy.clone()));
        Ok(())
    }

    async fn write_lines(&self, database: &str, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        if self.reject_writes {
            return Err(StoreError::Rejected {
                status: 500,
                body: "scripted rejection".to_string(),
            });
        }
        lock(&self.written).push((database.to_string(), lines.to_vec()));
        Ok(())
    }

    async fn query(&self, _database: &str, statement: &str) -> Result<Vec<Series>> {
        lock(&self.queries).push(statement.to_string());
        Ok(lock(&self.canned_series).pop_front().unwrap_or_default())
    }
}
