//! Batched snapshot writes.
//!
//! One sampling cycle produces one batch: every point is encoded in memory
//! first, then submitted in a single write call (chunked at the wire level if
//! it exceeds the batch cap). Delivery is best effort — a batch the store
//! rejects is logged and dropped, never retried or buffered, so a failed
//! cycle shows up as a gap in the series rather than as backpressure on the
//! sampling timers.

use std::sync::Arc;

use stakewatch_types::NetworkSnapshotPoint;
use tracing::warn;

use crate::line::encode_point;
use crate::{schema, Result, StoreError, TimeSeriesStore, DB_NAME};

/// Writes one cycle's snapshot points to the store.
#[derive(Debug)]
pub struct SnapshotWriter<S> {
    store: Arc<S>,
}

// Derived `Clone` would demand `S: Clone`; only the handle is cloned.
impl<S> Clone for SnapshotWriter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TimeSeriesStore> SnapshotWriter<S> {
    /// Create a writer over the given store handle.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Ensure the target database and retention policy exist.
    ///
    /// See [`schema::ensure_schema`]; safe to call repeatedly.
    pub async fn ensure_schema(&self) -> Result<()> {
        schema::ensure_schema(self.store.as_ref()).await
    }

    /// Write all points of one cycle as a single batched write.
    ///
    /// An empty batch succeeds without touching the store. A rejection by the
    /// store is logged as a warning and the cycle's data is dropped; only
    /// transport-level failures propagate to the caller.
    pub async fn write(&self, points: &[NetworkSnapshotPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let lines: Vec<String> = points.iter().map(encode_point).collect();
        match self.store.write_lines(DB_NAME, &lines).await {
            Ok(()) => Ok(()),
            Err(StoreError::Rejected { status, body }) => {
                warn!(
                    status,
                    body = %body,
                    count = points.len(),
                    block_time = points[0].sample_time,
                    period = points[0].current_period,
                    "unable to write snapshot batch, dropping cycle data"
                );
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockStore;

    fn point(staker: &str, sample_time: u64) -> NetworkSnapshotPoint {
        NetworkSnapshotPoint {
            staker_address: staker.to_string(),
            worker_address: "0xw000000000000000000000000000000000000001".to_string(),
            start_date: 1_500_000_000.0,
            end_date: 1_600_000_000.0,
            stake: 100.0,
            locked_stake: 80.0,
            current_period: 42,
            last_confirmed_period: 41,
            sample_time,
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_a_failure() {
        let store = Arc::new(MockStore::new());
        let writer = SnapshotWriter::new(store.clone());

        writer.write(&[]).await.expect("empty batch");
        assert!(store.written().is_empty());
    }

    #[tokio::test]
    async fn test_one_line_per_point() {
        let store = Arc::new(MockStore::new());
        let writer = SnapshotWriter::new(store.clone());

        let points = vec![point("0xaa", 1000), point("0xbb", 1000), point("0xcc", 1000)];
        writer.write(&points).await.expect("write");

        let written = store.written();
        assert_eq!(written.len(), 1, "one batched write per cycle");
        assert_eq!(written[0].0, DB_NAME);
        assert_eq!(written[0].1.len(), 3);
        for line in &written[0].1 {
            assert!(line.starts_with("moe_network_info,staker_address="));
            assert!(line.ends_with(" 1000"));
        }
    }

    #[tokio::test]
    async fn test_rejection_is_swallowed() {
        let store = Arc::new(MockStore::rejecting_writes());
        let writer = SnapshotWriter::new(store);

        // Rejected batch: logged and dropped, not an error for the cycle.
        writer.write(&[point("0xaa", 1000)]).await.expect("rejection swallowed");
    }

    #[tokio::test]
    async fn test_clone_shares_store_handle() {
        // MockStore is not Clone; cloning the writer must not require it.
        let store = Arc::new(MockStore::new());
        let writer = SnapshotWriter::new(store.clone());
        let cloned = writer.clone();

        cloned.write(&[point("0xaa", 1000)]).await.expect("write");
        assert_eq!(store.written().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_schema_delegates() {
        let store = Arc::new(MockStore::new());
        let writer = SnapshotWriter::new(store.clone());

        writer.ensure_schema().await.expect("bootstrap");
        writer.ensure_schema().await.expect("bootstrap again");
        assert_eq!(store.created_databases().len(), 1);
    }
}
