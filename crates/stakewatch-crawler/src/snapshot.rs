//! Latest-snapshot holder.
//!
//! The contract snapshot is the only state shared between the sampling tasks
//! and external readers (dashboards). It is replaced by swapping an `Arc`,
//! never mutated in place, so a reader observes either the previous complete
//! snapshot or the new complete snapshot — never a half-updated mapping.

use std::sync::{Arc, Mutex};

use stakewatch_types::ContractSnapshot;

/// Shared cell holding the latest [`ContractSnapshot`].
///
/// Cloning the cell clones the handle, not the snapshot.
#[derive(Clone, Debug, Default)]
pub struct SnapshotCell {
    inner: Arc<Mutex<Option<Arc<ContractSnapshot>>>>,
}

impl SnapshotCell {
    /// Create an empty cell (no snapshot published yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new snapshot, replacing any previous one wholesale.
    pub fn publish(&self, snapshot: ContractSnapshot) {
        let snapshot = Arc::new(snapshot);
        *lock(&self.inner) = Some(snapshot);
    }

    /// The latest published snapshot, if any.
    pub fn latest(&self) -> Option<Arc<ContractSnapshot>> {
        lock(&self.inner).clone()
    }
}

/// The critical section is a pointer swap or clone; a poisoned lock cannot
/// hold a partially written snapshot, so recover instead of propagating.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot(sampled_at: u64, period: u32, tokens: f64) -> ContractSnapshot {
        let mut future_locked_tokens = BTreeMap::new();
        future_locked_tokens.insert(period, tokens);
        ContractSnapshot {
            sampled_at,
            future_locked_tokens,
        }
    }

    #[test]
    fn test_empty_until_first_publish() {
        let cell = SnapshotCell::new();
        assert!(cell.latest().is_none());
    }

    #[test]
    fn test_latest_wins() {
        let cell = SnapshotCell::new();
        cell.publish(snapshot(100, 1, 10.0));
        cell.publish(snapshot(200, 2, 20.0));

        let latest = cell.latest().expect("snapshot");
        assert_eq!(latest.sampled_at, 200);
        assert!(!latest.future_locked_tokens.contains_key(&1));
    }

    #[test]
    fn test_reader_keeps_consistent_reference() {
        let cell = SnapshotCell::new();
        cell.publish(snapshot(100, 1, 10.0));

        let held = cell.latest().expect("snapshot");
        cell.publish(snapshot(200, 2, 20.0));

        // The reference taken before the swap still sees the old snapshot.
        assert_eq!(held.sampled_at, 100);
        assert_eq!(cell.latest().expect("snapshot").sampled_at, 200);
    }

    #[test]
    fn test_clone_shares_state() {
        let cell = SnapshotCell::new();
        let reader = cell.clone();
        cell.publish(snapshot(100, 1, 10.0));
        assert_eq!(reader.latest().expect("snapshot").sampled_at, 100);
    }
}
