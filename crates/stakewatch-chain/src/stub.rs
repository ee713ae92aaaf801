//! Deterministic in-memory staking adapter.
//!
//! Stands in for a real chain client during development and in tests. State
//! is set up front through the `dev_*` methods; all trait queries then answer
//! from memory, so tests exercise the sampling pipeline without network I/O.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::{ChainError, Economics, Result, StakingAdapter};

/// One participant's scripted state.
#[derive(Clone, Debug)]
pub struct StubParticipant {
    /// Bound worker address.
    pub worker: String,
    /// Owned tokens in base units.
    pub owned: u128,
    /// Locked tokens in base units.
    pub locked: u128,
    /// First period of the stake window.
    pub first_period: u32,
    /// Last period of the stake window.
    pub last_period: u32,
    /// Last period with a confirmed availability.
    pub last_confirmed_period: u32,
}

/// A stub adapter answering every query from scripted in-memory state.
#[derive(Clone, Debug)]
pub struct StubAdapter {
    economics: Economics,
    block_timestamp: u64,
    current_period: u32,
    participants: BTreeMap<String, StubParticipant>,
    failing: BTreeSet<String>,
}

impl StubAdapter {
    /// Create an empty stub at the given block timestamp.
    ///
    /// The current period is derived from the timestamp through the default
    /// economics.
    pub fn new(block_timestamp: u64) -> Self {
        Self::with_economics(Economics::default(), block_timestamp)
    }

    /// Create an empty stub with custom conversion rules.
    pub fn with_economics(economics: Economics, block_timestamp: u64) -> Self {
        let current_period = economics.timestamp_to_period(block_timestamp);
        Self {
            economics,
            block_timestamp,
            current_period,
            participants: BTreeMap::new(),
            failing: BTreeSet::new(),
        }
    }

    /// Register or replace a participant.
    pub fn dev_add_participant(&mut self, address: &str, participant: StubParticipant) {
        self.participants.insert(address.to_string(), participant);
    }

    /// Make every per-staker query for this address fail with an RPC error.
    ///
    /// Lets tests exercise the fail-fast and skip-failed sampling policies.
    pub fn dev_fail_participant(&mut self, address: &str) {
        tracing::warn!(address, "stub adapter: participant marked failing (dev only)");
        self.failing.insert(address.to_string());
    }

    /// Advance the block timestamp (and with it the current period).
    pub fn dev_set_block_timestamp(&mut self, timestamp: u64) {
        self.block_timestamp = timestamp;
        self.current_period = self.economics.timestamp_to_period(timestamp);
    }

    fn lookup(&self, staker: &str) -> Result<&StubParticipant> {
        if self.failing.contains(staker) {
            return Err(ChainError::Rpc(format!("scripted failure for {staker}")));
        }
        self.participants
            .get(staker)
            .ok_or_else(|| ChainError::UnknownStaker(staker.to_string()))
    }
}

#[async_trait]
impl StakingAdapter for StubAdapter {
    async fn current_block_timestamp(&self) -> Result<u64> {
        Ok(self.block_timestamp)
    }

    async fn current_period(&self) -> Result<u32> {
        Ok(self.current_period)
    }

    async fn known_participants(&self) -> Result<BTreeSet<String>> {
        Ok(self.participants.keys().cloned().collect())
    }

    async fn worker_of(&self, staker: &str) -> Result<String> {
        Ok(self.lookup(staker)?.worker.clone())
    }

    async fn owned_tokens(&self, staker: &str) -> Result<u128> {
        Ok(self.lookup(staker)?.owned)
    }

    async fn locked_tokens(&self, staker: &str) -> Result<u128> {
        Ok(self.lookup(staker)?.locked)
    }

    async fn stake_period_bounds(&self, staker: &str) -> Result<(u32, u32)> {
        let p = self.lookup(staker)?;
        Ok((p.first_period, p.last_period))
    }

    async fn last_confirmed_period(&self, staker: &str) -> Result<u32> {
        Ok(self.lookup(staker)?.last_confirmed_period)
    }

    async fn aggregate_locked_tokens(&self, period: u32) -> Result<u128> {
        // Sum of locked tokens over participants whose window covers `period`.
        let total = self
            .participants
            .values()
            .filter(|p| p.first_period <= period && period <= p.last_period)
            .map(|p| p.locked)
            .sum();
        Ok(total)
    }

    fn economics(&self) -> &Economics {
        &self.economics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BASE_UNITS_PER_TOKEN;

    fn staker(locked_tokens: u128, first: u32, last: u32) -> StubParticipant {
        StubParticipant {
            worker: "0xw0000000000000000000000000000000000000001".to_string(),
            owned: 2 * locked_tokens,
            locked: locked_tokens,
            first_period: first,
            last_period: last,
            last_confirmed_period: first,
        }
    }

    #[tokio::test]
    async fn test_known_participants_sorted() {
        let mut stub = StubAdapter::new(1_700_000_000);
        stub.dev_add_participant("0xbb", staker(1, 10, 20));
        stub.dev_add_participant("0xaa", staker(1, 10, 20));

        let known = stub.known_participants().await.expect("participants");
        let listed: Vec<&String> = known.iter().collect();
        assert_eq!(listed, ["0xaa", "0xbb"]);
    }

    #[tokio::test]
    async fn test_unknown_staker() {
        let stub = StubAdapter::new(1_700_000_000);
        let err = stub.worker_of("0xmissing").await.unwrap_err();
        assert!(matches!(err, ChainError::UnknownStaker(_)));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mut stub = StubAdapter::new(1_700_000_000);
        stub.dev_add_participant("0xaa", staker(1, 10, 20));
        stub.dev_fail_participant("0xaa");

        let err = stub.owned_tokens("0xaa").await.unwrap_err();
        assert!(matches!(err, ChainError::Rpc(_)));
    }

    #[tokio::test]
    async fn test_aggregate_counts_only_covering_windows() {
        let mut stub = StubAdapter::new(1_700_000_000);
        stub.dev_add_participant("0xaa", staker(5 * BASE_UNITS_PER_TOKEN, 10, 20));
        stub.dev_add_participant("0xbb", staker(3 * BASE_UNITS_PER_TOKEN, 15, 30));

        // Period 12: only 0xaa's window covers it.
        let at_12 = stub.aggregate_locked_tokens(12).await.expect("aggregate");
        assert_eq!(at_12, 5 * BASE_UNITS_PER_TOKEN);

        // Period 18: both windows cover it.
        let at_18 = stub.aggregate_locked_tokens(18).await.expect("aggregate");
        assert_eq!(at_18, 8 * BASE_UNITS_PER_TOKEN);

        // Period 40: nobody.
        let at_40 = stub.aggregate_locked_tokens(40).await.expect("aggregate");
        assert_eq!(at_40, 0);
    }

    #[tokio::test]
    async fn test_block_timestamp_drives_period() {
        let mut stub = StubAdapter::new(86400 * 100);
        assert_eq!(stub.current_period().await.expect("period"), 100);

        stub.dev_set_block_timestamp(86400 * 101 + 10);
        assert_eq!(stub.current_period().await.expect("period"), 101);
    }
}
