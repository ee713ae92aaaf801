//! # stakewatch-types
//!
//! Shared domain types for the stakewatch workspace: the per-staker snapshot
//! point written to the time-series store, the in-memory contract snapshot,
//! and the aggregate series returned by the read side.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// First period covered by a contract sampling pass.
pub const CONTRACT_PERIOD_MIN: u32 = 1;

/// Last period covered by a contract sampling pass (one year of periods).
pub const CONTRACT_PERIOD_MAX: u32 = 365;

/// Default sampling interval in seconds.
pub const DEFAULT_REFRESH_RATE_SECS: u64 = 60;

/// Default stagger between the node and contract sampling timers, in seconds.
pub const DEFAULT_STAGGER_OFFSET_SECS: u64 = 2;

/// One staker's state as observed during a single sampling cycle.
///
/// Immutable once assembled. All points produced by one cycle share the same
/// `sample_time`, which is the block timestamp read once at the start of the
/// cycle. Stake window bounds are stored as numeric seconds-since-epoch so
/// they compare consistently on the query side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshotPoint {
    /// Address of the staker (the indexed tag on the wire).
    pub staker_address: String,
    /// Operational worker address bound to the staker.
    pub worker_address: String,
    /// Start of the stake window, epoch seconds.
    pub start_date: f64,
    /// End of the stake window, epoch seconds.
    pub end_date: f64,
    /// Total owned tokens, in decimal token units.
    pub stake: f64,
    /// Currently locked tokens, in decimal token units.
    pub locked_stake: f64,
    /// The network period current at sampling time.
    pub current_period: u32,
    /// Last period in which the staker confirmed availability.
    pub last_confirmed_period: u32,
    /// Block timestamp of the cycle, epoch seconds.
    pub sample_time: u64,
}

impl NetworkSnapshotPoint {
    /// Whether the stake window bounds are ordered (`start_date <= end_date`).
    pub fn is_well_formed(&self) -> bool {
        self.start_date <= self.end_date
    }
}

/// Aggregate locked tokens per future period, for periods
/// [`CONTRACT_PERIOD_MIN`]`..=`[`CONTRACT_PERIOD_MAX`].
///
/// Exactly one instance is current at any time; each contract sampling pass
/// replaces the previous snapshot wholesale. Readers always receive a
/// complete snapshot, never a partially filled one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    /// When the snapshot was taken, epoch seconds.
    pub sampled_at: u64,
    /// Period number to aggregate locked tokens in decimal token units.
    pub future_locked_tokens: BTreeMap<u32, f64>,
}

/// Day-bucketed sum of locked stake: day-start epoch seconds to token sum.
///
/// Days with no data (or a zero sum) are absent, never zero-filled.
pub type LockedStakeSeries = BTreeMap<i64, f64>;

/// Day-bucketed distinct-staker count: day-start epoch seconds to count.
///
/// Days with no data are absent; a day never carries a count of zero.
pub type StakerCountSeries = BTreeMap<i64, u64>;

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> NetworkSnapshotPoint {
        NetworkSnapshotPoint {
            staker_address: "0xdeadbeef00000000000000000000000000000001".to_string(),
            worker_address: "0xdeadbeef00000000000000000000000000000002".to_string(),
            start_date: 1_500_000_000.0,
            end_date: 1_600_000_000.0,
            stake: 15000.0,
            locked_stake: 12500.5,
            current_period: 120,
            last_confirmed_period: 119,
            sample_time: 1_550_000_000,
        }
    }

    #[test]
    fn test_point_well_formed() {
        assert!(point().is_well_formed());
    }

    #[test]
    fn test_point_inverted_window_rejected() {
        let mut p = point();
        p.start_date = p.end_date + 1.0;
        assert!(!p.is_well_formed());
    }

    #[test]
    fn test_point_degenerate_window_allowed() {
        let mut p = point();
        p.end_date = p.start_date;
        assert!(p.is_well_formed());
    }

    #[test]
    fn test_contract_snapshot_default_is_empty() {
        let snapshot = ContractSnapshot::default();
        assert_eq!(snapshot.sampled_at, 0);
        assert!(snapshot.future_locked_tokens.is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let p = point();
        let json = serde_json::to_string(&p).expect("serialize");
        let back: NetworkSnapshotPoint = serde_json::from_str(&json).expect("parse");
        assert_eq!(p, back);
    }

    #[test]
    fn test_period_window_bounds() {
        assert_eq!(CONTRACT_PERIOD_MIN, 1);
        assert_eq!(CONTRACT_PERIOD_MAX, 365);
        assert!(CONTRACT_PERIOD_MIN <= CONTRACT_PERIOD_MAX);
    }
}
