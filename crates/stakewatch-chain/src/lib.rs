//! # stakewatch-chain
//!
//! The blockchain/economics collaborator seam. The crawler never talks to a
//! node directly; it goes through [`StakingAdapter`], an async trait covering
//! exactly the queries the samplers need. Unit and period conversions live in
//! [`Economics`] so that adapters report raw chain values and the conversion
//! rules stay in one place.
//!
//! ## Modules
//!
//! - [`stub`] — deterministic in-memory adapter for development and testing

pub mod stub;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error types for collaborator queries.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The underlying node/RPC call failed.
    #[error("chain rpc failed: {0}")]
    Rpc(String),

    /// A query named a staker the chain does not know.
    #[error("unknown staker: {0}")]
    UnknownStaker(String),
}

/// Convenience result type for collaborator queries.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Base token units per whole token (18 decimals).
pub const BASE_UNITS_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Seconds per staking period (24 hours).
pub const SECONDS_PER_PERIOD: u64 = 86400;

/// Pure conversion rules of the network's economic model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Economics {
    /// Base (integer) token units per whole token.
    pub base_units_per_token: u128,
    /// Duration of one staking period in seconds.
    pub seconds_per_period: u64,
}

impl Default for Economics {
    fn default() -> Self {
        Self {
            base_units_per_token: BASE_UNITS_PER_TOKEN,
            seconds_per_period: SECONDS_PER_PERIOD,
        }
    }
}

impl Economics {
    /// Convert an amount in base units to decimal token units.
    pub fn to_tokens(&self, base_units: u128) -> f64 {
        base_units as f64 / self.base_units_per_token as f64
    }

    /// Map a period number to the epoch timestamp of its start.
    pub fn period_to_timestamp(&self, period: u32) -> u64 {
        u64::from(period) * self.seconds_per_period
    }

    /// Map an epoch timestamp to the period containing it.
    pub fn timestamp_to_period(&self, timestamp: u64) -> u32 {
        (timestamp / self.seconds_per_period) as u32
    }
}

/// Read-only queries the samplers require from the staking side.
///
/// Token amounts are reported in base units; callers convert via
/// [`StakingAdapter::economics`]. All methods are fallible because every one
/// of them is (in a real adapter) at least one RPC round trip.
#[async_trait]
pub trait StakingAdapter: Send + Sync {
    /// Timestamp of the latest block, epoch seconds.
    async fn current_block_timestamp(&self) -> Result<u64>;

    /// The staking period current at the latest block.
    async fn current_period(&self) -> Result<u32>;

    /// Addresses of all currently known participants.
    async fn known_participants(&self) -> Result<BTreeSet<String>>;

    /// The worker address bound to a staker.
    async fn worker_of(&self, staker: &str) -> Result<String>;

    /// Total tokens owned by a staker, in base units.
    async fn owned_tokens(&self, staker: &str) -> Result<u128>;

    /// Tokens currently locked by a staker, in base units.
    async fn locked_tokens(&self, staker: &str) -> Result<u128>;

    /// First and last period of a staker's stake window.
    async fn stake_period_bounds(&self, staker: &str) -> Result<(u32, u32)>;

    /// Last period in which a staker confirmed availability.
    async fn last_confirmed_period(&self, staker: &str) -> Result<u32>;

    /// Aggregate locked tokens across all stakers at a given period, in base
    /// units.
    async fn aggregate_locked_tokens(&self, period: u32) -> Result<u128>;

    /// The conversion rules in force on this chain.
    fn economics(&self) -> &Economics;
}
