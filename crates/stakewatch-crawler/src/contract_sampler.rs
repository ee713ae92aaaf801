//! Contract sampling over the fixed period window.
//!
//! Each cycle asks the chain for the aggregate locked tokens at every period
//! in `1..=365` and produces a complete [`ContractSnapshot`]. The caller
//! publishes the result through a [`crate::SnapshotCell`], so readers only
//! ever see whole snapshots.

use std::collections::BTreeMap;

use stakewatch_chain::StakingAdapter;
use stakewatch_types::{ContractSnapshot, CONTRACT_PERIOD_MAX, CONTRACT_PERIOD_MIN};
use tracing::debug;

use crate::Result;

/// Run one contract sampling cycle.
pub async fn sample_contracts<C>(chain: &C) -> Result<ContractSnapshot>
where
    C: StakingAdapter + ?Sized,
{
    let sampled_at = chain.current_block_timestamp().await?;
    let economics = *chain.economics();

    let mut future_locked_tokens = BTreeMap::new();
    for period in CONTRACT_PERIOD_MIN..=CONTRACT_PERIOD_MAX {
        let locked = chain.aggregate_locked_tokens(period).await?;
        future_locked_tokens.insert(period, economics.to_tokens(locked));
    }
    debug!(sampled_at, periods = future_locked_tokens.len(), "contract snapshot complete");

    Ok(ContractSnapshot {
        sampled_at,
        future_locked_tokens,
    })
}
