//! Per-participant node sampling.
//!
//! One cycle reads the block timestamp and the current period exactly once,
//! then walks every known participant and assembles one snapshot point each.
//! All points of a cycle therefore share one `sample_time`.

use stakewatch_chain::StakingAdapter;
use stakewatch_types::NetworkSnapshotPoint;
use tracing::{info, warn};

use crate::Result;

/// What to do when one participant's lookups fail mid-cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParticipantPolicy {
    /// Abort the whole cycle on the first failing participant; no partial
    /// batch is ever written.
    FailFast,
    /// Log and skip the failing participant; the rest of the cycle survives.
    #[default]
    SkipFailed,
}

/// Run one node sampling cycle and return its snapshot points.
pub async fn sample_nodes<C>(
    chain: &C,
    policy: ParticipantPolicy,
) -> Result<Vec<NetworkSnapshotPoint>>
where
    C: StakingAdapter + ?Sized,
{
    let sample_time = chain.current_block_timestamp().await?;
    let current_period = chain.current_period().await?;
    let participants = chain.known_participants().await?;
    info!(
        count = participants.len(),
        block_time = sample_time,
        period = current_period,
        "processing known participants"
    );

    let mut points = Vec::with_capacity(participants.len());
    for staker in &participants {
        match sample_one(chain, staker, current_period, sample_time).await {
            Ok(point) => points.push(point),
            Err(error) => match policy {
                ParticipantPolicy::FailFast => return Err(error.into()),
                ParticipantPolicy::SkipFailed => {
                    warn!(%staker, %error, "skipping participant after failed lookup");
                }
            },
        }
    }
    Ok(points)
}

/// Assemble the snapshot point for a single participant.
async fn sample_one<C>(
    chain: &C,
    staker: &str,
    current_period: u32,
    sample_time: u64,
) -> stakewatch_chain::Result<NetworkSnapshotPoint>
where
    C: StakingAdapter + ?Sized,
{
    let worker = chain.worker_of(staker).await?;
    let owned = chain.owned_tokens(staker).await?;
    let locked = chain.locked_tokens(staker).await?;
    let (first_period, last_period) = chain.stake_period_bounds(staker).await?;
    let last_confirmed_period = chain.last_confirmed_period(staker).await?;

    let economics = chain.economics();
    Ok(NetworkSnapshotPoint {
        staker_address: staker.to_string(),
        worker_address: worker,
        // Dates as numeric epoch seconds for consistent comparison.
        start_date: economics.period_to_timestamp(first_period) as f64,
        end_date: economics.period_to_timestamp(last_period) as f64,
        stake: economics.to_tokens(owned),
        locked_stake: economics.to_tokens(locked),
        current_period,
        last_confirmed_period,
        sample_time,
    })
}
