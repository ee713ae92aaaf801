//! # stakewatch-crawler
//!
//! The sampling pipeline: periodic node and contract sampling driven by two
//! staggered timers, with a restart policy between cycles and a single
//! batched write per node cycle.
//!
//! ## Modules
//!
//! - [`node_sampler`] — one snapshot point per known participant per cycle
//! - [`contract_sampler`] — aggregate locked tokens over the period window
//! - [`snapshot`] — the atomically swapped latest contract snapshot
//! - [`scheduler`] — task lifecycle, timers, and the failure policy

pub mod contract_sampler;
pub mod node_sampler;
pub mod scheduler;
pub mod snapshot;

pub use node_sampler::ParticipantPolicy;
pub use scheduler::{Crawler, CrawlerConfig, RestartPolicy};
pub use snapshot::SnapshotCell;

use stakewatch_chain::ChainError;
use stakewatch_store::StoreError;

/// Error types for sampling cycles.
#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    /// A collaborator query failed while computing a sample.
    #[error("sample computation failed: {0}")]
    Chain(#[from] ChainError),

    /// A store operation failed at the transport level.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// Convenience result type for sampling cycles.
pub type Result<T> = std::result::Result<T, CrawlerError>;
