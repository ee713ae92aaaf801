//! Task lifecycle and failure policy.
//!
//! The crawler drives two independent periodic tasks: node sampling at the
//! refresh rate and contract sampling at the refresh rate minus a small
//! stagger offset, so the two do not hit the chain in lockstep. Each task is
//! its own tokio task with a sequential cycle loop — one in-flight cycle per
//! kind, and a slow store write in one task never delays the other's timer.
//!
//! Errors escaping a cycle body are intercepted at the task boundary. With
//! `restart_on_error` the cycle is retried after an exponential backoff with
//! jitter; a run of consecutive failures beyond the ceiling parks the task in
//! a terminal fatal state, visible through `is_running`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use stakewatch_chain::StakingAdapter;
use stakewatch_store::{HistoryClient, SnapshotWriter, TimeSeriesStore};
use stakewatch_types::{
    ContractSnapshot, DEFAULT_REFRESH_RATE_SECS, DEFAULT_STAGGER_OFFSET_SECS,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::contract_sampler::sample_contracts;
use crate::node_sampler::{sample_nodes, ParticipantPolicy};
use crate::snapshot::SnapshotCell;
use crate::Result;

/// Upper bound on the random jitter added to each backoff, in milliseconds.
const BACKOFF_JITTER_MS: u64 = 250;

/// How task-boundary failures are handled.
#[derive(Clone, Debug)]
pub struct RestartPolicy {
    /// Retry failed cycles. When false, the first failure is fatal for the
    /// task.
    pub restart_on_error: bool,
    /// Consecutive failures tolerated before the task gives up.
    pub max_consecutive_failures: u32,
    /// Backoff before the first retry; doubles per consecutive failure.
    pub initial_backoff: Duration,
    /// Cap on the exponential backoff.
    pub max_backoff: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            restart_on_error: true,
            max_consecutive_failures: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RestartPolicy {
    /// Backoff before retrying after the n-th consecutive failure (1-based).
    pub fn backoff_for(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

/// Crawler timing and policy configuration.
#[derive(Clone, Debug)]
pub struct CrawlerConfig {
    /// Node sampling interval.
    pub refresh_rate: Duration,
    /// Stagger between the node and contract timers.
    pub stagger_offset: Duration,
    /// Per-participant failure isolation for node cycles.
    pub participant_policy: ParticipantPolicy,
    /// Task-boundary failure handling.
    pub restart: RestartPolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            refresh_rate: Duration::from_secs(DEFAULT_REFRESH_RATE_SECS),
            stagger_offset: Duration::from_secs(DEFAULT_STAGGER_OFFSET_SECS),
            participant_policy: ParticipantPolicy::default(),
            restart: RestartPolicy::default(),
        }
    }
}

impl CrawlerConfig {
    /// Interval of the contract sampling task (refresh rate minus stagger).
    pub fn contract_interval(&self) -> Duration {
        self.refresh_rate
            .saturating_sub(self.stagger_offset)
            .max(Duration::from_millis(1))
    }
}

/// Outcome of recording a cycle failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureAction {
    /// Stop the task permanently.
    Fatal,
    /// Retry the cycle after this delay.
    RetryAfter(Duration),
}

/// Tracks consecutive cycle failures against a [`RestartPolicy`].
#[derive(Clone, Debug)]
pub struct FailureTracker {
    policy: RestartPolicy,
    consecutive: u32,
}

impl FailureTracker {
    /// Create a tracker with no recorded failures.
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            consecutive: 0,
        }
    }

    /// A cycle completed; the failure run is over.
    pub fn on_success(&mut self) {
        self.consecutive = 0;
    }

    /// Record one cycle failure and decide what happens next.
    pub fn on_failure(&mut self) -> FailureAction {
        self.consecutive += 1;
        if !self.policy.restart_on_error
            || self.consecutive > self.policy.max_consecutive_failures
        {
            return FailureAction::Fatal;
        }
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=BACKOFF_JITTER_MS));
        FailureAction::RetryAfter(self.policy.backoff_for(self.consecutive) + jitter)
    }

    /// Length of the current failure run.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// The crawler: owns the store handle, the chain adapter, and both sampling
/// tasks.
pub struct Crawler<C, S> {
    chain: Arc<C>,
    store: Arc<S>,
    writer: SnapshotWriter<S>,
    snapshot: SnapshotCell,
    config: CrawlerConfig,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Option<(JoinHandle<()>, JoinHandle<()>)>,
}

impl<C, S> Crawler<C, S>
where
    C: StakingAdapter + 'static,
    S: TimeSeriesStore + 'static,
{
    /// Build a crawler and bootstrap the store schema.
    ///
    /// Fails if the store is unreachable or refuses the bootstrap — the
    /// crawler is never constructed against a store it cannot write to.
    pub async fn connect(chain: Arc<C>, store: Arc<S>, config: CrawlerConfig) -> Result<Self> {
        let writer = SnapshotWriter::new(store.clone());
        writer.ensure_schema().await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            chain,
            store,
            writer,
            snapshot: SnapshotCell::new(),
            config,
            shutdown_tx,
            tasks: None,
        })
    }

    /// Re-check the store schema on demand.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.writer.ensure_schema().await?;
        Ok(())
    }

    /// Start both sampling tasks. No-op when already running.
    ///
    /// Both timers fire immediately, then at their respective intervals.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        info!(
            refresh_rate_secs = self.config.refresh_rate.as_secs_f64(),
            "starting crawler"
        );

        let node_task = {
            let chain = self.chain.clone();
            let writer = self.writer.clone();
            let policy = self.config.participant_policy;
            tokio::spawn(run_sampling_loop(
                "node-sampler",
                self.config.refresh_rate,
                self.config.restart.clone(),
                self.shutdown_tx.subscribe(),
                move || {
                    let chain = chain.clone();
                    let writer = writer.clone();
                    async move {
                        let points = sample_nodes(chain.as_ref(), policy).await?;
                        writer.write(&points).await?;
                        Ok(())
                    }
                },
            ))
        };

        let contract_task = {
            let chain = self.chain.clone();
            let cell = self.snapshot.clone();
            tokio::spawn(run_sampling_loop(
                "contract-sampler",
                self.config.contract_interval(),
                self.config.restart.clone(),
                self.shutdown_tx.subscribe(),
                move || {
                    let chain = chain.clone();
                    let cell = cell.clone();
                    async move {
                        cell.publish(sample_contracts(chain.as_ref()).await?);
                        Ok(())
                    }
                },
            ))
        };

        self.tasks = Some((node_task, contract_task));
    }

    /// Stop both sampling tasks and wait for them to wind down. No-op when
    /// already stopped.
    pub async fn stop(&mut self) {
        let Some((node_task, contract_task)) = self.tasks.take() else {
            return;
        };
        info!("stopping crawler");
        let _ = self.shutdown_tx.send(());
        let _ = node_task.await;
        let _ = contract_task.await;
    }

    /// True iff both sampling tasks are live. The sole liveness signal: a
    /// task that failed permanently shows up here.
    pub fn is_running(&self) -> bool {
        self.tasks
            .as_ref()
            .is_some_and(|(node, contract)| !node.is_finished() && !contract.is_finished())
    }

    /// The latest contract snapshot, if a contract cycle has completed.
    pub fn snapshot(&self) -> Option<Arc<ContractSnapshot>> {
        self.snapshot.latest()
    }

    /// A read-side history client against the same store.
    pub fn history(&self) -> HistoryClient<S> {
        HistoryClient::new(self.store.clone())
    }
}

/// One sampling task: tick, run a cycle, apply the failure policy.
async fn run_sampling_loop<F, Fut>(
    task: &'static str,
    period: Duration,
    policy: RestartPolicy,
    mut shutdown: broadcast::Receiver<()>,
    mut cycle: F,
) where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tracker = FailureTracker::new(policy);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!(task, "sampling task stopping");
                return;
            }
            _ = ticker.tick() => {}
        }

        match cycle().await {
            Ok(()) => tracker.on_success(),
            Err(error) => match tracker.on_failure() {
                FailureAction::Fatal => {
                    error!(
                        task,
                        %error,
                        failures = tracker.consecutive(),
                        "sampling task failed permanently"
                    );
                    return;
                }
                FailureAction::RetryAfter(backoff) => {
                    warn!(
                        task,
                        %error,
                        failures = tracker.consecutive(),
                        backoff_ms = backoff.as_millis() as u64,
                        "unhandled sampling error, backing off before retry"
                    );
                    tokio::select! {
                        _ = shutdown.recv() => return,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            },
        }
    }
}
