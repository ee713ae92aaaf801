//! stakewatch-daemon: the snapshot crawler daemon.
//!
//! Single OS process running a Tokio async runtime. Boots the store schema,
//! starts the two sampling tasks, and runs until ctrl-c.

mod config;

use std::sync::Arc;

use stakewatch_chain::stub::{StubAdapter, StubParticipant};
use stakewatch_crawler::Crawler;
use stakewatch_store::InfluxClient;
use tracing::info;

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stakewatch=info".parse()?),
        )
        .init();

    info!("stakewatch daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Store client
    let store = Arc::new(InfluxClient::new(&config.store.url));

    // 3. Chain adapter
    let chain = Arc::new(demo_adapter(&config));

    // 4. Build the crawler; bootstraps the database and retention policy.
    let mut crawler = Crawler::connect(chain, store, config.crawler()).await?;

    // 5. Run until ctrl-c
    crawler.start();
    info!("crawler running");

    tokio::signal::ctrl_c().await?;
    info!("ctrl-c received, shutting down");

    crawler.stop().await;
    info!("daemon stopped");
    Ok(())
}

/// Scripted chain adapter serving the participants from the `[demo]`
/// config section.
///
/// TODO: replace with the JSON-RPC chain adapter once the staking node
/// exposes its query API.
fn demo_adapter(config: &DaemonConfig) -> StubAdapter {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let economics = config.economics();
    let current_period = economics.timestamp_to_period(now);
    let mut adapter = StubAdapter::with_economics(economics, now);
    for participant in &config.demo.participants {
        let locked = u128::from(participant.locked_tokens) * economics.base_units_per_token;
        adapter.dev_add_participant(
            &participant.staker,
            StubParticipant {
                worker: participant.worker.clone(),
                owned: 2 * locked,
                locked,
                first_period: current_period.saturating_sub(30),
                last_period: current_period + participant.periods_left,
                last_confirmed_period: current_period.saturating_sub(1),
            },
        );
    }
    adapter
}
