//! Configuration file management.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stakewatch_chain::Economics;
use stakewatch_crawler::{CrawlerConfig, ParticipantPolicy, RestartPolicy};
use stakewatch_types::{DEFAULT_REFRESH_RATE_SECS, DEFAULT_STAGGER_OFFSET_SECS};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Time-series store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Chain/economics settings.
    #[serde(default)]
    pub chain: ChainConfig,
    /// Sampling cadence and failure policy.
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Scripted participants served by the built-in demo adapter.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Demo adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Participants the demo adapter reports; override with
    /// `[[demo.participants]]` tables in the config file.
    #[serde(default = "default_demo_participants")]
    pub participants: Vec<DemoParticipant>,
}

/// One scripted participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoParticipant {
    /// Staker address.
    pub staker: String,
    /// Worker address bound to the staker.
    pub worker: String,
    /// Locked stake in whole tokens.
    pub locked_tokens: u64,
    /// Periods remaining on the stake window, counted from today.
    pub periods_left: u32,
}

/// Time-series store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the store's HTTP API.
    #[serde(default = "default_store_url")]
    pub url: String,
}

/// Chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Duration of one staking period in seconds.
    #[serde(default = "default_seconds_per_period")]
    pub seconds_per_period: u64,
    /// Decimal places of the base token unit.
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
}

/// Sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Node sampling interval in seconds.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate_secs: u64,
    /// Stagger between the node and contract timers in seconds.
    #[serde(default = "default_stagger_offset")]
    pub stagger_offset_secs: u64,
    /// Retry failed cycles instead of stopping on the first error.
    #[serde(default = "default_true")]
    pub restart_on_error: bool,
    /// Consecutive failures tolerated before a task gives up.
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
    /// Backoff before the first retry, in seconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,
    /// Cap on the exponential backoff, in seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
    /// Skip a participant whose lookups fail instead of aborting the cycle.
    #[serde(default = "default_true")]
    pub skip_failed_participants: bool,
}

// Default value functions

fn default_store_url() -> String {
    stakewatch_store::client::DEFAULT_STORE_URL.to_string()
}

fn default_seconds_per_period() -> u64 {
    stakewatch_chain::SECONDS_PER_PERIOD
}

fn default_token_decimals() -> u32 {
    18
}

fn default_refresh_rate() -> u64 {
    DEFAULT_REFRESH_RATE_SECS
}

fn default_stagger_offset() -> u64 {
    DEFAULT_STAGGER_OFFSET_SECS
}

fn default_true() -> bool {
    true
}

fn default_max_failures() -> u32 {
    10
}

fn default_initial_backoff() -> u64 {
    1
}

fn default_max_backoff() -> u64 {
    60
}

fn default_demo_participants() -> Vec<DemoParticipant> {
    [
        (
            "0xf61e4b0bd4f5f766223bdcbea0f4e4c3a97d4a8e",
            "0x25a633da7a29dd7d5c903a594b0ee91ca954ffb5",
            15_000u64,
            180u32,
        ),
        (
            "0x3f8bd2a82448dea2cdb1f2f0b4c4d8e1f5a6b7c8",
            "0x9f1c27e4a6d3b58f0e2a4c6d8b0f2e4a6c8d0b1a",
            40_000,
            365,
        ),
        (
            "0x7c44e1a9b2d3c4e5f60718293a4b5c6d7e8f9a0b",
            "0x510fb1e2d3c4b5a69788796a5b4c3d2e1f0e9d8c",
            2_500,
            30,
        ),
    ]
    .into_iter()
    .map(|(staker, worker, locked_tokens, periods_left)| DemoParticipant {
        staker: staker.to_string(),
        worker: worker.to_string(),
        locked_tokens,
        periods_left,
    })
    .collect()
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            participants: default_demo_participants(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            seconds_per_period: default_seconds_per_period(),
            token_decimals: default_token_decimals(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            refresh_rate_secs: default_refresh_rate(),
            stagger_offset_secs: default_stagger_offset(),
            restart_on_error: true,
            max_consecutive_failures: default_max_failures(),
            initial_backoff_secs: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            skip_failed_participants: true,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Economic conversion rules from the chain section.
    pub fn economics(&self) -> Economics {
        Economics {
            base_units_per_token: 10u128.pow(self.chain.token_decimals),
            seconds_per_period: self.chain.seconds_per_period,
        }
    }

    /// Crawler timing and policy from the sampling section.
    pub fn crawler(&self) -> CrawlerConfig {
        CrawlerConfig {
            refresh_rate: Duration::from_secs(self.sampling.refresh_rate_secs),
            stagger_offset: Duration::from_secs(self.sampling.stagger_offset_secs),
            participant_policy: if self.sampling.skip_failed_participants {
                ParticipantPolicy::SkipFailed
            } else {
                ParticipantPolicy::FailFast
            },
            restart: RestartPolicy {
                restart_on_error: self.sampling.restart_on_error,
                max_consecutive_failures: self.sampling.max_consecutive_failures,
                initial_backoff: Duration::from_secs(self.sampling.initial_backoff_secs),
                max_backoff: Duration::from_secs(self.sampling.max_backoff_secs),
            },
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Data directory: `$STAKEWATCH_DATA_DIR`, else `$HOME/.stakewatch`.
    fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("STAKEWATCH_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".stakewatch"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/stakewatch"))
    }
}
