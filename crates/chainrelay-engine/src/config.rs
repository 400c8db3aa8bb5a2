//! Confirmation-waiter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one block-confirmation task.
///
/// The start delay and the poll interval are separate settings: the delay
/// runs once before the first status poll, the interval between polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmConfig {
    /// Delay before the first poll, giving the indexing service a chance to
    /// begin processing the block.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    /// Interval between status polls while the block is not yet parsed.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Poll attempt budget. `0` polls forever.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Backoff applied instead of the plain interval after an RPC error.
    #[serde(default)]
    pub error_backoff: BackoffConfig,
}

fn default_start_delay_ms() -> u64 {
    1_000
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_max_polls() -> u32 {
    600
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: default_start_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
            error_backoff: BackoffConfig::default(),
        }
    }
}

impl ConfirmConfig {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns `true` if the attempt budget still allows another poll.
    pub fn within_budget(&self, polls: u32) -> bool {
        self.max_polls == 0 || polls < self.max_polls
    }
}

/// Exponential backoff, capped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_backoff_initial_ms")]
    pub initial_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
}

fn default_backoff_initial_ms() -> u64 {
    500
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_backoff_max_ms() -> u64 {
    10_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_backoff_initial_ms(),
            multiplier: default_backoff_multiplier(),
            max_ms: default_backoff_max_ms(),
        }
    }
}

impl BackoffConfig {
    /// Delay before the `attempt`-th consecutive retry (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms =
            self.initial_ms as f64 * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis(base_ms.min(self.max_ms as f64) as u64)
    }
}
