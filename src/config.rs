use std::time::Duration;

use crate::model::Ms;

/// Debounce interval used when `MAILPOOL_DEBOUNCE_MS` is unset: two minutes.
pub const DEFAULT_DEBOUNCE_MS: Ms = 120_000;

/// Fixed delay before the first sweep after startup.
pub const SWEEP_INITIAL_DELAY_MS: Ms = 1_000;

/// Pool configuration. The sweep cadence is derived, not configured: sweeping
/// at twice the debounce frequency bounds worst-case notification latency to
/// roughly 1.5x the interval while still giving every entry at least one full
/// round to accumulate further edits.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Minimum idle age (ms) an entry must reach before a sweep sends it.
    pub debounce_interval_ms: Ms,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            debounce_interval_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl PoolConfig {
    pub fn new(debounce_interval_ms: Ms) -> Self {
        Self {
            debounce_interval_ms,
        }
    }

    /// Read configuration from the environment, falling back to defaults.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MAILPOOL_DEBOUNCE_MS` | `120000` | Debounce interval in ms |
    pub fn from_env() -> Self {
        let debounce_interval_ms = std::env::var("MAILPOOL_DEBOUNCE_MS")
            .ok()
            .and_then(|s| s.parse::<Ms>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_DEBOUNCE_MS);
        Self {
            debounce_interval_ms,
        }
    }

    /// Sweep period: half the debounce interval, never below 1 ms.
    pub fn sweep_period(&self) -> Duration {
        Duration::from_millis((self.debounce_interval_ms / 2).max(1) as u64)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(SWEEP_INITIAL_DELAY_MS as u64)
    }
}
