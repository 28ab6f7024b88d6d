use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::{StatusThresholds, DEFAULT_NOT_READY_TIMEOUT_MS, DEFAULT_SUSPECT_TIMEOUT_MS};

/// Liveness tracking configuration for the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Silence after which a node is marked not ready, in milliseconds.
    #[serde(default = "default_not_ready_timeout")]
    pub not_ready_timeout_ms: u64,

    /// Silence after which a node is marked suspect, in milliseconds.
    #[serde(default = "default_suspect_timeout")]
    pub suspect_timeout_ms: u64,

    /// Interval between sweeps, in milliseconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            not_ready_timeout_ms: default_not_ready_timeout(),
            suspect_timeout_ms: default_suspect_timeout(),
            sweep_interval_ms: default_sweep_interval(),
        }
    }
}

impl LivenessConfig {
    /// Thresholds handed to the sweep.
    pub fn thresholds(&self) -> StatusThresholds {
        StatusThresholds::new(
            clamp_ms(self.not_ready_timeout_ms),
            clamp_ms(self.suspect_timeout_ms),
        )
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Values past `i64::MAX` mean "never" rather than wrapping negative.
fn clamp_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

fn default_not_ready_timeout() -> u64 {
    DEFAULT_NOT_READY_TIMEOUT_MS as u64
}

fn default_suspect_timeout() -> u64 {
    DEFAULT_SUSPECT_TIMEOUT_MS as u64
}

fn default_sweep_interval() -> u64 {
    5_000
}
