use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tinykube_core::clock::Clock;
use tinykube_core::cluster::StatusThresholds;
use tinykube_core::config::LivenessConfig;

use super::registry::NodeRegistry;

/// Sweep loop configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Interval between sweeps.
    pub interval: Duration,
    /// Silence thresholds applied on every pass.
    pub thresholds: StatusThresholds,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            thresholds: StatusThresholds::default(),
        }
    }
}

impl From<&LivenessConfig> for SweepConfig {
    fn from(config: &LivenessConfig) -> Self {
        Self {
            interval: config.sweep_interval(),
            thresholds: config.thresholds(),
        }
    }
}

/// Periodic reclassification of every registered node.
///
/// This is the only thing that moves a silent node away from `READY`.
pub struct SweepLoop {
    registry: Arc<NodeRegistry>,
    clock: Arc<dyn Clock>,
    config: SweepConfig,
    running: Arc<AtomicBool>,
    passes: AtomicU64,
}

impl SweepLoop {
    /// Create a new sweep loop.
    pub fn new(registry: Arc<NodeRegistry>, clock: Arc<dyn Clock>, config: SweepConfig) -> Self {
        Self {
            registry,
            clock,
            config,
            running: Arc::new(AtomicBool::new(false)),
            passes: AtomicU64::new(0),
        }
    }

    /// Check if the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of completed sweep passes.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Run a single sweep now. Returns how many nodes changed status.
    pub fn sweep_once(&self) -> usize {
        let changed = self
            .registry
            .sweep_with(self.clock.now_ms(), &self.config.thresholds);
        self.passes.fetch_add(1, Ordering::SeqCst);

        if changed > 0 {
            let counts = self.registry.count_by_status();
            tracing::info!(
                changed,
                ready = counts.ready,
                not_ready = counts.not_ready,
                suspect = counts.suspect,
                total = counts.total,
                "Sweep reclassified nodes"
            );
        }

        changed
    }

    /// Run the sweep loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        self.running.store(true, Ordering::SeqCst);

        if !self.config.thresholds.suspect_reachable() {
            tracing::debug!(
                not_ready_ms = self.config.thresholds.not_ready_ms,
                suspect_ms = self.config.thresholds.suspect_ms,
                "Not-ready threshold is checked first; sweeps will not report SUSPECT"
            );
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {
                    self.sweep_once();
                }
                _ = cancel.cancelled() => {
                    tracing::info!("Sweep loop shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
    }
}
