use anyhow::Result;
use clap::Parser;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tinykube::{shutdown_signal, ControlPlane};
use tinykube_core::config::TinykubeConfig;

/// Run the control plane.
#[derive(Parser)]
pub struct ControlCommand {
    /// Address to listen on (overrides config).
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Silence after which a node is marked NOT_READY, in milliseconds.
    #[arg(long)]
    pub not_ready_timeout_ms: Option<u64>,

    /// Silence after which a node is marked SUSPECT, in milliseconds.
    #[arg(long)]
    pub suspect_timeout_ms: Option<u64>,

    /// Interval between liveness sweeps, in milliseconds.
    #[arg(long)]
    pub sweep_interval_ms: Option<u64>,
}

impl ControlCommand {
    /// Apply command-line overrides to the loaded configuration.
    fn apply(&self, config: &mut TinykubeConfig) {
        if let Some(listen) = &self.listen {
            config.control.listen_addr = listen.clone();
        }
        if let Some(ms) = self.not_ready_timeout_ms {
            config.liveness.not_ready_timeout_ms = ms;
        }
        if let Some(ms) = self.suspect_timeout_ms {
            config.liveness.suspect_timeout_ms = ms;
        }
        if let Some(ms) = self.sweep_interval_ms {
            config.liveness.sweep_interval_ms = ms;
        }
    }

    /// Execute the control command.
    pub async fn execute(self, mut config: TinykubeConfig) -> Result<()> {
        self.apply(&mut config);

        if config.liveness.sweep_interval_ms == 0 {
            anyhow::bail!("Sweep interval must be greater than zero");
        }

        println!();
        println!(
            "  {} v{}",
            style("TinyKube control plane").bold().cyan(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "  Listening on {}",
            style(&config.control.listen_addr).cyan()
        );
        println!();

        if !config.liveness.thresholds().suspect_reachable() {
            info!(
                "SUSPECT window ({} ms) is not shorter than NOT_READY window ({} ms); silent nodes go straight to NOT_READY",
                config.liveness.suspect_timeout_ms, config.liveness.not_ready_timeout_ms
            );
        }

        let shutdown = CancellationToken::new();
        tokio::spawn(shutdown_signal(shutdown.clone()));

        ControlPlane::new(config).run(shutdown).await?;

        println!("\n  Control plane stopped");
        Ok(())
    }
}
