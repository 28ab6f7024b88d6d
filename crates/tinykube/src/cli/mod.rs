mod agent;
mod control;
mod status;

pub use agent::AgentCommand;
pub use control::ControlCommand;
pub use status::StatusCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tinykube_core::config::{ObservabilityConfig, TinykubeConfig};

/// TinyKube - node liveness tracking for small clusters
#[derive(Parser)]
#[command(name = "tinykube")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path. Defaults apply when the file is missing.
    #[arg(short, long, global = true, default_value = "tinykube.toml")]
    pub config: String,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the control plane.
    Control(ControlCommand),

    /// Run a node agent that registers and heartbeats.
    Agent(AgentCommand),

    /// Show the nodes known to a control plane.
    Status(StatusCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let config = TinykubeConfig::load_or_default(&self.config)?;
        init_tracing(&config.observability, self.verbose);

        match self.command {
            Commands::Control(cmd) => cmd.execute(config).await,
            Commands::Agent(cmd) => cmd.execute(config).await,
            Commands::Status(cmd) => cmd.execute(config).await,
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the config.
fn init_tracing(config: &ObservabilityConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
