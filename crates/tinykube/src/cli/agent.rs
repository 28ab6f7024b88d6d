use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tokio_util::sync::CancellationToken;

use tinykube::{run_agent, shutdown_signal};
use tinykube_core::config::TinykubeConfig;
use tinykube_runtime::SessionEnd;

/// Run a node agent.
#[derive(Parser)]
pub struct AgentCommand {
    /// Node name (defaults to config, then the host name).
    #[arg(short, long)]
    pub node_name: Option<String>,

    /// Control-plane address (overrides config).
    #[arg(short, long)]
    pub server: Option<String>,

    /// Heartbeat interval in milliseconds (overrides config).
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

impl AgentCommand {
    /// Resolve the node name from the flag, the config, or the host name.
    fn resolve_node_name(&self, config: &TinykubeConfig) -> Result<String> {
        if let Some(name) = self.node_name.as_ref().or(config.agent.node_name.as_ref()) {
            return Ok(name.clone());
        }
        let host = hostname::get().context("Failed to read host name")?;
        Ok(host.to_string_lossy().into_owned())
    }

    /// Execute the agent command.
    pub async fn execute(self, mut config: TinykubeConfig) -> Result<()> {
        if let Some(server) = &self.server {
            config.agent.server = server.clone();
        }
        if let Some(ms) = self.interval_ms {
            config.agent.heartbeat_interval_ms = ms;
        }

        let node_name = self.resolve_node_name(&config)?;
        if node_name.trim().is_empty() {
            anyhow::bail!("Node name is required (use --node-name)");
        }

        println!(
            "  {} {} -> {}",
            style("TinyKube agent").bold().cyan(),
            style(&node_name).bold(),
            config.agent.server
        );

        let shutdown = CancellationToken::new();
        tokio::spawn(shutdown_signal(shutdown.clone()));

        let session = run_agent(&config.agent, &node_name, shutdown).await?;

        match &session.ack {
            Some(ack) => println!("  Sent {} heartbeats ({} accepted)", session.sent, ack.accepted),
            None => println!("  Sent {} heartbeats", session.sent),
        }

        match session.end {
            SessionEnd::Cancelled => Ok(()),
            SessionEnd::SendFailed(reason) => {
                anyhow::bail!("Heartbeat stream failed: {}", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(node_name: Option<&str>) -> AgentCommand {
        AgentCommand {
            node_name: node_name.map(str::to_string),
            server: None,
            interval_ms: None,
        }
    }

    #[test]
    fn test_flag_wins_over_config() {
        let mut config = TinykubeConfig::default();
        config.agent.node_name = Some("from-config".to_string());

        let name = command(Some("from-flag")).resolve_node_name(&config).unwrap();
        assert_eq!(name, "from-flag");
    }

    #[test]
    fn test_config_name_used_without_flag() {
        let mut config = TinykubeConfig::default();
        config.agent.node_name = Some("from-config".to_string());

        let name = command(None).resolve_node_name(&config).unwrap();
        assert_eq!(name, "from-config");
    }

    #[test]
    fn test_falls_back_to_host_name() {
        let name = command(None)
            .resolve_node_name(&TinykubeConfig::default())
            .unwrap();
        assert!(!name.is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_rejected_locally() {
        let err = command(Some("  "))
            .execute(TinykubeConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Node name is required"));
    }
}
