use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use console::style;

use tinykube_core::cluster::{NodeCounts, NodeStatus};
use tinykube_core::config::TinykubeConfig;
use tinykube_core::protocol::{NodeView, NodesReport};
use tinykube_runtime::HttpControlPlaneClient;

/// Show the nodes known to a control plane.
#[derive(Parser)]
pub struct StatusCommand {
    /// Control-plane address (defaults to the agent server in config).
    #[arg(short, long)]
    pub server: Option<String>,
}

impl StatusCommand {
    /// Execute the status command.
    pub async fn execute(self, config: TinykubeConfig) -> Result<()> {
        let server = self.server.unwrap_or(config.agent.server);
        let client = HttpControlPlaneClient::new(&server)?;
        let report = client.nodes().await?;

        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &NodesReport) {
    if report.nodes.is_empty() {
        println!("No nodes registered");
        return;
    }

    println!(
        "{:<24} {:<10} {:<10} {:<25} {:>10}  {}",
        style("NAME").bold(),
        style("STATUS").bold(),
        style("NEXT").bold(),
        style("LAST SEEN").bold(),
        style("SILENT").bold(),
        style("PEER").bold()
    );
    for node in &report.nodes {
        println!("{}", format_row(node));
    }

    println!();
    println!("{}", format_counts("stored", &report.counts));
    println!("{}", format_counts("next sweep", &report.effective_counts));
}

fn format_counts(label: &str, counts: &NodeCounts) -> String {
    format!(
        "{} nodes ({}): {} ready, {} suspect, {} not ready",
        counts.total,
        label,
        style(counts.ready).green(),
        style(counts.suspect).yellow(),
        style(counts.not_ready).red()
    )
}

fn format_row(node: &NodeView) -> String {
    format!(
        "{:<24} {:<10} {:<10} {:<25} {:>10}  {}",
        node.state.name,
        styled_status(node.state.status),
        node.effective_status.as_str(),
        format_timestamp(node.state.last_seen_ms),
        format_silence(node.silent_ms),
        node.state.peer
    )
}

fn styled_status(status: NodeStatus) -> String {
    let text = format!("{:<10}", status.as_str());
    match status {
        NodeStatus::Ready => style(text).green().to_string(),
        NodeStatus::Suspect => style(text).yellow().to_string(),
        NodeStatus::NotReady => style(text).red().to_string(),
        NodeStatus::Reserved | NodeStatus::Unknown => style(text).dim().to_string(),
    }
}

fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn format_silence(ms: i64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms.max(0))
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format!("{}m{}s", ms / 60_000, (ms % 60_000) / 1_000)
    }
}
