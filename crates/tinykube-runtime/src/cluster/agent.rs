use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tinykube_core::clock::{Clock, SystemClock};
use tinykube_core::error::{Result, TinykubeError};
use tinykube_core::protocol::{Heartbeat, RegisterRequest, RegisterResponse, StreamAck};

/// Connection from an agent to the control plane.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Outbound heartbeat stream type.
    type Sink: HeartbeatSink;

    /// Send a registration and wait for the verdict.
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse>;

    /// Open a long-lived heartbeat stream.
    async fn open_heartbeats(&self) -> Result<Self::Sink>;
}

/// Outbound half of a heartbeat stream.
#[async_trait]
pub trait HeartbeatSink: Send {
    /// Send one heartbeat.
    async fn send(&mut self, heartbeat: &Heartbeat) -> Result<()>;

    /// Close the stream and wait for the control plane's acknowledgement.
    async fn finish(self) -> Result<StreamAck>;
}

/// Heartbeat loop configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between heartbeats.
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// Why a heartbeat session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Shutdown was requested.
    Cancelled,
    /// A send failed; the session is not retried.
    SendFailed(String),
}

/// Outcome of a heartbeat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatSession {
    /// Heartbeats successfully written.
    pub sent: u64,
    /// Why the loop stopped.
    pub end: SessionEnd,
    /// Control-plane acknowledgement, if the stream closed cleanly.
    pub ack: Option<StreamAck>,
}

/// Node-side agent: registers once, then heartbeats until told to stop.
pub struct Agent<C> {
    client: C,
    node_name: String,
    config: HeartbeatConfig,
    clock: Arc<dyn Clock>,
}

impl<C: ControlPlaneClient> Agent<C> {
    /// Create a new agent.
    pub fn new(client: C, node_name: impl Into<String>, config: HeartbeatConfig) -> Self {
        Self {
            client,
            node_name: node_name.into(),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a specific clock for heartbeat timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the node name.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Register with the control plane.
    ///
    /// A rejection is returned as [`TinykubeError::Rejected`].
    pub async fn register(&self) -> Result<RegisterResponse> {
        tracing::info!(node = %self.node_name, "Attempting to register node");

        let response = self
            .client
            .register(&RegisterRequest::new(self.node_name.clone()))
            .await?;

        if !response.accepted {
            tracing::warn!(reason = %response.reason, "Registration rejected");
            return Err(TinykubeError::Rejected(response.reason));
        }

        tracing::info!(reason = %response.reason, "Registration successful");
        Ok(response)
    }

    /// Send heartbeats until `cancel` fires or a send fails.
    pub async fn run_heartbeats(&self, cancel: CancellationToken) -> Result<HeartbeatSession> {
        tracing::info!("Starting heartbeat stream");
        let mut sink = self.client.open_heartbeats().await?;
        let mut sent = 0u64;

        let end = loop {
            if cancel.is_cancelled() {
                break SessionEnd::Cancelled;
            }

            let heartbeat = Heartbeat::new(self.node_name.clone(), self.clock.now_ms());
            if let Err(e) = sink.send(&heartbeat).await {
                tracing::warn!("Failed to send heartbeat, connection lost: {}", e);
                break SessionEnd::SendFailed(e.to_string());
            }
            sent += 1;
            tracing::debug!(count = sent, at_ms = heartbeat.now_unix_ms, "Sent heartbeat");

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = cancel.cancelled() => break SessionEnd::Cancelled,
            }
        };

        tracing::info!(sent, "Stopping heartbeats");
        let ack = match sink.finish().await {
            Ok(ack) => {
                tracing::info!(
                    received = ack.received,
                    accepted = ack.accepted,
                    "Heartbeat stream completed"
                );
                Some(ack)
            }
            Err(e) => {
                tracing::warn!("Heartbeat stream did not close cleanly: {}", e);
                None
            }
        };

        Ok(HeartbeatSession { sent, end, ack })
    }

    /// Register, then heartbeat until cancelled.
    ///
    /// Registration failure of any kind aborts before heartbeating starts.
    pub async fn run(&self, cancel: CancellationToken) -> Result<HeartbeatSession> {
        self.register().await?;
        self.run_heartbeats(cancel).await
    }
}
