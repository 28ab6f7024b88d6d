//! Process-level wiring for the control plane and the agent.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tinykube_core::clock::{Clock, SystemClock};
use tinykube_core::config::{AgentConfig, TinykubeConfig};
use tinykube_core::error::{Result, TinykubeError};
use tinykube_runtime::{
    Agent, ControlPlaneServer, HeartbeatConfig, HeartbeatSession, HttpControlPlaneClient,
    LivenessService, NodeRegistry, SweepConfig, SweepLoop,
};

/// The control-plane process: registry, sweep loop and HTTP gateway.
pub struct ControlPlane {
    config: TinykubeConfig,
    registry: Arc<NodeRegistry>,
    clock: Arc<dyn Clock>,
}

impl ControlPlane {
    /// Create a control plane with an empty registry.
    pub fn new(config: TinykubeConfig) -> Self {
        Self {
            config,
            registry: Arc::new(NodeRegistry::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Get the registry.
    pub fn registry(&self) -> Arc<NodeRegistry> {
        self.registry.clone()
    }

    /// Get the configuration.
    pub fn config(&self) -> &TinykubeConfig {
        &self.config
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let liveness = &self.config.liveness;
        tracing::info!(
            not_ready_ms = liveness.not_ready_timeout_ms,
            suspect_ms = liveness.suspect_timeout_ms,
            sweep_interval_ms = liveness.sweep_interval_ms,
            "TinyKube control plane starting"
        );

        let service = LivenessService::with_clock(
            self.registry.clone(),
            self.clock.clone(),
            liveness.thresholds(),
        );
        let server = ControlPlaneServer::bind(&self.config.control.listen_addr, service).await?;

        let sweeper = SweepLoop::new(
            self.registry.clone(),
            self.clock.clone(),
            SweepConfig::from(liveness),
        );
        let sweep_handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { sweeper.run(shutdown).await })
        };

        let result = server.serve(shutdown.clone()).await;

        // The server may have exited on its own; make sure the sweep stops too
        shutdown.cancel();
        if let Err(e) = sweep_handle.await {
            tracing::warn!("Sweep task failed: {}", e);
        }

        tracing::info!(nodes = self.registry.size(), "TinyKube control plane stopped");
        result
    }
}

/// Register with the control plane and heartbeat until `shutdown` fires.
pub async fn run_agent(
    config: &AgentConfig,
    node_name: &str,
    shutdown: CancellationToken,
) -> Result<HeartbeatSession> {
    if node_name.is_empty() {
        return Err(TinykubeError::InvalidArgument(
            "Node name is required".to_string(),
        ));
    }

    tracing::info!(node = %node_name, server = %config.server, "TinyKube agent starting");

    let client = HttpControlPlaneClient::new(&config.server)?;
    let agent = Agent::new(
        client,
        node_name,
        HeartbeatConfig {
            interval: config.heartbeat_interval(),
        },
    );

    agent.run(shutdown).await
}

/// Cancel `token` on SIGINT or SIGTERM.
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = token.cancelled() => return,
    }

    tracing::info!("Received shutdown signal");
    token.cancel();
}
