use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use tinykube_core::error::{Result, TinykubeError};
use tinykube_core::protocol::{NodesReport, RegisterRequest, RegisterResponse};

use super::websocket::heartbeats_handler;
use crate::cluster::LivenessService;

/// State shared by every route.
#[derive(Clone)]
pub struct GatewayState {
    pub service: LivenessService,
    /// Fires on server shutdown; open heartbeat streams end with it.
    pub shutdown: CancellationToken,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Control-plane HTTP server.
pub struct ControlPlaneServer {
    listener: TcpListener,
    service: LivenessService,
}

impl ControlPlaneServer {
    /// Bind the listening socket.
    pub async fn bind(addr: &str, service: LivenessService) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TinykubeError::Transport(format!("Failed to bind {}: {}", addr, e)))?;
        Ok(Self { listener, service })
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Build the Axum router.
    pub fn router(state: GatewayState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/v1/register", post(register_handler))
            .route("/v1/heartbeats", any(heartbeats_handler))
            .route("/v1/nodes", get(nodes_handler))
            .with_state(Arc::new(state))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// Serve until `shutdown` fires.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.local_addr()?;
        let router = Self::router(GatewayState {
            service: self.service,
            shutdown: shutdown.clone(),
        });

        tracing::info!("Control plane listening on {}", addr);

        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

        tracing::info!("Control plane stopped");
        Ok(())
    }
}

/// Health check handler.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Registration handler. The origin is the TCP peer, never client-supplied.
async fn register_handler(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(request): Json<RegisterRequest>,
) -> Json<RegisterResponse> {
    Json(state.service.register(&request.name, &peer.to_string()))
}

/// Reporting snapshot handler.
async fn nodes_handler(State(state): State<Arc<GatewayState>>) -> Json<NodesReport> {
    Json(state.service.report())
}
