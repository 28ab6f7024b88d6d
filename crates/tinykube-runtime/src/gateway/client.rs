use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use tinykube_core::error::{Result, TinykubeError};
use tinykube_core::protocol::{
    Heartbeat, NodesReport, RegisterRequest, RegisterResponse, StreamAck, StreamFrame,
};

use crate::cluster::{ControlPlaneClient, HeartbeatSink};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn transport(e: impl std::fmt::Display) -> TinykubeError {
    TinykubeError::Transport(e.to_string())
}

/// Turn `host:port` or a URL into an HTTP base URL without a trailing slash.
pub fn http_base_url(server: &str) -> String {
    let server = server.trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("http://{}", server)
    }
}

/// WebSocket counterpart of [`http_base_url`].
pub fn ws_base_url(server: &str) -> String {
    let base = http_base_url(server);
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base
    }
}

/// Agent-side client for the control-plane HTTP API.
#[derive(Debug, Clone)]
pub struct HttpControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
    ws_url: String,
}

impl HttpControlPlaneClient {
    /// Create a client for `server` (`host:port` or a URL).
    pub fn new(server: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(transport)?;

        Ok(Self {
            http,
            base_url: http_base_url(server),
            ws_url: ws_base_url(server),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current registry report.
    pub async fn nodes(&self) -> Result<NodesReport> {
        self.http
            .get(format!("{}/v1/nodes", self.base_url))
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)
    }
}

#[async_trait]
impl ControlPlaneClient for HttpControlPlaneClient {
    type Sink = WsHeartbeatSink;

    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        self.http
            .post(format!("{}/v1/register", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)
    }

    async fn open_heartbeats(&self) -> Result<WsHeartbeatSink> {
        let url = format!("{}/v1/heartbeats", self.ws_url);
        tracing::debug!("Connecting heartbeat stream to {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| TinykubeError::Transport(format!("WebSocket connect failed: {}", e)))?;

        Ok(WsHeartbeatSink { ws_stream })
    }
}

/// Heartbeat stream over a WebSocket connection.
pub struct WsHeartbeatSink {
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsHeartbeatSink {
    async fn send_frame(&mut self, frame: &StreamFrame) -> Result<()> {
        let json = serde_json::to_string(frame)?;
        self.ws_stream
            .send(Message::Text(json.into()))
            .await
            .map_err(transport)
    }
}

#[async_trait]
impl HeartbeatSink for WsHeartbeatSink {
    async fn send(&mut self, heartbeat: &Heartbeat) -> Result<()> {
        self.send_frame(&StreamFrame::Heartbeat(heartbeat.clone())).await
    }

    async fn finish(mut self) -> Result<StreamAck> {
        self.send_frame(&StreamFrame::Close).await?;

        while let Some(msg) = self.ws_stream.next().await {
            match msg.map_err(transport)? {
                Message::Text(text) => {
                    if let Ok(ack) = serde_json::from_str::<StreamAck>(text.as_str()) {
                        let _ = self.ws_stream.close(None).await;
                        return Ok(ack);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        Err(TinykubeError::Transport(
            "Heartbeat stream closed before acknowledgement".to_string(),
        ))
    }
}
