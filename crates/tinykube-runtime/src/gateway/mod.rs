mod client;
mod server;
mod websocket;

pub use client::{http_base_url, ws_base_url, HttpControlPlaneClient, WsHeartbeatSink};
pub use server::{ControlPlaneServer, GatewayState, HealthResponse};
pub use websocket::heartbeats_handler;
