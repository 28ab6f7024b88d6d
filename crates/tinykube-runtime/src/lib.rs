//! Liveness engine and transport for TinyKube.
//!
//! - [`cluster`]: node registry, sweep loop, control-plane protocol handler
//!   and the node-side agent
//! - [`gateway`]: HTTP/WebSocket server and client for the protocol

pub mod cluster;
pub mod gateway;

pub use cluster::{
    Agent, ControlPlaneClient, HeartbeatConfig, HeartbeatSession, HeartbeatSink, LivenessService,
    NodeRegistry, SessionEnd, SweepConfig, SweepLoop,
};
pub use gateway::{ControlPlaneServer, GatewayState, HttpControlPlaneClient};
