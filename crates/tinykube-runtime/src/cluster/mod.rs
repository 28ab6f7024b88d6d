mod agent;
mod registry;
mod service;
mod sweep;

pub use agent::{
    Agent, ControlPlaneClient, HeartbeatConfig, HeartbeatSession, HeartbeatSink, SessionEnd,
};
pub use registry::NodeRegistry;
pub use service::LivenessService;
pub use sweep::{SweepConfig, SweepLoop};
