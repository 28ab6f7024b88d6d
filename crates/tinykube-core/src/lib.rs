//! Core types for TinyKube node liveness tracking.

pub mod clock;
pub mod cluster;
pub mod config;
pub mod error;
pub mod protocol;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cluster::{NodeCounts, NodeState, NodeStatus, StatusThresholds};
pub use config::TinykubeConfig;
pub use error::{Result, TinykubeError};
