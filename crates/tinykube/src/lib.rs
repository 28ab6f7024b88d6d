//! TinyKube - node liveness tracking for a small cluster.
//!
//! A single control plane keeps a registry of worker nodes fed by
//! registrations and heartbeat streams, and periodically demotes nodes that
//! have gone quiet. Agents on each node register once and then heartbeat
//! until shut down.

mod runtime;

pub use runtime::{run_agent, shutdown_signal, ControlPlane};
