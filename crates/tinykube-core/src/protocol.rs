//! Messages exchanged between agents and the control plane.

use serde::{Deserialize, Serialize};

use crate::cluster::{NodeCounts, NodeState, NodeStatus};

/// Reason returned when a registration carries no node name.
pub const REJECT_EMPTY_NAME: &str = "Node name cannot be empty";

/// Reason returned on successful registration.
pub const WELCOME: &str = "Welcome to TinyKube cluster!";

/// One-shot registration request sent by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Node name to register under.
    pub name: String,
}

impl RegisterRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Control-plane answer to a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Whether the node was admitted.
    pub accepted: bool,
    /// Human-readable explanation.
    pub reason: String,
}

impl RegisterResponse {
    /// An accepted registration.
    pub fn accepted(reason: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: reason.into(),
        }
    }

    /// A rejected registration.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

/// A single heartbeat on the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Name the sender registered under.
    pub node_name: String,
    /// Sender-local time in epoch milliseconds. Informational only.
    pub now_unix_ms: i64,
}

impl Heartbeat {
    pub fn new(node_name: impl Into<String>, now_unix_ms: i64) -> Self {
        Self {
            node_name: node_name.into(),
            now_unix_ms,
        }
    }
}

/// A frame sent by the agent on the heartbeat stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// One heartbeat.
    Heartbeat(Heartbeat),
    /// The agent is done; the control plane answers with a [`StreamAck`].
    Close,
}

/// Terminal acknowledgement sent when a heartbeat stream closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamAck {
    /// Heartbeats read off the stream.
    pub received: u64,
    /// Heartbeats that touched a registered node.
    pub accepted: u64,
}

/// A node as shown in a reporting snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    #[serde(flatten)]
    pub state: NodeState,
    /// Milliseconds since last contact at the time of the snapshot.
    pub silent_ms: i64,
    /// Status the next sweep would assign.
    pub effective_status: NodeStatus,
}

/// Point-in-time registry report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodesReport {
    /// Nodes sorted by name.
    pub nodes: Vec<NodeView>,
    /// Per-status counts over the stored statuses.
    pub counts: NodeCounts,
    /// Per-status counts over the effective statuses.
    #[serde(default)]
    pub effective_counts: NodeCounts,
    /// Control-plane time the report was taken at.
    pub taken_at_ms: i64,
}
