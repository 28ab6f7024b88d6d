use serde::{Deserialize, Serialize};

use super::status::{classify, StatusThresholds};

/// Node status in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// Identity allocated by provisioning but never contacted the control plane.
    Reserved,
    /// Healthy: contact within the fresh window.
    Ready,
    /// Registered but silent for longer than the not-ready window.
    NotReady,
    /// Silent for substantially longer than the not-ready window.
    Suspect,
    /// Not derivable from any other state.
    Unknown,
}

impl NodeStatus {
    /// All statuses, in declaration order.
    pub const ALL: [NodeStatus; 5] = [
        Self::Reserved,
        Self::Ready,
        Self::NotReady,
        Self::Suspect,
        Self::Unknown,
    ];

    /// Convert to the wire/display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reserved => "RESERVED",
            Self::Ready => "READY",
            Self::NotReady => "NOT_READY",
            Self::Suspect => "SUSPECT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse from string. Unrecognised input maps to `Unknown`.
    pub fn from_str(s: &str) -> Self {
        match s {
            "RESERVED" => Self::Reserved,
            "READY" => Self::Ready,
            "NOT_READY" => Self::NotReady,
            "SUSPECT" => Self::Suspect,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Liveness state of a single cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// Unique node name; the registry key.
    pub name: String,
    /// Network origin captured at registration. Advisory only.
    pub peer: String,
    /// Time of the most recent contact, in epoch milliseconds.
    pub last_seen_ms: i64,
    /// Current status.
    pub status: NodeStatus,
}

impl NodeState {
    /// Create a state that has not yet been confirmed ready.
    pub fn new(name: impl Into<String>, peer: impl Into<String>, last_seen_ms: i64) -> Self {
        Self {
            name: name.into(),
            peer: peer.into(),
            last_seen_ms,
            status: NodeStatus::NotReady,
        }
    }

    /// Create a state for a node that has just made contact.
    pub fn ready(name: impl Into<String>, peer: impl Into<String>, now_ms: i64) -> Self {
        Self {
            status: NodeStatus::Ready,
            ..Self::new(name, peer, now_ms)
        }
    }

    /// Check if the node is currently marked ready.
    pub fn is_healthy(&self) -> bool {
        self.status == NodeStatus::Ready
    }

    /// Milliseconds since last contact, saturating at the `i64` bounds.
    pub fn silent_for(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.last_seen_ms)
    }

    /// Check if the node has been silent longer than `timeout_ms`.
    pub fn is_suspect(&self, now_ms: i64, timeout_ms: i64) -> bool {
        self.silent_for(now_ms) > timeout_ms
    }

    /// Check if the node has been silent longer than `not_ready_timeout_ms`.
    pub fn is_not_ready(&self, now_ms: i64, not_ready_timeout_ms: i64) -> bool {
        self.silent_for(now_ms) > not_ready_timeout_ms
    }

    /// Status the next sweep at `now_ms` would assign, without mutating.
    pub fn effective_status(&self, now_ms: i64, thresholds: &StatusThresholds) -> NodeStatus {
        classify(self.status, self.silent_for(now_ms), thresholds)
    }
}
