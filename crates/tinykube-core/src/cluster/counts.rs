use serde::{Deserialize, Serialize};

use super::node::{NodeState, NodeStatus};

/// Node count statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounts {
    /// Reserved nodes.
    pub reserved: usize,
    /// Ready nodes.
    pub ready: usize,
    /// Not-ready nodes.
    pub not_ready: usize,
    /// Suspect nodes.
    pub suspect: usize,
    /// Nodes in an unknown state.
    pub unknown: usize,
    /// Total nodes.
    pub total: usize,
}

impl NodeCounts {
    /// Tally a set of node states.
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a NodeState>) -> Self {
        let mut counts = Self::default();
        for state in states {
            counts.record(state.status);
        }
        counts
    }

    /// Count one more node with the given status.
    pub fn record(&mut self, status: NodeStatus) {
        match status {
            NodeStatus::Reserved => self.reserved += 1,
            NodeStatus::Ready => self.ready += 1,
            NodeStatus::NotReady => self.not_ready += 1,
            NodeStatus::Suspect => self.suspect += 1,
            NodeStatus::Unknown => self.unknown += 1,
        }
        self.total += 1;
    }

    /// Number of nodes with the given status.
    pub fn get(&self, status: NodeStatus) -> usize {
        match status {
            NodeStatus::Reserved => self.reserved,
            NodeStatus::Ready => self.ready,
            NodeStatus::NotReady => self.not_ready,
            NodeStatus::Suspect => self.suspect,
            NodeStatus::Unknown => self.unknown,
        }
    }
}
