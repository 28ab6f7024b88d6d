use std::sync::Arc;

use futures_util::{Stream, StreamExt};

use tinykube_core::clock::{Clock, SystemClock};
use tinykube_core::cluster::{NodeCounts, NodeState, StatusThresholds};
use tinykube_core::protocol::{
    Heartbeat, NodeView, NodesReport, RegisterResponse, StreamAck, REJECT_EMPTY_NAME, WELCOME,
};

use super::registry::NodeRegistry;

/// Control-plane side of the liveness protocol.
///
/// Turns registrations and heartbeats into registry mutations. Transport
/// agnostic: the gateway feeds it decoded messages.
#[derive(Clone)]
pub struct LivenessService {
    registry: Arc<NodeRegistry>,
    clock: Arc<dyn Clock>,
    thresholds: StatusThresholds,
}

impl LivenessService {
    /// Create a service over `registry` using the system clock.
    pub fn new(registry: Arc<NodeRegistry>, thresholds: StatusThresholds) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock), thresholds)
    }

    /// Create a service with an explicit clock.
    pub fn with_clock(
        registry: Arc<NodeRegistry>,
        clock: Arc<dyn Clock>,
        thresholds: StatusThresholds,
    ) -> Self {
        Self {
            registry,
            clock,
            thresholds,
        }
    }

    /// Get the registry.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Get the clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Admit a node. `peer` is the origin address captured by the transport.
    pub fn register(&self, name: &str, peer: &str) -> RegisterResponse {
        if name.is_empty() {
            tracing::warn!(%peer, "Registration rejected: empty node name");
            return RegisterResponse::rejected(REJECT_EMPTY_NAME);
        }

        if self.registry.exists(name) {
            tracing::info!(node = %name, %peer, "Node already registered, updating");
        }

        self.registry.upsert(NodeState::ready(name, peer, self.clock.now_ms()));

        tracing::info!(
            node = %name,
            %peer,
            total = self.registry.size(),
            "Node registered"
        );

        RegisterResponse::accepted(WELCOME)
    }

    /// Apply one heartbeat. Returns false when the sender is not registered.
    ///
    /// The client timestamp is only logged; liveness uses the local clock.
    pub fn heartbeat(&self, heartbeat: &Heartbeat) -> bool {
        if !self.registry.exists(&heartbeat.node_name) {
            tracing::warn!(
                node = %heartbeat.node_name,
                "Received heartbeat from unregistered node"
            );
            return false;
        }

        self.registry.touch(&heartbeat.node_name, self.clock.now_ms());
        tracing::debug!(
            node = %heartbeat.node_name,
            client_time_ms = heartbeat.now_unix_ms,
            "Heartbeat"
        );
        true
    }

    /// Consume a heartbeat stream until the sender closes it.
    ///
    /// A closed stream says nothing about the node's health; that is left to
    /// the sweep.
    pub async fn stream_heartbeats<S>(&self, peer: &str, heartbeats: S) -> StreamAck
    where
        S: Stream<Item = Heartbeat>,
    {
        tracing::info!(%peer, "Heartbeat stream opened");

        let mut heartbeats = std::pin::pin!(heartbeats);
        let mut ack = StreamAck::default();
        while let Some(heartbeat) = heartbeats.next().await {
            ack.received += 1;
            if self.heartbeat(&heartbeat) {
                ack.accepted += 1;
            }
        }

        tracing::info!(
            %peer,
            received = ack.received,
            accepted = ack.accepted,
            "Heartbeat stream ended"
        );
        ack
    }

    /// Point-in-time report of every node, sorted by name.
    pub fn report(&self) -> NodesReport {
        let now = self.clock.now_ms();
        let mut states = self.registry.snapshot();
        states.sort_by(|a, b| a.name.cmp(&b.name));

        let counts = NodeCounts::from_states(&states);
        let mut effective_counts = NodeCounts::default();
        let nodes = states
            .into_iter()
            .map(|state| {
                let effective_status = state.effective_status(now, &self.thresholds);
                effective_counts.record(effective_status);
                NodeView {
                    silent_ms: state.silent_for(now),
                    effective_status,
                    state,
                }
            })
            .collect();

        NodesReport {
            nodes,
            counts,
            effective_counts,
            taken_at_ms: now,
        }
    }
}
