use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::node::NodeStatus;

/// Default silence after which a node is reported `NOT_READY`.
pub const DEFAULT_NOT_READY_TIMEOUT_MS: i64 = 10_000;

/// Default silence after which a node is reported `SUSPECT`.
pub const DEFAULT_SUSPECT_TIMEOUT_MS: i64 = 30_000;

/// The two silence thresholds used to reclassify nodes.
///
/// `not_ready_ms < suspect_ms` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusThresholds {
    /// Silence, in milliseconds, after which a node is `NOT_READY`.
    pub not_ready_ms: i64,
    /// Silence, in milliseconds, after which a node is `SUSPECT`.
    pub suspect_ms: i64,
}

impl StatusThresholds {
    /// Create thresholds from millisecond values.
    pub fn new(not_ready_ms: i64, suspect_ms: i64) -> Self {
        Self {
            not_ready_ms,
            suspect_ms,
        }
    }

    /// Create thresholds from durations.
    pub fn from_durations(not_ready: Duration, suspect: Duration) -> Self {
        Self::new(millis_i64(not_ready), millis_i64(suspect))
    }

    /// Whether a sweep can ever assign `SUSPECT` with these values.
    ///
    /// The not-ready check runs first, so `SUSPECT` is only reachable when
    /// `suspect_ms < not_ready_ms`.
    pub fn suspect_reachable(&self) -> bool {
        self.suspect_ms < self.not_ready_ms
    }
}

fn millis_i64(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self::new(DEFAULT_NOT_READY_TIMEOUT_MS, DEFAULT_SUSPECT_TIMEOUT_MS)
    }
}

/// Recompute a node's status from how long it has been silent.
///
/// The not-ready check takes precedence when both thresholds are exceeded.
/// Below both thresholds the current status is kept: classification only
/// ever demotes.
pub fn classify(current: NodeStatus, elapsed_ms: i64, thresholds: &StatusThresholds) -> NodeStatus {
    if elapsed_ms > thresholds.not_ready_ms {
        NodeStatus::NotReady
    } else if elapsed_ms > thresholds.suspect_ms {
        NodeStatus::Suspect
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspect_unreachable_with_equal_thresholds() {
        let thresholds = StatusThresholds::new(20_000, 20_000);
        assert!(!thresholds.suspect_reachable());
        for elapsed in [19_999, 20_000, 20_001, 60_000] {
            assert_ne!(
                classify(NodeStatus::Ready, elapsed, &thresholds),
                NodeStatus::Suspect
            );
        }
        assert!(StatusThresholds::new(20_000, 19_999).suspect_reachable());
    }

    #[test]
    fn test_from_durations_clamps_huge_values() {
        let thresholds = StatusThresholds::from_durations(Duration::MAX, Duration::from_secs(30));
        assert_eq!(thresholds.not_ready_ms, i64::MAX);
        assert_eq!(thresholds.suspect_ms, 30_000);
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = StatusThresholds::default();
        assert_eq!(thresholds.not_ready_ms, 10_000);
        assert_eq!(thresholds.suspect_ms, 30_000);
        assert!(!thresholds.suspect_reachable());
    }

    #[test]
    fn test_fresh_node_keeps_status() {
        let thresholds = StatusThresholds::default();
        assert_eq!(
            classify(NodeStatus::Ready, 0, &thresholds),
            NodeStatus::Ready
        );
        assert_eq!(
            classify(NodeStatus::Ready, 9_999, &thresholds),
            NodeStatus::Ready
        );
        assert_eq!(
            classify(NodeStatus::Ready, 10_000, &thresholds),
            NodeStatus::Ready
        );
    }

    #[test]
    fn test_not_ready_boundary() {
        let thresholds = StatusThresholds::default();
        assert_eq!(
            classify(NodeStatus::Ready, 10_001, &thresholds),
            NodeStatus::NotReady
        );
    }

    #[test]
    fn test_suspect_unreachable_with_default_ordering() {
        let thresholds = StatusThresholds::default();
        for elapsed in [0, 10_001, 29_999, 30_000, 30_001, 60_000, 3_600_000] {
            assert_ne!(
                classify(NodeStatus::Ready, elapsed, &thresholds),
                NodeStatus::Suspect,
                "elapsed {} produced SUSPECT",
                elapsed
            );
        }
    }

    #[test]
    fn test_suspect_reachable_with_inverted_ordering() {
        let thresholds = StatusThresholds::new(30_000, 10_000);
        assert!(thresholds.suspect_reachable());
        assert_eq!(
            classify(NodeStatus::Ready, 20_000, &thresholds),
            NodeStatus::Suspect
        );
        assert_eq!(
            classify(NodeStatus::Ready, 30_001, &thresholds),
            NodeStatus::NotReady
        );
    }

    #[test]
    fn test_classify_never_promotes() {
        let thresholds = StatusThresholds::default();
        for status in NodeStatus::ALL {
            let result = classify(status, 500, &thresholds);
            assert_eq!(result, status);
        }
        assert_eq!(
            classify(NodeStatus::Reserved, 10_001, &thresholds),
            NodeStatus::NotReady
        );
    }

    #[test]
    fn test_from_durations() {
        let thresholds =
            StatusThresholds::from_durations(Duration::from_secs(3), Duration::from_secs(9));
        assert_eq!(thresholds, StatusThresholds::new(3_000, 9_000));
    }
}
