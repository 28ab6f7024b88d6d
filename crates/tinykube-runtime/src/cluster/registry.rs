use std::collections::HashMap;

use parking_lot::Mutex;

use tinykube_core::cluster::{classify, NodeCounts, NodeState, NodeStatus, StatusThresholds};

/// Node registry for cluster membership.
///
/// Every operation takes the same lock for a short, I/O-free critical
/// section. Nothing here fails: absence is reported as a no-op or `false`.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Mutex<HashMap<String, NodeState>>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the entry keyed by `state.name`.
    pub fn upsert(&self, state: NodeState) {
        self.nodes.lock().insert(state.name.clone(), state);
    }

    /// Record contact from `name` at `now_ms`. Unknown names are ignored.
    ///
    /// `last_seen_ms` never moves backwards, so racing touches settle on the
    /// latest timestamp regardless of the order they take the lock.
    pub fn touch(&self, name: &str, now_ms: i64) {
        if let Some(state) = self.nodes.lock().get_mut(name) {
            state.last_seen_ms = state.last_seen_ms.max(now_ms);
            state.status = NodeStatus::Ready;
        }
    }

    /// Reclassify every entry from its silence at `now_ms`.
    ///
    /// Returns how many entries changed status. Entries are never removed.
    pub fn sweep(&self, now_ms: i64, suspect_timeout_ms: i64, not_ready_timeout_ms: i64) -> usize {
        let thresholds = StatusThresholds::new(not_ready_timeout_ms, suspect_timeout_ms);
        let mut changes = Vec::new();

        {
            let mut nodes = self.nodes.lock();
            for state in nodes.values_mut() {
                let next = classify(state.status, state.silent_for(now_ms), &thresholds);
                if next != state.status {
                    changes.push((state.name.clone(), state.status, next));
                    state.status = next;
                }
            }
        }

        for (name, from, to) in &changes {
            tracing::debug!(node = %name, %from, %to, "Node status changed");
        }

        changes.len()
    }

    /// Sweep using a threshold pair.
    pub fn sweep_with(&self, now_ms: i64, thresholds: &StatusThresholds) -> usize {
        self.sweep(now_ms, thresholds.suspect_ms, thresholds.not_ready_ms)
    }

    /// Delete the entry for `name`. Returns whether anything was removed.
    pub fn remove(&self, name: &str) -> bool {
        self.nodes.lock().remove(name).is_some()
    }

    /// Check whether `name` is registered.
    pub fn exists(&self, name: &str) -> bool {
        self.nodes.lock().contains_key(name)
    }

    /// Number of registered nodes.
    pub fn size(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Copy of a single entry.
    pub fn get(&self, name: &str) -> Option<NodeState> {
        self.nodes.lock().get(name).cloned()
    }

    /// Independent copy of every entry.
    pub fn snapshot(&self) -> Vec<NodeState> {
        self.nodes.lock().values().cloned().collect()
    }

    /// Count nodes by status.
    pub fn count_by_status(&self) -> NodeCounts {
        NodeCounts::from_states(self.nodes.lock().values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const NOT_READY: i64 = 10_000;
    const SUSPECT: i64 = 30_000;

    fn ready(name: &str, now_ms: i64) -> NodeState {
        NodeState::ready(name, "127.0.0.1:40000", now_ms)
    }

    #[test]
    fn test_upsert_exists_size() {
        let registry = NodeRegistry::new();
        assert_eq!(registry.size(), 0);
        assert!(!registry.exists("node-a"));

        registry.upsert(ready("node-a", 0));
        assert!(registry.exists("node-a"));
        assert_eq!(registry.size(), 1);

        // Re-upsert overwrites in place
        registry.upsert(ready("node-a", 50));
        assert_eq!(registry.size(), 1);
        assert_eq!(registry.get("node-a").unwrap().last_seen_ms, 50);

        registry.upsert(ready("node-b", 0));
        assert_eq!(registry.size(), 2);
    }

    #[test]
    fn test_remove_reports_deletion() {
        let registry = NodeRegistry::new();
        registry.upsert(ready("node-a", 0));

        assert!(registry.remove("node-a"));
        assert!(!registry.exists("node-a"));
        assert!(!registry.remove("node-a"));
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_size_tracks_distinct_names() {
        let registry = NodeRegistry::new();
        let ops: &[(&str, bool)] = &[
            ("a", true),
            ("b", true),
            ("a", true),
            ("a", false),
            ("c", true),
            ("b", false),
            ("a", true),
        ];

        let mut expected = std::collections::HashSet::new();
        for (name, insert) in ops {
            if *insert {
                registry.upsert(ready(name, 0));
                expected.insert(*name);
            } else {
                registry.remove(name);
                expected.remove(name);
            }
            assert_eq!(registry.exists(name), *insert);
            assert_eq!(registry.size(), expected.len());
        }
    }

    #[test]
    fn test_touch_unknown_is_noop() {
        let registry = NodeRegistry::new();
        registry.upsert(ready("node-a", 100));
        let before = registry.snapshot();

        registry.touch("ghost", 5_000);

        assert_eq!(registry.size(), 1);
        assert!(!registry.exists("ghost"));
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn test_touch_resets_status_and_time() {
        let registry = NodeRegistry::new();
        let mut state = ready("node-a", 0);
        state.status = NodeStatus::NotReady;
        registry.upsert(state);

        registry.touch("node-a", 700);

        let state = registry.get("node-a").unwrap();
        assert_eq!(state.last_seen_ms, 700);
        assert_eq!(state.status, NodeStatus::Ready);

        // An out-of-order touch still marks ready but keeps the later time
        registry.touch("node-a", 300);
        assert_eq!(registry.get("node-a").unwrap().last_seen_ms, 700);
    }

    #[test]
    fn test_sweep_not_ready_boundary() {
        let t0 = 1_000_000;
        let registry = NodeRegistry::new();
        registry.upsert(ready("node-a", t0));

        assert_eq!(registry.sweep(t0 + 9_999, SUSPECT, NOT_READY), 0);
        assert_eq!(registry.get("node-a").unwrap().status, NodeStatus::Ready);

        assert_eq!(registry.sweep(t0 + 10_001, SUSPECT, NOT_READY), 1);
        assert_eq!(registry.get("node-a").unwrap().status, NodeStatus::NotReady);

        // Already demoted: nothing changes on a later pass
        assert_eq!(registry.sweep(t0 + 10_500, SUSPECT, NOT_READY), 0);
    }

    #[test]
    fn test_sweep_never_reports_suspect_with_default_ordering() {
        let registry = NodeRegistry::new();
        registry.upsert(ready("node-a", 0));

        for now in [5_000, 10_001, 30_001, 120_000, 86_400_000] {
            registry.sweep(now, SUSPECT, NOT_READY);
            let status = registry.get("node-a").unwrap().status;
            assert_ne!(status, NodeStatus::Suspect);
        }
        assert_eq!(registry.get("node-a").unwrap().status, NodeStatus::NotReady);
    }

    #[test]
    fn test_sweep_does_not_remove_or_promote() {
        let registry = NodeRegistry::new();
        registry.upsert(ready("stale", 0));
        registry.upsert(ready("fresh", 50_000));

        registry.sweep(55_000, NOT_READY / 2, NOT_READY);

        assert_eq!(registry.size(), 2);
        assert_eq!(registry.get("stale").unwrap().status, NodeStatus::NotReady);
        assert_eq!(registry.get("fresh").unwrap().status, NodeStatus::Ready);
    }

    #[test]
    fn test_sweep_survives_extreme_timestamps() {
        let registry = NodeRegistry::new();
        registry.upsert(NodeState {
            name: "provisioned".to_string(),
            peer: String::new(),
            last_seen_ms: i64::MIN,
            status: NodeStatus::Reserved,
        });
        registry.upsert(NodeState {
            name: "future".to_string(),
            peer: String::new(),
            last_seen_ms: i64::MAX,
            status: NodeStatus::Ready,
        });

        assert_eq!(registry.sweep(1_700_000_000_000, SUSPECT, NOT_READY), 1);
        assert_eq!(
            registry.get("provisioned").unwrap().status,
            NodeStatus::NotReady
        );
        assert_eq!(registry.get("future").unwrap().status, NodeStatus::Ready);
    }

    /// Writer that records whether the registry lock was held during a write.
    struct LockCheckWriter {
        registry: Arc<NodeRegistry>,
        writes: Arc<AtomicUsize>,
        writes_under_lock: Arc<AtomicUsize>,
    }

    impl io::Write for LockCheckWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.registry.nodes.is_locked() {
                self.writes_under_lock.fetch_add(1, Ordering::SeqCst);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sweep_logs_after_releasing_lock() {
        let registry = Arc::new(NodeRegistry::new());
        registry.upsert(ready("node-a", 0));

        let writes = Arc::new(AtomicUsize::new(0));
        let writes_under_lock = Arc::new(AtomicUsize::new(0));
        let make_writer = {
            let registry = registry.clone();
            let writes = writes.clone();
            let writes_under_lock = writes_under_lock.clone();
            move || LockCheckWriter {
                registry: registry.clone(),
                writes: writes.clone(),
                writes_under_lock: writes_under_lock.clone(),
            }
        };
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(make_writer)
            .finish();

        let changed = tracing::subscriber::with_default(subscriber, || {
            registry.sweep(10_001, SUSPECT, NOT_READY)
        });

        assert_eq!(changed, 1);
        assert!(writes.load(Ordering::SeqCst) > 0);
        assert_eq!(writes_under_lock.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_suspect_retained_with_inverted_thresholds() {
        let registry = NodeRegistry::new();
        registry.upsert(ready("node-a", 0));

        registry.sweep_with(20_000, &StatusThresholds::new(30_000, 10_000));

        let state = registry.get("node-a").unwrap();
        assert_eq!(state.status, NodeStatus::Suspect);
        assert!(registry.exists("node-a"));
    }

    #[test]
    fn test_snapshot_round_trip_and_independence() {
        let registry = NodeRegistry::new();
        let state = NodeState {
            name: "node-a".to_string(),
            peer: "ipv6:[::1]:5000".to_string(),
            last_seen_ms: 42,
            status: NodeStatus::Reserved,
        };
        registry.upsert(state.clone());

        let snapshot = registry.snapshot();
        assert_eq!(snapshot, vec![state.clone()]);

        registry.touch("node-a", 99);
        registry.upsert(ready("node-b", 0));
        assert_eq!(snapshot, vec![state]);
    }

    #[test]
    fn test_count_by_status() {
        let registry = NodeRegistry::new();
        registry.upsert(ready("a", 0));
        registry.upsert(ready("b", 20_000));
        registry.upsert(NodeState::new("c", "", 0));

        registry.sweep(20_500, SUSPECT, NOT_READY);

        let counts = registry.count_by_status();
        assert_eq!(counts.ready, 1);
        assert_eq!(counts.not_ready, 2);
        assert_eq!(counts.total, 3);
    }

    #[test]
    fn test_concurrent_touch_converges_to_max() {
        let registry = Arc::new(NodeRegistry::new());
        registry.upsert(ready("node-a", 0));

        let threads = 8;
        let per_thread = 500;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        let now = (i * threads + t + 1) as i64;
                        registry.touch("node-a", now);
                        let state = registry.get("node-a").unwrap();
                        assert_eq!(state.status, NodeStatus::Ready);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let max = (threads * per_thread) as i64;
        let state = registry.get("node-a").unwrap();
        assert_eq!(state.last_seen_ms, max);
        assert_eq!(state.status, NodeStatus::Ready);
    }

    #[test]
    fn test_concurrent_mixed_operations() {
        let registry = Arc::new(NodeRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..200i64 {
                        let name = format!("node-{}-{}", t, i % 10);
                        registry.upsert(ready(&name, i));
                        registry.touch(&name, i + 1);
                        registry.sweep(i + 20_000, SUSPECT, NOT_READY);
                        let _ = registry.snapshot();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.size(), 40);
        for state in registry.snapshot() {
            assert!(matches!(state.status, NodeStatus::Ready | NodeStatus::NotReady));
        }
    }
}
