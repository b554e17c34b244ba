//! Metrics registry for the parameterization engine
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

/// Operational counters
///
/// # Thread Safety
///
/// All counters use atomic operations with Relaxed ordering. Walks themselves
/// share nothing, so counters carry no ordering obligations.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Walks started
    walks: AtomicU64,
    /// Walks that finished with the parameterized flag still set
    walks_parameterized: AtomicU64,
    /// Walks that tripped the budget
    walks_budget_exhausted: AtomicU64,
    /// New slot ids appended to a slot table
    slots_issued: AtomicU64,
    /// Reusable requests answered by an existing slot
    slots_reused: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished walk
    pub fn record_walk(&self, parameterized: bool, issued: u64, reused: u64) {
        self.walks.fetch_add(1, Ordering::Relaxed);
        if parameterized {
            self.walks_parameterized.fetch_add(1, Ordering::Relaxed);
        } else {
            self.walks_budget_exhausted.fetch_add(1, Ordering::Relaxed);
        }
        self.slots_issued.fetch_add(issued, Ordering::Relaxed);
        self.slots_reused.fetch_add(reused, Ordering::Relaxed);
    }

    pub fn walks(&self) -> u64 {
        self.walks.load(Ordering::Relaxed)
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            walks: self.walks.load(Ordering::Relaxed),
            walks_parameterized: self.walks_parameterized.load(Ordering::Relaxed),
            walks_budget_exhausted: self.walks_budget_exhausted.load(Ordering::Relaxed),
            slots_issued: self.slots_issued.load(Ordering::Relaxed),
            slots_reused: self.slots_reused.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub walks: u64,
    pub walks_parameterized: u64,
    pub walks_budget_exhausted: u64,
    pub slots_issued: u64,
    pub slots_reused: u64,
}

impl MetricsSnapshot {
    /// Counters as log fields, in declaration order
    pub fn log_fields(&self) -> [(&'static str, String); 5] {
        [
            ("walks", self.walks.to_string()),
            ("walks_parameterized", self.walks_parameterized.to_string()),
            ("walks_budget_exhausted", self.walks_budget_exhausted.to_string()),
            ("slots_issued", self.slots_issued.to_string()),
            ("slots_reused", self.slots_reused.to_string()),
        ]
    }
}

/// Process-wide registry used by the parameterization driver
pub fn global() -> &'static MetricsRegistry {
    static GLOBAL: OnceLock<MetricsRegistry> = OnceLock::new();
    GLOBAL.get_or_init(MetricsRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let registry = MetricsRegistry::new();
        let snapshot = registry.snapshot();

        assert_eq!(snapshot.walks, 0);
        assert_eq!(snapshot.walks_parameterized, 0);
        assert_eq!(snapshot.walks_budget_exhausted, 0);
        assert_eq!(snapshot.slots_issued, 0);
        assert_eq!(snapshot.slots_reused, 0);
    }

    #[test]
    fn test_record_walk_splits_outcomes() {
        let registry = MetricsRegistry::new();

        registry.record_walk(true, 3, 1);
        registry.record_walk(false, 2, 0);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.walks, 2);
        assert_eq!(snapshot.walks_parameterized, 1);
        assert_eq!(snapshot.walks_budget_exhausted, 1);
        assert_eq!(snapshot.slots_issued, 5);
        assert_eq!(snapshot.slots_reused, 1);
    }

    #[test]
    fn test_log_fields() {
        let registry = MetricsRegistry::new();
        registry.record_walk(true, 4, 2);

        let fields = registry.snapshot().log_fields();
        assert_eq!(fields[0], ("walks", "1".to_string()));
        assert_eq!(fields[3], ("slots_issued", "4".to_string()));
        assert_eq!(fields[4], ("slots_reused", "2".to_string()));

        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["slots_issued"], 4);
    }

    #[test]
    fn test_global_is_shared() {
        let before = global().walks();
        global().record_walk(true, 0, 0);
        assert!(global().walks() > before);
        assert!(std::ptr::eq(global(), global()));
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.record_walk(true, 1, 0);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.walks, 1000);
        assert_eq!(snapshot.slots_issued, 1000);
    }

    #[test]
    fn test_monotonic_increase() {
        let registry = MetricsRegistry::new();

        let mut prev = registry.snapshot().slots_issued;
        for _ in 0..10 {
            registry.record_walk(true, 2, 0);
            let current = registry.snapshot().slots_issued;
            assert!(current >= prev);
            prev = current;
        }
    }
}
