//! Registry counters for monitoring

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registry statistics
#[derive(Debug, Default)]
pub struct UniqueStats {
    /// Values accepted into the registry
    pub inserted: AtomicU64,
    /// Values removed from the registry
    pub removed: AtomicU64,
    /// Candidates rejected (zero, out of mask, or live)
    pub rejected: AtomicU64,
    /// Rejections caused by a live value
    pub collisions: AtomicU64,
    /// Removals of values that were not live
    pub missed_removes: AtomicU64,
    /// Bounded insertions that gave up
    pub exhausted: AtomicU64,
}

/// Point-in-time copy of [`UniqueStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub inserted: u64,
    pub removed: u64,
    pub rejected: u64,
    pub collisions: u64,
    pub missed_removes: u64,
    pub exhausted: u64,
}

impl UniqueStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            inserted: self.inserted.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            missed_removes: self.missed_removes.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.inserted.store(0, Ordering::Relaxed);
        self.removed.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.collisions.store(0, Ordering::Relaxed);
        self.missed_removes.store(0, Ordering::Relaxed);
        self.exhausted.store(0, Ordering::Relaxed);
    }
}

impl StatsSnapshot {
    /// Values inserted and not yet removed, as seen by the counters
    #[must_use]
    pub const fn live(&self) -> u64 {
        self.inserted.saturating_sub(self.removed)
    }

    /// Fraction of candidate tests that were rejected (0.0 to 1.0)
    #[must_use]
    pub fn rejection_ratio(&self) -> f64 {
        let total = self.inserted + self.rejected;
        if total == 0 {
            return 0.0;
        }
        self.rejected as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let stats = UniqueStats::default();
        UniqueStats::bump(&stats.inserted);
        UniqueStats::bump(&stats.inserted);
        UniqueStats::bump(&stats.removed);
        UniqueStats::bump(&stats.rejected);

        let snap = stats.snapshot();
        assert_eq!(snap.inserted, 2);
        assert_eq!(snap.removed, 1);
        assert_eq!(snap.live(), 1);
        assert!((snap.rejection_ratio() - 1.0 / 3.0).abs() < f64::EPSILON);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
        assert_eq!(StatsSnapshot::default().rejection_ratio(), 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snap = StatsSnapshot {
            inserted: 3,
            ..StatsSnapshot::default()
        };
        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json["inserted"], 3);
        assert_eq!(json["missed_removes"], 0);
    }
}
