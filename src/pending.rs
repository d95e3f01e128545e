use std::collections::HashSet;
use std::time::Instant;

use crate::events::{ChangeKind, FileChange};

/// Accumulates deduplicated `(kind, filename)` pairs between flushes.
///
/// `last_update` is stamped on every record, duplicates included, so a file
/// that keeps changing keeps pushing the flush out. Owned by the watcher
/// thread; the clock is passed in, which keeps the type trivially testable.
#[derive(Debug, Default)]
pub struct PendingOps {
    changes: HashSet<FileChange>,
    last_update: Option<Instant>,
}

impl PendingOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ChangeKind, name: &str, now: Instant) {
        self.changes.insert(FileChange::new(kind, name));
        self.last_update = Some(now);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns and clears the whole pending set iff `threshold` lies strictly
    /// past the last update; otherwise returns empty and changes nothing.
    /// Callers pass `now - quiet_period`, so firing means more than a full
    /// quiet period has elapsed since the last recorded change.
    pub fn take_ready(&mut self, threshold: Instant) -> Vec<FileChange> {
        match self.last_update {
            Some(last) if threshold > last => {
                self.last_update = None;
                self.changes.drain().collect()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_collector_never_flushes() {
        let mut pending = PendingOps::new();
        let now = Instant::now();

        assert!(pending.take_ready(now).is_empty());
        assert!(pending.take_ready(now + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn test_threshold_at_last_update_is_not_ready() {
        let mut pending = PendingOps::new();
        let t0 = Instant::now();

        pending.record(ChangeKind::WriteClose, "a.txt", t0);

        assert!(pending.take_ready(t0).is_empty());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_threshold_past_last_update_drains_everything() {
        let mut pending = PendingOps::new();
        let t0 = Instant::now();

        pending.record(ChangeKind::WriteClose, "a.txt", t0);
        pending.record(ChangeKind::Delete, "b.txt", t0);

        let drained = pending.take_ready(t0 + Duration::from_millis(1));
        assert_eq!(drained.len(), 2);
        assert!(drained.contains(&FileChange::new(ChangeKind::WriteClose, "a.txt")));
        assert!(drained.contains(&FileChange::new(ChangeKind::Delete, "b.txt")));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut pending = PendingOps::new();
        let t0 = Instant::now();

        pending.record(ChangeKind::WriteClose, "a.txt", t0);
        let threshold = t0 + Duration::from_secs(1);

        assert_eq!(pending.take_ready(threshold).len(), 1);
        assert!(pending.take_ready(threshold).is_empty());
        assert!(pending.take_ready(threshold + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_duplicate_record_extends_the_window() {
        let mut pending = PendingOps::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(2);

        pending.record(ChangeKind::WriteClose, "a.txt", t0);
        pending.record(ChangeKind::WriteClose, "a.txt", t1);

        // Past t0 but not past t1: the duplicate still reset the timer.
        assert!(pending.take_ready(t0 + Duration::from_secs(1)).is_empty());

        let drained = pending.take_ready(t1 + Duration::from_millis(1));
        assert_eq!(drained, vec![FileChange::new(ChangeKind::WriteClose, "a.txt")]);
    }

    #[test]
    fn test_distinct_kinds_for_one_file_are_separate_pairs() {
        let mut pending = PendingOps::new();
        let t0 = Instant::now();

        pending.record(ChangeKind::MoveOut, "a.txt", t0);
        pending.record(ChangeKind::Delete, "a.txt", t0);

        let drained = pending.take_ready(t0 + Duration::from_millis(1));
        assert_eq!(drained.len(), 2);
    }
}
