//! Retained finding window
//!
//! The trailing set of processed findings the threat scorer and
//! correlation engine read. Entries age out lazily: eviction happens at
//! sweep time, not on a timer.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;
use vigil_common::finding::Finding;

#[derive(Default)]
pub struct FindingWindow {
    entries: RwLock<Vec<Finding>>,
}

impl FindingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, finding: Finding) {
        self.entries.write().push(finding);
    }

    /// Copy of the current window contents.
    pub fn snapshot(&self) -> Vec<Finding> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop entries older than the cutoff. Returns how many were evicted.
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|f| f.timestamp >= cutoff);
        before - entries.len()
    }

    /// Record a correlation back-reference on both windowed findings.
    pub fn link(&self, a: Uuid, b: Uuid) {
        let mut entries = self.entries.write();
        for finding in entries.iter_mut() {
            let other = if finding.id == a {
                b
            } else if finding.id == b {
                a
            } else {
                continue;
            };
            if !finding.related_findings.contains(&other) {
                finding.related_findings.push(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::finding::RawFinding;

    fn finding(title: &str) -> Finding {
        Finding::from_raw(RawFinding::new("Reddit", title, ""))
    }

    #[test]
    fn test_prune_drops_stale_entries() {
        let window = FindingWindow::new();
        let mut old = finding("old");
        old.timestamp = Utc::now() - chrono::Duration::hours(30);
        window.push(old);
        window.push(finding("fresh"));

        let evicted = window.prune_older_than(Utc::now() - chrono::Duration::hours(24));
        assert_eq!(evicted, 1);
        assert_eq!(window.len(), 1);
        assert_eq!(window.snapshot()[0].title, "fresh");
    }

    #[test]
    fn test_link_is_symmetric_and_dedups() {
        let window = FindingWindow::new();
        let a = finding("a");
        let b = finding("b");
        let (id_a, id_b) = (a.id, b.id);
        window.push(a);
        window.push(b);

        window.link(id_a, id_b);
        window.link(id_a, id_b);

        let snapshot = window.snapshot();
        assert_eq!(snapshot[0].related_findings, vec![id_b]);
        assert_eq!(snapshot[1].related_findings, vec![id_a]);
    }
}
