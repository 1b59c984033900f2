//! Re-scan triggers: child-list mutations inside a scope, and history navigation.
//!
//! Mutations are never diffed. Any relevant batch triggers a full re-scan, which the
//! injector's idempotence keeps correct.

use std::time::Duration;

use crate::domain::dom::{Document, MutationRecord, NodeId};

/// Delay between a history navigation and the re-scan it triggers.
pub const DEFAULT_NAVIGATION_DELAY: Duration = Duration::from_millis(50);

/// A scoped subscription to document mutations plus pending navigation re-scans.
#[derive(Debug, Clone)]
pub struct MutationWatcher {
    scope: NodeId,
    navigation_delay: Duration,
    pending: Vec<Duration>,
}

impl MutationWatcher {
    /// Observe the subtree rooted at `scope`.
    pub fn observe(scope: NodeId, navigation_delay: Duration) -> Self {
        Self {
            scope,
            navigation_delay,
            pending: Vec::new(),
        }
    }

    /// Observe the document body, or the whole document when it has no body.
    pub fn for_document(doc: &Document, navigation_delay: Duration) -> Self {
        Self::observe(doc.body().unwrap_or(doc.root()), navigation_delay)
    }

    pub fn scope(&self) -> NodeId {
        self.scope
    }

    /// Whether a batch of records warrants a re-scan. A batch fires at most once.
    pub fn should_rescan(&self, doc: &Document, records: &[MutationRecord]) -> bool {
        records
            .iter()
            .any(|record| doc.contains(self.scope, record.target))
    }

    /// Schedule a re-scan after a navigation that did not reload the document.
    pub fn navigated(&mut self, now: Duration) {
        self.pending.push(now + self.navigation_delay);
    }

    /// Consume every re-scan due at `now`. Returns whether any was due.
    pub fn take_due(&mut self, now: Duration) -> bool {
        let before = self.pending.len();
        self.pending.retain(|deadline| *deadline > now);
        self.pending.len() != before
    }

    /// Earliest pending re-scan, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().min().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dom::element;

    #[test]
    fn only_mutations_inside_scope_trigger() {
        let mut doc = Document::new();
        let body = doc.body().expect("body");
        let head = doc
            .traverse(doc.root())
            .find(|id| doc.element(*id).is_some_and(|el| el.name() == "head"))
            .expect("head");
        let watcher = MutationWatcher::for_document(&doc, DEFAULT_NAVIGATION_DELAY);
        assert_eq!(watcher.scope(), body);

        let meta = doc.create_element(element("meta"));
        doc.append_child(head, meta);
        let records = doc.take_mutations();
        assert!(!watcher.should_rescan(&doc, &records));

        let div = doc.create_element(element("div"));
        doc.append_child(body, div);
        let records = doc.take_mutations();
        assert!(watcher.should_rescan(&doc, &records));
    }

    #[test]
    fn navigation_rescan_fires_after_delay() {
        let doc = Document::new();
        let mut watcher = MutationWatcher::for_document(&doc, Duration::from_millis(50));
        watcher.navigated(Duration::from_millis(100));
        assert_eq!(watcher.next_deadline(), Some(Duration::from_millis(150)));

        assert!(!watcher.take_due(Duration::from_millis(149)));
        assert!(watcher.take_due(Duration::from_millis(150)));
        assert!(!watcher.take_due(Duration::from_millis(500)));
        assert_eq!(watcher.next_deadline(), None);
    }
}
