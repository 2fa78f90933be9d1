// File: vxs-navigation/src/history.rs
// Purpose: Browser history contract and an in-memory implementation

use parking_lot::Mutex;
use serde::Serialize;
use vxs_router::linking::MaskState;

/// One history entry: the displayed href plus the state stored with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub href: String,
    /// Set when the displayed href is a route mask
    pub mask: Option<MaskState>,
}

impl HistoryEntry {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            mask: None,
        }
    }
}

/// The address bar as seen by the router store
pub trait BrowserHistory: Send + Sync {
    fn push(&self, entry: HistoryEntry);

    fn replace(&self, entry: HistoryEntry);

    /// Moves back one entry. Returns `false` at the first entry.
    fn back(&self) -> bool;

    fn current(&self) -> Option<HistoryEntry>;
}

/// History kept in memory, for tests and non-browser hosts
#[derive(Debug, Default)]
pub struct MemoryHistory {
    inner: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(entry: HistoryEntry) -> Self {
        let history = Self::new();
        history.push(entry);
        history
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.inner.lock().entries.clone()
    }
}

impl BrowserHistory for MemoryHistory {
    fn push(&self, entry: HistoryEntry) {
        let mut inner = self.inner.lock();
        if !inner.entries.is_empty() {
            let keep = inner.index + 1;
            inner.entries.truncate(keep);
        }
        inner.entries.push(entry);
        inner.index = inner.entries.len() - 1;
    }

    fn replace(&self, entry: HistoryEntry) {
        let mut inner = self.inner.lock();
        let index = inner.index;
        match inner.entries.get_mut(index) {
            Some(current) => *current = entry,
            None => inner.entries.push(entry),
        }
    }

    fn back(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.index == 0 {
            return false;
        }
        inner.index -= 1;
        true
    }

    fn current(&self) -> Option<HistoryEntry> {
        let inner = self.inner.lock();
        inner.entries.get(inner.index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_truncates_forward_entries() {
        let history = MemoryHistory::with_entry(HistoryEntry::new("/"));
        history.push(HistoryEntry::new("/a"));
        history.push(HistoryEntry::new("/b"));
        assert!(history.back());
        history.push(HistoryEntry::new("/c"));

        let hrefs: Vec<String> = history.entries().into_iter().map(|e| e.href).collect();
        assert_eq!(hrefs, vec!["/", "/a", "/c"]);
    }

    #[test]
    fn test_replace_keeps_length() {
        let history = MemoryHistory::with_entry(HistoryEntry::new("/"));
        history.replace(HistoryEntry::new("/x"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().unwrap().href, "/x");
        assert!(!history.back());
    }
}
