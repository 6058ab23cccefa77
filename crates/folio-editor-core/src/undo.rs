//! Undo/redo management for editor sessions.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo implementations
//! - `HistoryStack` - bounded stack of full-content snapshots

use std::collections::VecDeque;
use std::fmt;

use smol_str::SmolStr;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Trait for managing undo/redo operations.
///
/// `undo`/`redo` move the history cursor and hand back the entry the caller
/// must make live. Bounds are a silent no-op (`None`), never an error.
pub trait UndoManager {
    type Entry;

    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Step back. Returns the entry now current.
    fn undo(&mut self) -> Option<Self::Entry>;

    /// Step forward. Returns the entry now current.
    fn redo(&mut self) -> Option<Self::Entry>;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// One serialized copy of the document content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HistoryEntry(SmolStr);

impl HistoryEntry {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HistoryEntry {
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for HistoryEntry {
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

/// Bounded snapshot history.
///
/// `index` always points at the entry matching the live content. While
/// `inhibit` is set (during a content swap) pushes are ignored.
#[derive(Clone, Debug)]
pub struct HistoryStack {
    stack: VecDeque<HistoryEntry>,
    index: usize,
    inhibit: bool,
    max_depth: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl HistoryStack {
    /// Create an empty stack. A depth of zero is treated as one.
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: VecDeque::new(),
            index: 0,
            inhibit: false,
            max_depth: max_depth.max(1),
        }
    }

    /// Record a snapshot. Returns true if the stack changed.
    pub fn push(&mut self, snapshot: impl Into<HistoryEntry>) -> bool {
        if self.inhibit {
            tracing::trace!(target: "folio::history", "push ignored while inhibited");
            return false;
        }
        let entry = snapshot.into();
        if self.stack.get(self.index) == Some(&entry) {
            return false;
        }
        if !self.stack.is_empty() {
            self.stack.truncate(self.index + 1);
        }
        self.stack.push_back(entry);
        if self.stack.len() > self.max_depth {
            self.stack.pop_front();
        }
        self.index = self.stack.len() - 1;
        tracing::debug!(
            target: "folio::history",
            index = self.index,
            len = self.stack.len(),
            "snapshot pushed"
        );
        true
    }

    /// Replace the whole history with a single entry.
    pub fn reset(&mut self, snapshot: impl Into<HistoryEntry>) {
        self.stack.clear();
        self.stack.push_back(snapshot.into());
        self.index = 0;
        self.inhibit = false;
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.stack.get(self.index)
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.stack.get(index)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_inhibit(&mut self, inhibit: bool) {
        self.inhibit = inhibit;
    }

    pub fn is_inhibited(&self) -> bool {
        self.inhibit
    }
}

impl UndoManager for HistoryStack {
    type Entry = HistoryEntry;

    fn can_undo(&self) -> bool {
        self.index > 0
    }

    fn can_redo(&self) -> bool {
        !self.stack.is_empty() && self.index + 1 < self.stack.len()
    }

    fn undo(&mut self) -> Option<HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        tracing::debug!(target: "folio::history", index = self.index, "undo");
        self.stack.get(self.index).cloned()
    }

    fn redo(&mut self) -> Option<HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        tracing::debug!(target: "folio::history", index = self.index, "redo");
        self.stack.get(self.index).cloned()
    }

    fn clear_history(&mut self) {
        let current = self.stack.get(self.index).cloned();
        self.stack.clear();
        self.index = 0;
        if let Some(entry) = current {
            self.stack.push_back(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_undo_redo() {
        let mut history = HistoryStack::new(10);
        history.reset("a");
        assert!(!history.can_undo());

        assert!(history.push("b"));
        assert!(history.push("c"));
        assert_eq!(history.len(), 3);

        assert_eq!(history.undo().map(|e| e.to_string()), Some("b".into()));
        assert_eq!(history.undo().map(|e| e.to_string()), Some("a".into()));
        assert_eq!(history.undo(), None);

        assert_eq!(history.redo().map(|e| e.to_string()), Some("b".into()));
        assert!(history.can_redo());
    }

    #[test]
    fn test_duplicate_push_is_idempotent() {
        let mut history = HistoryStack::new(10);
        history.reset("a");
        assert!(history.push("b"));
        assert!(!history.push("b"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_new_push_discards_redo_branch() {
        let mut history = HistoryStack::new(10);
        history.reset("a");
        history.push("b");
        history.push("c");
        history.undo();
        history.undo();
        assert!(history.push("x"));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.current().map(HistoryEntry::as_str), Some("x"));
    }

    #[test]
    fn test_inhibit_blocks_push() {
        let mut history = HistoryStack::new(10);
        history.reset("a");
        history.set_inhibit(true);
        assert!(!history.push("b"));
        history.set_inhibit(false);
        assert!(history.push("b"));
    }

    #[test]
    fn test_depth_cap_evicts_oldest() {
        let mut history = HistoryStack::new(50);
        for i in 1..=51 {
            history.push(format!("s{i}"));
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.index(), 49);
        assert_eq!(history.current().map(HistoryEntry::as_str), Some("s51"));
        let mut oldest = None;
        while let Some(entry) = history.undo() {
            oldest = Some(entry);
        }
        assert_eq!(oldest.map(|e| e.to_string()), Some("s2".into()));
    }

    #[test]
    fn test_zero_depth_clamped() {
        let mut history = HistoryStack::new(0);
        history.push("a");
        history.push("b");
        assert_eq!(history.max_depth(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().map(HistoryEntry::as_str), Some("b"));
    }

    #[test]
    fn test_clear_history_keeps_current() {
        let mut history = HistoryStack::new(10);
        history.reset("a");
        history.push("b");
        history.clear_history();
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert_eq!(history.current().map(HistoryEntry::as_str), Some("b"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u8),
        Undo,
        Redo,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6).prop_map(Op::Push),
            Just(Op::Undo),
            Just(Op::Redo),
        ]
    }

    proptest! {
        #[test]
        fn index_stays_in_bounds(depth in 1usize..8, ops in prop::collection::vec(op(), 0..64)) {
            let mut history = HistoryStack::new(depth);
            history.reset("start");
            for op in ops {
                match op {
                    Op::Push(n) => { history.push(format!("s{n}")); }
                    Op::Undo => { history.undo(); }
                    Op::Redo => { history.redo(); }
                }
                prop_assert!(history.len() <= depth.max(1));
                prop_assert!(history.index() < history.len());
            }
        }

        #[test]
        fn undo_then_redo_restores_current(pushes in prop::collection::vec(0u8..20, 1..30)) {
            let mut history = HistoryStack::new(50);
            history.reset("start");
            for n in pushes {
                history.push(format!("s{n}"));
            }
            let before = history.current().cloned();
            if history.undo().is_some() {
                prop_assert_eq!(history.redo(), before);
            }
        }
    }
}
