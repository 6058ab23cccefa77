//! Selection tracking across content mutations.
//!
//! The live range is owned by the [`Document`] and kept valid by its
//! primitives. The tracker holds the last range captured while the surface had
//! focus, so toolbar commands issued after a blur still act on what the user
//! selected.

use std::cmp::Ordering;

use crate::dom::Document;
use crate::dom::NodeId;

/// Which side of a boundary a linear offset prefers when two nodes meet.
///
/// `Before` sticks to the end of the earlier text, `After` to the start of the
/// later one.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Before,
    After,
}

/// A position in the tree: char offset inside a text node, child index otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Ordered pair of boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl SelectionRange {
    /// Build a range from boundaries already in document order.
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Build a range from an anchor and head in either order.
    pub fn ordered(doc: &Document, anchor: Boundary, head: Boundary) -> Self {
        match doc.compare_boundaries(anchor, head) {
            Ordering::Greater => Self::new(head, anchor),
            _ => Self::new(anchor, head),
        }
    }

    pub fn caret(at: Boundary) -> Self {
        Self::new(at, at)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Both boundaries attached to the document and within node bounds.
    pub fn is_valid(&self, doc: &Document) -> bool {
        doc.is_valid_boundary(self.start) && doc.is_valid_boundary(self.end)
    }

    /// Linear `(start, end)` char offsets.
    pub fn char_range(&self, doc: &Document) -> (usize, usize) {
        (doc.char_offset(self.start), doc.char_offset(self.end))
    }
}

/// Outcome of restoring a saved selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The saved range was still valid and is live again.
    Restored,
    /// No usable saved range; the caret went to the end of the content.
    PlacedAtEnd,
}

/// Remembers the last in-root selection across focus changes.
#[derive(Clone, Debug, Default)]
pub struct SelectionTracker {
    saved: Option<SelectionRange>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the document's live selection if the surface is focused and the
    /// range lies inside the root. Otherwise keeps the previous saved range.
    pub fn capture(&mut self, doc: &Document, focused: bool) -> Option<SelectionRange> {
        if !focused {
            return None;
        }
        let range = doc.selection().filter(|r| r.is_valid(doc))?;
        tracing::trace!(
            target: "folio::selection",
            start = doc.char_offset(range.start),
            end = doc.char_offset(range.end),
            "captured selection"
        );
        self.saved = Some(range);
        Some(range)
    }

    pub fn saved(&self) -> Option<SelectionRange> {
        self.saved
    }

    pub fn clear(&mut self) {
        self.saved = None;
    }

    /// Make `range` live. Returns false if it no longer fits the document.
    pub fn restore(&self, range: &SelectionRange, doc: &mut Document) -> bool {
        if !range.is_valid(doc) {
            return false;
        }
        doc.set_selection(Some(*range));
        doc.selection().is_some()
    }

    /// Restore the saved range, falling back to a caret at the end.
    pub fn restore_or_end(&mut self, doc: &mut Document) -> RestoreOutcome {
        if let Some(range) = self.saved {
            if self.restore(&range, doc) {
                return RestoreOutcome::Restored;
            }
            tracing::debug!(target: "folio::selection", "saved selection is stale, placing caret at end");
        }
        place_caret_at_end(doc);
        self.saved = doc.selection();
        RestoreOutcome::PlacedAtEnd
    }
}

/// Select the whole root and collapse to its end.
pub fn place_caret_at_end(doc: &mut Document) {
    let end = doc.end_boundary();
    doc.set_selection(Some(SelectionRange::caret(end)));
}

pub fn select_all(doc: &mut Document) {
    let root = doc.root();
    let end = doc.end_boundary();
    doc.set_selection(Some(SelectionRange::new(Boundary::new(root, 0), end)));
}

/// Select a linear char range. Out-of-range offsets clamp to the content end.
pub fn select_chars(doc: &mut Document, start: usize, end: usize) {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let range = if start == end {
        SelectionRange::caret(doc.boundary_at(start, Affinity::Before))
    } else {
        SelectionRange::new(
            doc.boundary_at(start, Affinity::After),
            doc.boundary_at(end, Affinity::Before),
        )
    };
    doc.set_selection(Some(range));
}
