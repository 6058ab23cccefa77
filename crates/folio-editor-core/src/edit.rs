//! Typing, deletion and fragment insertion at the live selection.
//!
//! These are the edits a browser performs for raw input events. Each one
//! leaves the selection collapsed where the next keystroke should land and
//! the tree normalized, with empty text blocks holding a `<br>` so they
//! keep their line.

use crate::dom::{Document, Element, Leaf, NodeId, is_heading, is_list, is_text_block};
use crate::format::{caret_block, lift_list_item, touched_blocks};
use crate::selection::{Boundary, SelectionRange};

/// Containers removed once a merge leaves them without content.
const PRUNABLE_TAGS: &[&str] = &["ul", "ol", "li", "blockquote", "div"];

fn set_caret(doc: &mut Document, at: Boundary) {
    doc.set_selection(Some(SelectionRange::caret(at)));
}

fn fill_empty(doc: &mut Document) {
    let root = doc.root();
    for node in doc.descendants(root) {
        if doc.tag(node).is_some_and(is_text_block) && doc.children(node).is_empty() {
            let br = doc.create_element("br");
            doc.append_child(node, br);
        }
    }
}

/// An empty document still has one line to type into.
fn ensure_root_block(doc: &mut Document) {
    let root = doc.root();
    if !doc.children(root).is_empty() {
        return;
    }
    let p = doc.create_element("p");
    let br = doc.create_element("br");
    doc.append_child(p, br);
    doc.append_child(root, p);
    set_caret(doc, Boundary::new(p, 0));
}

fn tidy(doc: &mut Document) {
    let root = doc.root();
    doc.normalize(root);
    fill_empty(doc);
    ensure_root_block(doc);
}

fn first_position(doc: &Document, block: NodeId) -> Boundary {
    let mut node = block;
    loop {
        match doc.children(node).first().copied() {
            Some(child) if doc.is_text(child) => return Boundary::new(child, 0),
            Some(child) if doc.element(child).is_some_and(|el| el.is_inline() && !el.is_void()) => {
                node = child;
            }
            _ => return Boundary::new(node, 0),
        }
    }
}

fn last_position(doc: &Document, block: NodeId) -> Boundary {
    let mut node = block;
    loop {
        match doc.children(node).last().copied() {
            Some(child) if doc.is_text(child) => {
                return Boundary::new(child, doc.text_len(child).unwrap_or(0));
            }
            Some(child) if doc.element(child).is_some_and(|el| !el.is_void()) => node = child,
            _ => return Boundary::new(node, doc.children(node).len()),
        }
    }
}

fn prune_empty_ancestors(doc: &mut Document, mut node: NodeId) {
    let root = doc.root();
    while node != root {
        let empty = doc.tag(node).is_some_and(|t| PRUNABLE_TAGS.contains(&t))
            && doc
                .children(node)
                .iter()
                .all(|c| doc.text(*c).is_some_and(|t| t.trim().is_empty()));
        if !empty {
            return;
        }
        let Some(parent) = doc.parent(node) else {
            return;
        };
        doc.remove(node);
        node = parent;
    }
}

/// Move the content of `second` to the end of `first` and drop `second`.
/// Returns the junction between the two contents.
pub(crate) fn merge_blocks(doc: &mut Document, first: NodeId, second: NodeId) -> Option<Boundary> {
    if first == second || doc.is_inclusive_ancestor(second, first) {
        return None;
    }
    if doc.is_inclusive_ancestor(first, second) {
        let (parent, index) = doc.unwrap(second)?;
        return Some(Boundary::new(parent, index));
    }
    if doc.is_placeholder(first) {
        let br = doc.children(first)[0];
        doc.remove(br);
    }
    let junction = Boundary::new(first, doc.children(first).len());
    if !doc.is_placeholder(second) {
        doc.append_children_from(second, first);
    }
    let parent = doc.parent(second);
    doc.remove(second);
    if let Some(parent) = parent {
        prune_empty_ancestors(doc, parent);
    }
    Some(junction)
}

/// Remove the top-most nodes lying wholly inside the selection.
fn remove_contained(doc: &mut Document) {
    let Some(range) = doc.selection() else {
        return;
    };
    let root = doc.root();
    let mut doomed: Vec<NodeId> = Vec::new();
    for node in doc.descendants(root) {
        // preorder: a doomed node's descendants directly follow it
        if doomed.last().is_some_and(|d| doc.is_inclusive_ancestor(*d, node)) {
            continue;
        }
        if doc.node_within(node, range.start, range.end) {
            doomed.push(node);
        }
    }
    for node in doomed {
        doc.remove(node);
    }
}

/// Delete the selected content and collapse the selection to its start.
/// Blocks cut in two by the selection are joined. Returns false for a
/// collapsed (or missing) selection.
pub fn delete_selection(doc: &mut Document) -> bool {
    let Some(range) = doc.selection().filter(|r| !r.is_collapsed()) else {
        return false;
    };
    let (start, end) = (range.start, range.end);
    let start_block = caret_block(doc, start);
    let end_block = caret_block(doc, end);
    if start.node == end.node && doc.is_text(start.node) {
        doc.delete_text(start.node, start.offset..end.offset);
    } else {
        if doc.is_text(end.node) && end.offset > 0 {
            doc.delete_text(end.node, 0..end.offset);
        }
        if let Some(len) = doc.text_len(start.node) {
            if start.offset < len {
                doc.delete_text(start.node, start.offset..len);
            }
        }
        remove_contained(doc);
    }
    if let Some(range) = doc.selection() {
        set_caret(doc, range.start);
    }
    if let (Some(first), Some(second)) = (start_block, end_block) {
        if doc.contains(first) && doc.contains(second) {
            merge_blocks(doc, first, second);
        }
    }
    tidy(doc);
    tracing::trace!(target: "folio::edit", "deleted selection");
    true
}

/// Where typed text goes for a caret: an existing text node when one touches
/// the caret, otherwise a new one created in the right container.
fn text_insertion_point(doc: &mut Document, at: Boundary) -> Option<Boundary> {
    if doc.is_text(at.node) {
        return Some(at);
    }
    let root = doc.root();
    if doc.is_placeholder(at.node) {
        let br = doc.children(at.node)[0];
        let text = doc.create_text("");
        doc.insert_before(br, text);
        doc.remove(br);
        return Some(Boundary::new(text, 0));
    }
    let children = doc.children(at.node);
    let prev = at.offset.checked_sub(1).and_then(|i| children.get(i)).copied();
    let next = children.get(at.offset).copied();
    if let Some(prev) = prev.filter(|p| doc.is_text(*p)) {
        return Some(Boundary::new(prev, doc.text_len(prev)?));
    }
    if let Some(next) = next.filter(|n| doc.is_text(*n)) {
        return Some(Boundary::new(next, 0));
    }
    let container = if at.node == root {
        if let Some(prev) = prev.filter(|p| doc.tag(*p).is_some_and(is_text_block)) {
            let end = Boundary::new(prev, doc.children(prev).len());
            return text_insertion_point(doc, end);
        }
        Some("p")
    } else if doc.tag(at.node).is_some_and(is_list) {
        Some("li")
    } else {
        None
    };
    let text = doc.create_text("");
    match container {
        Some(tag) => {
            let block = doc.create_element(tag);
            doc.insert_child(at.node, at.offset, block);
            doc.append_child(block, text);
        }
        None => doc.insert_child(at.node, at.offset, text),
    }
    Some(Boundary::new(text, 0))
}

/// Type `text` at the selection, replacing any selected content.
pub fn insert_text(doc: &mut Document, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    delete_selection(doc);
    let Some(range) = doc.selection() else {
        return false;
    };
    let Some(at) = text_insertion_point(doc, range.start) else {
        return false;
    };
    if !doc.insert_text(at.node, at.offset, text) {
        return false;
    }
    set_caret(doc, Boundary::new(at.node, at.offset + text.chars().count()));
    true
}

/// Resolve a boundary to a child position, splitting a text node if the
/// boundary falls inside one.
fn split_point(doc: &mut Document, at: Boundary) -> Option<(NodeId, usize)> {
    let Some(len) = doc.text_len(at.node) else {
        return Some((at.node, at.offset));
    };
    let parent = doc.parent(at.node)?;
    let index = doc.index_in_parent(at.node)?;
    if at.offset == 0 {
        return Some((parent, index));
    }
    if at.offset < len {
        doc.split_text(at.node, at.offset)?;
    }
    Some((parent, index + 1))
}

/// Insert a `<br>` at the caret (Shift+Enter).
pub fn insert_line_break(doc: &mut Document) -> bool {
    delete_selection(doc);
    let Some(range) = doc.selection() else {
        return false;
    };
    let Some((mut parent, mut index)) = split_point(doc, range.start) else {
        return false;
    };
    if parent == doc.root() {
        let p = doc.create_element("p");
        doc.insert_child(parent, index, p);
        parent = p;
        index = 0;
    }
    let br = doc.create_element("br");
    doc.insert_child(parent, index, br);
    // A trailing break renders no line of its own.
    if doc.next_sibling(br).is_none() {
        let filler = doc.create_element("br");
        doc.insert_after(br, filler);
    }
    let Some(after) = doc.after(br) else {
        return false;
    };
    set_caret(doc, after);
    true
}

/// Split `block` at `at`. Inline ancestors between the two are split too.
fn split_block(doc: &mut Document, block: NodeId, at: Boundary) -> Option<NodeId> {
    let (mut parent, mut index) = split_point(doc, at)?;
    while parent != block {
        doc.split_element_after(parent, index)?;
        index = doc.index_in_parent(parent)? + 1;
        parent = doc.parent(parent)?;
    }
    let tail = doc.split_element_after(block, index)?;
    if let Some(el) = doc.element_mut(tail) {
        el.remove_attr("id");
    }
    Some(tail)
}

/// Start a new block at the caret (Enter).
///
/// Enter in an empty list item leaves the list. Table cells take a line
/// break instead.
pub fn insert_paragraph(doc: &mut Document) -> bool {
    delete_selection(doc);
    let Some(block) = touched_blocks(doc).first().copied() else {
        return false;
    };
    if doc.is_tag(block, "li") && doc.is_blank(block) {
        let Some(first) = lift_list_item(doc, block) else {
            return false;
        };
        tidy(doc);
        let caret = first_position(doc, first);
        set_caret(doc, caret);
        return true;
    }
    if matches!(doc.tag(block), Some("td" | "th")) {
        return insert_line_break(doc);
    }
    let Some(range) = doc.selection() else {
        return false;
    };
    let caret = if doc.is_inclusive_ancestor(block, range.start.node) {
        range.start
    } else if doc.compare_boundaries(range.start, Boundary::new(block, 0)).is_le() {
        Boundary::new(block, 0)
    } else {
        Boundary::new(block, doc.children(block).len())
    };
    let Some(tail) = split_block(doc, block, caret) else {
        return false;
    };
    doc.normalize(block);
    doc.normalize(tail);
    if doc.is_blank(tail) && doc.tag(tail).is_some_and(is_heading) {
        doc.rename(tail, "p");
    }
    let caret = first_position(doc, tail);
    set_caret(doc, caret);
    tidy(doc);
    tracing::trace!(target: "folio::edit", "split block");
    true
}

fn leaf_node(leaf: Leaf) -> NodeId {
    match leaf {
        Leaf::Char(text, _) => text,
        Leaf::Break(br) => br,
    }
}

fn previous_block(doc: &Document, block: NodeId) -> Option<NodeId> {
    let leaf = doc.leaf_before(Boundary::new(block, 0))?;
    doc.block_ancestor(leaf_node(leaf)).filter(|b| *b != block)
}

fn next_block(doc: &Document, block: NodeId) -> Option<NodeId> {
    let end = Boundary::new(block, doc.children(block).len());
    let leaf = doc.leaf_after(end)?;
    doc.block_ancestor(leaf_node(leaf)).filter(|b| *b != block)
}

fn delete_leaf(doc: &mut Document, leaf: Option<Leaf>) -> bool {
    let Some(leaf) = leaf else {
        return false;
    };
    let caret = match leaf {
        Leaf::Char(text, index) => {
            doc.delete_text(text, index..index + 1);
            Some(Boundary::new(text, index))
        }
        Leaf::Break(br) => {
            let before = doc.before(br);
            doc.remove(br);
            before
        }
    };
    if let Some(caret) = caret {
        set_caret(doc, caret);
    }
    tidy(doc);
    true
}

fn previous_item(doc: &Document, li: NodeId) -> Option<NodeId> {
    let mut current = doc.previous_sibling(li);
    while let Some(node) = current {
        if doc.element(node).is_some() {
            return doc.is_tag(node, "li").then_some(node);
        }
        current = doc.previous_sibling(node);
    }
    None
}

/// Backspace at the start of `block`.
fn join_backward(doc: &mut Document, block: NodeId) -> bool {
    if doc.is_tag(block, "li") && previous_item(doc, block).is_none() {
        let Some(first) = lift_list_item(doc, block) else {
            return false;
        };
        tidy(doc);
        let caret = first_position(doc, first);
        set_caret(doc, caret);
        return true;
    }
    let Some(prev) = previous_block(doc, block) else {
        return false;
    };
    let Some(junction) = merge_blocks(doc, prev, block) else {
        return false;
    };
    set_caret(doc, junction);
    tidy(doc);
    true
}

/// Delete the character (or break) before the caret, or the selection.
pub fn delete_backward(doc: &mut Document) -> bool {
    if delete_selection(doc) {
        return true;
    }
    let Some(caret) = doc.selection().map(|r| r.start) else {
        return false;
    };
    let Some(block) = caret_block(doc, caret) else {
        let leaf = doc.leaf_before(caret);
        return delete_leaf(doc, leaf);
    };
    let at_start = doc.char_offset(caret) == doc.char_offset(Boundary::new(block, 0));
    if at_start || doc.is_placeholder(block) {
        return join_backward(doc, block);
    }
    let leaf = doc.leaf_before(caret);
    delete_leaf(doc, leaf)
}

/// Delete the character (or break) after the caret, or the selection.
pub fn delete_forward(doc: &mut Document) -> bool {
    if delete_selection(doc) {
        return true;
    }
    let Some(caret) = doc.selection().map(|r| r.start) else {
        return false;
    };
    let Some(block) = caret_block(doc, caret) else {
        let leaf = doc.leaf_after(caret);
        return delete_leaf(doc, leaf);
    };
    let end = Boundary::new(block, doc.children(block).len());
    let at_end = doc.char_offset(caret) == doc.char_offset(end);
    if at_end || doc.is_placeholder(block) {
        let Some(next) = next_block(doc, block) else {
            return false;
        };
        let Some(junction) = merge_blocks(doc, block, next) else {
            return false;
        };
        set_caret(doc, junction);
        tidy(doc);
        return true;
    }
    let leaf = doc.leaf_after(caret);
    delete_leaf(doc, leaf)
}

/// Insert detached inline nodes at the caret and put the caret after them.
pub(crate) fn insert_inline(doc: &mut Document, nodes: &[NodeId]) -> bool {
    let Some(last) = nodes.last().copied() else {
        return false;
    };
    delete_selection(doc);
    let Some(range) = doc.selection() else {
        return false;
    };
    let at = range.start;
    let (mut parent, mut index) = if doc.is_placeholder(at.node) {
        let br = doc.children(at.node)[0];
        doc.remove(br);
        (at.node, 0)
    } else {
        let Some(point) = split_point(doc, at) else {
            return false;
        };
        point
    };
    let wrapper = if parent == doc.root() {
        Some("p")
    } else if doc.tag(parent).is_some_and(is_list) {
        Some("li")
    } else {
        None
    };
    if let Some(tag) = wrapper {
        let block = doc.create_element(tag);
        doc.insert_child(parent, index, block);
        parent = block;
        index = 0;
    }
    for node in nodes {
        doc.insert_child(parent, index, *node);
        index += 1;
    }
    let Some(after) = doc.after(last) else {
        return false;
    };
    set_caret(doc, after);
    tidy(doc);
    true
}

/// Split the caret's block for block-level insertion. Returns the insertion
/// point in the block's parent; halves left blank by the split are removed.
fn block_split_point(doc: &mut Document, at: Boundary) -> Option<(NodeId, usize)> {
    let root = doc.root();
    let block = doc.block_ancestor(at.node);
    let cell = block.filter(|b| matches!(doc.tag(*b), Some("td" | "th")));
    let container = block.unwrap_or(root);
    let (mut parent, mut index) = split_point(doc, at)?;
    while parent != container && parent != root {
        doc.split_element_after(parent, index)?;
        index = doc.index_in_parent(parent)? + 1;
        parent = doc.parent(parent)?;
    }
    let Some(block) = block.filter(|_| cell.is_none()) else {
        return Some((parent, index));
    };
    let tail = doc.split_element_after(block, index)?;
    if let Some(el) = doc.element_mut(tail) {
        el.remove_attr("id");
    }
    let outer = doc.parent(block)?;
    let position = doc.index_in_parent(block)?;
    if doc.is_blank(tail) {
        doc.remove(tail);
    }
    if doc.is_blank(block) {
        doc.remove(block);
        Some((outer, position))
    } else {
        Some((outer, position + 1))
    }
}

fn insert_blocks(doc: &mut Document, nodes: &[NodeId]) -> bool {
    let mut blocks: Vec<NodeId> = Vec::new();
    let mut run: Option<NodeId> = None;
    for node in nodes.iter().copied() {
        if doc.element(node).is_some_and(Element::is_block) {
            run = None;
            blocks.push(node);
            continue;
        }
        if run.is_none() && doc.text(node).is_some_and(|t| t.trim().is_empty()) {
            doc.remove(node);
            continue;
        }
        let p = match run {
            Some(p) => p,
            None => {
                let p = doc.create_element("p");
                blocks.push(p);
                run = Some(p);
                p
            }
        };
        doc.append_child(p, node);
    }
    let Some(range) = doc.selection() else {
        return false;
    };
    let Some((parent, mut index)) = block_split_point(doc, range.start) else {
        return false;
    };
    let in_list = doc.tag(parent).is_some_and(is_list);
    let mut last = None;
    for block in blocks {
        let block = match (in_list, doc.is_tag(block, "li")) {
            (true, false) if doc.is_tag(block, "p") => {
                doc.rename(block, "li");
                block
            }
            (true, false) => {
                let li = doc.create_element("li");
                doc.append_child(li, block);
                li
            }
            (false, true) => {
                doc.rename(block, "p");
                block
            }
            _ => block,
        };
        doc.insert_child(parent, index, block);
        index += 1;
        last = Some(block);
    }
    let Some(last) = last else {
        return false;
    };
    let caret = last_position(doc, last);
    set_caret(doc, caret);
    tidy(doc);
    true
}

/// Insert a parsed (and already sanitized) fragment at the selection.
pub fn insert_fragment(doc: &mut Document, fragment: &Document) -> bool {
    let top = fragment.children(fragment.root()).to_vec();
    if top.is_empty() {
        return false;
    }
    delete_selection(doc);
    let nodes: Vec<NodeId> = top
        .into_iter()
        .filter_map(|n| doc.import(fragment, n))
        .collect();
    let has_blocks = nodes
        .iter()
        .any(|n| doc.element(*n).is_some_and(Element::is_block));
    let inserted = if has_blocks {
        insert_blocks(doc, &nodes)
    } else {
        insert_inline(doc, &nodes)
    };
    if !inserted {
        for node in nodes {
            if doc.parent(node).is_none() {
                doc.remove(node);
            }
        }
    }
    tracing::trace!(target: "folio::edit", inserted, blocks = has_blocks, "inserted fragment");
    inserted
}
