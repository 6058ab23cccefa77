//! Arena-backed markup tree.
//!
//! Nodes live in a slot arena addressed by generational [`NodeId`]s, so a
//! handle taken before a content swap fails validation instead of aliasing a
//! recycled slot. The document owns the live selection and every structural
//! primitive fixes its boundaries up the way a browser keeps a live range
//! valid across mutations.

use std::cmp::Ordering;
use std::ops::Range;

use smol_str::SmolStr;

use crate::selection::{Affinity, Boundary, SelectionRange};
use crate::style::StyleDecls;

/// Elements with no content model.
pub const VOID_TAGS: &[&str] = &["br", "hr", "img", "wbr"];

/// Elements that hold inline content directly and are addressed by block commands.
pub const TEXT_BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "div", "td", "th",
];

const STRUCTURAL_BLOCK_TAGS: &[&str] = &[
    "ul", "ol", "table", "thead", "tbody", "tfoot", "tr", "hr",
];

/// Inline tags that may be merged with an identical adjacent sibling.
const MERGEABLE_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "strike", "del", "span", "font", "mark", "sub", "sup",
    "code", "a", "ul", "ol",
];

pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub fn is_text_block(tag: &str) -> bool {
    TEXT_BLOCK_TAGS.contains(&tag)
}

pub fn is_block(tag: &str) -> bool {
    is_text_block(tag) || STRUCTURAL_BLOCK_TAGS.contains(&tag)
}

pub fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

pub fn is_list(tag: &str) -> bool {
    matches!(tag, "ul" | "ol")
}

/// Generational handle into a [`Document`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attr {
    pub name: SmolStr,
    pub value: String,
}

/// Tag plus attributes. Children live on the owning [`Node`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: SmolStr,
    pub attrs: Vec<Attr>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attr {
                name: SmolStr::new(name),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos).value)
    }

    pub fn style(&self) -> StyleDecls {
        self.attr("style").map(StyleDecls::parse).unwrap_or_default()
    }

    /// Write declarations back, dropping the attribute when none remain.
    pub fn set_style(&mut self, style: &StyleDecls) {
        if style.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", style.to_string());
        }
    }

    pub fn is_void(&self) -> bool {
        is_void(&self.tag)
    }

    pub fn is_block(&self) -> bool {
        is_block(&self.tag)
    }

    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub data: NodeData,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A unit of linear text: a non-empty text node or a `<br>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Text(NodeId, usize),
    Break(NodeId),
}

/// A single linear position's content: one char of a text node or a `<br>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leaf {
    /// Text node and char index within it.
    Char(NodeId, usize),
    Break(NodeId),
}

/// Markup tree with a live selection.
#[derive(Clone, Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    selection: Option<SelectionRange>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn char_to_byte(text: &str, at: usize) -> Option<usize> {
    if at == 0 {
        return Some(0);
    }
    match text.char_indices().nth(at) {
        Some((byte, _)) => Some(byte),
        None if text.chars().count() == at => Some(text.len()),
        None => None,
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            selection: None,
        };
        doc.root = doc.alloc(NodeData::Root);
        doc
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            data,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.node.is_some() {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// True when the node is alive and attached under the root.
    pub fn contains(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let Some(node) = self.get(current) else {
                return false;
            };
            if current == self.root {
                return true;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.get(id).map(|n| &n.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.get(id)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.get_mut(id)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn text_len(&self, id: NodeId) -> Option<usize> {
        self.text(id).map(|t| t.chars().count())
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    /// Boundary length: chars for text, child count otherwise.
    pub fn node_len(&self, id: NodeId) -> usize {
        match self.text_len(id) {
            Some(len) => len,
            None => self.children(id).len(),
        }
    }

    // === Selection ===

    pub fn selection(&self) -> Option<SelectionRange> {
        self.selection
    }

    /// Replace the live selection. Ranges with a detached or out-of-bounds
    /// boundary clear the selection instead.
    pub fn set_selection(&mut self, range: Option<SelectionRange>) {
        self.selection = range.filter(|r| {
            self.is_valid_boundary(r.start)
                && self.is_valid_boundary(r.end)
                && self.compare_boundaries(r.start, r.end) != Ordering::Greater
        });
    }

    pub fn is_valid_boundary(&self, b: Boundary) -> bool {
        self.contains(b.node) && b.offset <= self.node_len(b.node)
    }

    fn fix_selection(&mut self, fix: impl Fn(&Document, Boundary) -> Boundary) {
        let Some(mut sel) = self.selection else {
            return;
        };
        sel.start = fix(self, sel.start);
        sel.end = fix(self, sel.end);
        self.selection = Some(sel);
    }

    // === Construction ===

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(Element::new(tag)))
    }

    pub fn create_element_from(&mut self, element: Element) -> NodeId {
        self.alloc(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    /// Deep-copy a subtree from another document. The copy is detached.
    pub fn import(&mut self, other: &Document, id: NodeId) -> Option<NodeId> {
        match other.data(id)? {
            NodeData::Root => None,
            NodeData::Text(text) => Some(self.create_text(text.clone())),
            NodeData::Element(el) => {
                let copy = self.create_element_from(el.clone());
                for child in other.children(id) {
                    if let Some(child_copy) = self.import(other, *child) {
                        self.raw_insert(copy, usize::MAX, child_copy);
                    }
                }
                Some(copy)
            }
        }
    }

    // === Structural primitives ===

    fn raw_detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        if let Some(p) = self.get_mut(parent) {
            p.children.remove(idx);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
        Some((parent, idx))
    }

    fn raw_insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let Some(p) = self.get_mut(parent) else {
            return;
        };
        let index = index.min(p.children.len());
        p.children.insert(index, child);
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /// Insert `child` at `index` under `parent`, detaching it first if attached.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.is_inclusive_ancestor(child, parent) || !self.is_alive(child) {
            return;
        }
        if self.parent(child).is_some() {
            self.detach(child);
        }
        let index = index.min(self.children(parent).len());
        self.raw_insert(parent, index, child);
        self.fix_selection(|_, b| {
            if b.node == parent && b.offset > index {
                Boundary::new(parent, b.offset + 1)
            } else {
                b
            }
        });
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, usize::MAX, child);
    }

    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        if child == reference {
            return;
        }
        if self.parent(child).is_some() {
            self.detach(child);
        }
        if let (Some(parent), Some(idx)) = (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_child(parent, idx, child);
        }
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        if child == reference {
            return;
        }
        if self.parent(child).is_some() {
            self.detach(child);
        }
        if let (Some(parent), Some(idx)) = (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_child(parent, idx + 1, child);
        }
    }

    /// Unlink a node from its parent, keeping the subtree alive.
    pub fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let (parent, idx) = self.raw_detach(id)?;
        self.fix_selection(|_, b| {
            if b.node == parent && b.offset > idx {
                Boundary::new(parent, b.offset - 1)
            } else {
                b
            }
        });
        Some((parent, idx))
    }

    /// Delete a subtree. Boundaries inside it collapse to where it stood.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            self.clear();
            return;
        }
        if let (Some(parent), Some(idx)) = (self.parent(id), self.index_in_parent(id)) {
            self.fix_selection(|doc, b| {
                if doc.is_inclusive_ancestor(id, b.node) {
                    Boundary::new(parent, idx)
                } else {
                    b
                }
            });
            self.detach(id);
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            stack.extend_from_slice(self.children(node));
            self.release(node);
        }
    }

    /// Drop every child of the root and the selection with them.
    pub fn clear(&mut self) {
        let children = self.children(self.root).to_vec();
        for child in children {
            self.free_subtree(child);
        }
        let root = self.root;
        if let Some(r) = self.get_mut(root) {
            r.children.clear();
        }
        self.selection = None;
    }

    /// Replace an element with its children.
    pub fn unwrap(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        if id == self.root {
            return None;
        }
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        let kids = std::mem::take(&mut self.get_mut(id)?.children);
        let n = kids.len();
        self.fix_selection(|_, b| {
            if b.node == id {
                Boundary::new(parent, idx + b.offset)
            } else if b.node == parent && b.offset > idx {
                Boundary::new(parent, b.offset + n - 1)
            } else {
                b
            }
        });
        if let Some(p) = self.get_mut(parent) {
            p.children.splice(idx..idx + 1, kids.iter().copied());
        }
        for kid in &kids {
            if let Some(node) = self.get_mut(*kid) {
                node.parent = Some(parent);
            }
        }
        self.release(id);
        Some((parent, idx))
    }

    /// Wrap a node in a new element placed where the node stood.
    pub fn wrap(&mut self, id: NodeId, element: Element) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        let wrapper = self.create_element_from(element);
        self.insert_child(parent, idx, wrapper);
        self.insert_child(wrapper, 0, id);
        Some(wrapper)
    }

    /// Wrap a run of consecutive siblings `[first, last]` in a new element.
    pub fn wrap_range(&mut self, first: NodeId, last: NodeId, element: Element) -> Option<NodeId> {
        let parent = self.parent(first)?;
        if self.parent(last) != Some(parent) {
            return None;
        }
        let start = self.index_in_parent(first)?;
        let end = self.index_in_parent(last)?;
        if end < start {
            return None;
        }
        let run: Vec<NodeId> = self.children(parent)[start..=end].to_vec();
        let wrapper = self.create_element_from(element);
        let n = run.len();
        self.fix_selection(|_, b| {
            if b.node == parent && b.offset > start && b.offset < start + n {
                Boundary::new(wrapper, b.offset - start)
            } else if b.node == parent && b.offset >= start + n {
                Boundary::new(parent, b.offset - n + 1)
            } else {
                b
            }
        });
        if let Some(p) = self.get_mut(parent) {
            p.children.splice(start..=end, [wrapper]);
        }
        for kid in &run {
            if let Some(node) = self.get_mut(*kid) {
                node.parent = Some(wrapper);
            }
        }
        if let Some(w) = self.get_mut(wrapper) {
            w.children = run;
            w.parent = Some(parent);
        }
        Some(wrapper)
    }

    pub fn rename(&mut self, id: NodeId, tag: &str) {
        if let Some(el) = self.element_mut(id) {
            el.tag = SmolStr::new(tag.to_ascii_lowercase());
        }
    }

    /// Move children `[at..]` of an element into a shallow copy inserted right
    /// after it. Returns the copy.
    pub fn split_element_after(&mut self, id: NodeId, at: usize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        let element = self.element(id)?.clone();
        let copy = self.create_element_from(element);
        self.insert_child(parent, idx + 1, copy);
        let moved: Vec<NodeId> = self
            .children(id)
            .get(at..)
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default();
        self.fix_selection(|_, b| {
            if b.node == id && b.offset > at {
                Boundary::new(copy, b.offset - at)
            } else {
                b
            }
        });
        if let Some(node) = self.get_mut(id) {
            node.children.truncate(at);
        }
        for m in &moved {
            if let Some(node) = self.get_mut(*m) {
                node.parent = Some(copy);
            }
        }
        if let Some(node) = self.get_mut(copy) {
            node.children = moved;
        }
        Some(copy)
    }

    /// Move every child of `from` to the end of `to`. `from` is left empty.
    pub fn append_children_from(&mut self, from: NodeId, to: NodeId) {
        if from == to || self.is_inclusive_ancestor(from, to) {
            return;
        }
        let base = self.children(to).len();
        let moved = match self.get_mut(from) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        self.fix_selection(|_, b| {
            if b.node == from {
                Boundary::new(to, base + b.offset)
            } else {
                b
            }
        });
        for m in &moved {
            if let Some(node) = self.get_mut(*m) {
                node.parent = Some(to);
            }
        }
        if let Some(node) = self.get_mut(to) {
            node.children.extend(moved);
        }
    }

    /// Merge element `second` into its previous sibling `first`.
    pub fn merge_siblings(&mut self, first: NodeId, second: NodeId) {
        let Some(parent) = self.parent(second) else {
            return;
        };
        let Some(idx) = self.index_in_parent(second) else {
            return;
        };
        let base = self.children(first).len();
        self.fix_selection(|_, b| {
            if b.node == parent && b.offset == idx {
                Boundary::new(first, base)
            } else {
                b
            }
        });
        self.append_children_from(second, first);
        self.remove(second);
    }

    // === Text primitives ===

    fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.get_mut(id)?.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Split a text node at a char offset. Returns the new tail node.
    pub fn split_text(&mut self, id: NodeId, at: usize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        let text = self.text(id)?;
        let byte = char_to_byte(text, at)?;
        let tail = text[byte..].to_string();
        if let Some(t) = self.text_mut(id) {
            t.truncate(byte);
        }
        let new = self.create_text(tail);
        self.insert_child(parent, idx + 1, new);
        self.fix_selection(|_, b| {
            if b.node == id && b.offset > at {
                Boundary::new(new, b.offset - at)
            } else {
                b
            }
        });
        Some(new)
    }

    /// Insert text at a char offset. Boundaries at `at` stay put.
    pub fn insert_text(&mut self, id: NodeId, at: usize, s: &str) -> bool {
        let Some(byte) = self.text(id).and_then(|t| char_to_byte(t, at)) else {
            return false;
        };
        if let Some(t) = self.text_mut(id) {
            t.insert_str(byte, s);
        }
        let n = s.chars().count();
        self.fix_selection(|_, b| {
            if b.node == id && b.offset > at {
                Boundary::new(id, b.offset + n)
            } else {
                b
            }
        });
        true
    }

    /// Delete a char range from a text node.
    pub fn delete_text(&mut self, id: NodeId, range: Range<usize>) -> bool {
        let Some((start, end)) = self.text(id).and_then(|t| {
            Some((char_to_byte(t, range.start)?, char_to_byte(t, range.end)?))
        }) else {
            return false;
        };
        if start >= end {
            return false;
        }
        if let Some(t) = self.text_mut(id) {
            t.replace_range(start..end, "");
        }
        let removed = range.end - range.start;
        self.fix_selection(|_, b| {
            if b.node != id {
                b
            } else if b.offset >= range.end {
                Boundary::new(id, b.offset - removed)
            } else if b.offset > range.start {
                Boundary::new(id, range.start)
            } else {
                b
            }
        });
        true
    }

    /// Merge text node `second` into its previous sibling text node `first`.
    pub fn merge_text(&mut self, first: NodeId, second: NodeId) -> bool {
        let (Some(la), Some(tail)) = (self.text_len(first), self.text(second).map(str::to_string))
        else {
            return false;
        };
        let (Some(parent), Some(idx)) = (self.parent(second), self.index_in_parent(second)) else {
            return false;
        };
        if let Some(t) = self.text_mut(first) {
            t.push_str(&tail);
        }
        self.fix_selection(|_, b| {
            if b.node == second {
                Boundary::new(first, la + b.offset)
            } else if b.node == parent && b.offset == idx {
                Boundary::new(first, la)
            } else {
                b
            }
        });
        self.remove(second);
        true
    }

    // === Traversal ===

    /// Descendants in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Nearest inclusive ancestor element (below the root) matching `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .take_while(|n| *n != self.root)
            .find(|n| self.element(*n).is_some_and(&pred))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Nearest text-block ancestor (inclusive), never the root.
    pub fn block_ancestor(&self, id: NodeId) -> Option<NodeId> {
        self.closest(id, |el| is_text_block(&el.tag))
    }

    // === Ordering ===

    fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(self.index_in_parent(current).unwrap_or(0));
            current = parent;
        }
        path.reverse();
        path
    }

    /// Document order of two nodes; ancestors sort before descendants.
    pub fn compare_nodes(&self, a: NodeId, b: NodeId) -> Ordering {
        self.path(a).cmp(&self.path(b))
    }

    pub fn compare_boundaries(&self, a: Boundary, b: Boundary) -> Ordering {
        if a.node == b.node {
            return a.offset.cmp(&b.offset);
        }
        let pa = self.path(a.node);
        let pb = self.path(b.node);
        if pb.len() > pa.len() && pb[..pa.len()] == pa[..] {
            let child = pb[pa.len()];
            return if a.offset <= child {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        if pa.len() > pb.len() && pa[..pb.len()] == pb[..] {
            let child = pa[pb.len()];
            return if b.offset <= child {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        pa.cmp(&pb)
    }

    /// Boundary immediately before a node.
    pub fn before(&self, id: NodeId) -> Option<Boundary> {
        Some(Boundary::new(self.parent(id)?, self.index_in_parent(id)?))
    }

    /// Boundary immediately after a node.
    pub fn after(&self, id: NodeId) -> Option<Boundary> {
        Some(Boundary::new(self.parent(id)?, self.index_in_parent(id)? + 1))
    }

    /// True when the whole node lies within `[start, end]`.
    pub fn node_within(&self, id: NodeId, start: Boundary, end: Boundary) -> bool {
        let (Some(before), Some(after)) = (self.before(id), self.after(id)) else {
            return false;
        };
        self.compare_boundaries(before, start) != Ordering::Less
            && self.compare_boundaries(after, end) != Ordering::Greater
    }

    /// True when the node's extent overlaps `(start, end)` or touches a collapsed range.
    pub fn node_intersects(&self, id: NodeId, start: Boundary, end: Boundary) -> bool {
        if self.is_inclusive_ancestor(id, start.node) || self.is_inclusive_ancestor(id, end.node) {
            return true;
        }
        let (Some(before), Some(after)) = (self.before(id), self.after(id)) else {
            return false;
        };
        self.compare_boundaries(before, end) == Ordering::Less
            && self.compare_boundaries(after, start) == Ordering::Greater
    }

    /// Non-empty text nodes lying fully inside `[start, end]`, in document order.
    pub fn text_nodes_within(&self, start: Boundary, end: Boundary) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| {
                let Some(len) = self.text_len(*n) else {
                    return false;
                };
                len > 0
                    && self.compare_boundaries(Boundary::new(*n, 0), start) != Ordering::Less
                    && self.compare_boundaries(Boundary::new(*n, len), end) != Ordering::Greater
            })
            .collect()
    }

    // === Linear offsets ===

    fn units(&self) -> Vec<Unit> {
        self.descendants(self.root)
            .into_iter()
            .filter_map(|n| match self.data(n)? {
                NodeData::Text(t) if !t.is_empty() => Some(Unit::Text(n, t.chars().count())),
                NodeData::Element(el) if el.tag == "br" => Some(Unit::Break(n)),
                _ => None,
            })
            .collect()
    }

    /// Total linear length: chars plus one per `<br>`.
    pub fn char_len(&self) -> usize {
        self.units()
            .iter()
            .map(|u| match u {
                Unit::Text(_, len) => *len,
                Unit::Break(_) => 1,
            })
            .sum()
    }

    /// Linear char offset of a boundary.
    pub fn char_offset(&self, b: Boundary) -> usize {
        let mut acc = 0;
        for unit in self.units() {
            match unit {
                Unit::Text(t, len) => {
                    if t == b.node {
                        return acc + b.offset.min(len);
                    }
                    if self.compare_boundaries(Boundary::new(t, len), b) == Ordering::Greater {
                        return acc;
                    }
                    acc += len;
                }
                Unit::Break(br) => {
                    let Some(after) = self.after(br) else {
                        continue;
                    };
                    if self.compare_boundaries(after, b) == Ordering::Greater {
                        return acc;
                    }
                    acc += 1;
                }
            }
        }
        acc
    }

    /// Boundary for a linear char offset. Offsets sitting between two units
    /// resolve to the earlier one with `Before` affinity, the later with `After`.
    pub fn boundary_at(&self, offset: usize, affinity: Affinity) -> Boundary {
        let mut acc = 0;
        let mut candidate = None;
        for unit in self.units() {
            let (len, at) = match unit {
                Unit::Text(t, len) => (len, (offset >= acc && offset <= acc + len)
                    .then(|| Boundary::new(t, offset - acc))),
                Unit::Break(br) => {
                    let at = if offset == acc {
                        self.before(br)
                    } else if offset == acc + 1 {
                        self.after(br)
                    } else {
                        None
                    };
                    (1, at)
                }
            };
            if let Some(b) = at {
                if affinity == Affinity::Before {
                    return b;
                }
                candidate = Some(b);
            }
            acc += len;
        }
        candidate.unwrap_or_else(|| self.end_boundary())
    }

    fn leaf_at(&self, index: usize) -> Option<Leaf> {
        let mut acc = 0;
        for unit in self.units() {
            match unit {
                Unit::Text(t, len) => {
                    if index < acc + len {
                        return Some(Leaf::Char(t, index - acc));
                    }
                    acc += len;
                }
                Unit::Break(br) => {
                    if index == acc {
                        return Some(Leaf::Break(br));
                    }
                    acc += 1;
                }
            }
        }
        None
    }

    /// The char or `<br>` immediately before a boundary.
    pub fn leaf_before(&self, b: Boundary) -> Option<Leaf> {
        self.char_offset(b)
            .checked_sub(1)
            .and_then(|index| self.leaf_at(index))
    }

    /// The char or `<br>` immediately after a boundary.
    pub fn leaf_after(&self, b: Boundary) -> Option<Leaf> {
        self.leaf_at(self.char_offset(b))
    }

    /// True for a block whose only content is a single `<br>`.
    pub fn is_placeholder(&self, id: NodeId) -> bool {
        let children = self.children(id);
        children.len() == 1 && self.is_tag(children[0], "br")
    }

    /// True when the subtree holds no text other than whitespace and no void element.
    pub fn is_blank(&self, id: NodeId) -> bool {
        if let Some(text) = self.text(id) {
            return text.trim().is_empty();
        }
        self.descendants(id).into_iter().all(|n| match self.data(n) {
            Some(NodeData::Text(t)) => t.trim().is_empty(),
            Some(NodeData::Element(el)) => !el.is_void() || el.tag == "br",
            _ => true,
        })
    }

    /// End of the document: the root's last child position.
    pub fn end_boundary(&self) -> Boundary {
        Boundary::new(self.root, self.children(self.root).len())
    }

    // === Normalization ===

    /// Merge adjacent text, drop empty text and empty inline wrappers, and
    /// merge identical adjacent inline siblings under `id`.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            if self.element(child).is_some() {
                self.normalize(child);
            }
        }
        let mut i = 0;
        while i < self.children(id).len() {
            let child = self.children(id)[i];
            if self.text(child).is_some_and(str::is_empty) {
                self.remove(child);
                continue;
            }
            let empty_inline = self.element(child).is_some_and(|el| {
                el.is_inline() && !el.is_void()
            }) && self.children(child).is_empty();
            if empty_inline {
                self.remove(child);
                continue;
            }
            if i > 0 {
                let prev = self.children(id)[i - 1];
                if self.is_text(prev) && self.is_text(child) {
                    self.merge_text(prev, child);
                    continue;
                }
                let same = match (self.element(prev), self.element(child)) {
                    (Some(a), Some(b)) => a == b && MERGEABLE_TAGS.contains(&a.tag.as_str()),
                    _ => false,
                };
                if same {
                    self.merge_siblings(prev, child);
                    self.normalize(prev);
                    continue;
                }
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;

    fn doc(markup: &str) -> Document {
        html::parse_fragment(markup, usize::MAX).expect("parse")
    }

    fn first_text(doc: &Document) -> NodeId {
        doc.descendants(doc.root())
            .into_iter()
            .find(|n| doc.is_text(*n))
            .expect("text node")
    }

    #[test]
    fn test_stale_ids_fail_validation() {
        let mut d = doc("<p>one</p>");
        let text = first_text(&d);
        assert!(d.contains(text));
        d.clear();
        assert!(!d.contains(text));
        let fresh = d.create_text("two");
        d.append_child(d.root(), fresh);
        assert!(!d.is_alive(text));
        assert!(d.contains(fresh));
    }

    #[test]
    fn test_split_text_moves_boundaries() {
        let mut d = doc("<p>Hello</p>");
        let t = first_text(&d);
        d.set_selection(Some(SelectionRange::new(
            Boundary::new(t, 1),
            Boundary::new(t, 4),
        )));
        let tail = d.split_text(t, 2).expect("split");
        let sel = d.selection().expect("selection");
        assert_eq!(sel.start, Boundary::new(t, 1));
        assert_eq!(sel.end, Boundary::new(tail, 2));
        assert_eq!(d.text(t), Some("He"));
        assert_eq!(d.text(tail), Some("llo"));
    }

    #[test]
    fn test_unwrap_keeps_boundaries_in_place() {
        let mut d = doc("<p>a<b>bc</b>d</p>");
        let p = d.children(d.root())[0];
        let b = d.children(p)[1];
        d.set_selection(Some(SelectionRange::new(
            Boundary::new(b, 1),
            Boundary::new(p, 3),
        )));
        d.unwrap(b);
        let sel = d.selection().expect("selection");
        assert_eq!(sel.start, Boundary::new(p, 2));
        assert_eq!(sel.end, Boundary::new(p, 3));
        assert_eq!(html::to_html(&d, d.root()), "<p>abcd</p>");
    }

    #[test]
    fn test_remove_collapses_inner_boundaries() {
        let mut d = doc("<p>a</p><p>b</p>");
        let second = d.children(d.root())[1];
        let t = d.children(second)[0];
        d.set_selection(Some(SelectionRange::caret(Boundary::new(t, 1))));
        d.remove(second);
        assert_eq!(
            d.selection().map(|s| s.start),
            Some(Boundary::new(d.root(), 1))
        );
    }

    #[test]
    fn test_compare_boundaries_document_order() {
        let d = doc("<p>ab</p><p>cd</p>");
        let root = d.root();
        let p1 = d.children(root)[0];
        let t1 = d.children(p1)[0];
        let p2 = d.children(root)[1];
        let t2 = d.children(p2)[0];
        assert_eq!(
            d.compare_boundaries(Boundary::new(t1, 2), Boundary::new(t2, 0)),
            Ordering::Less
        );
        assert_eq!(
            d.compare_boundaries(Boundary::new(root, 1), Boundary::new(t1, 2)),
            Ordering::Greater
        );
        assert_eq!(
            d.compare_boundaries(Boundary::new(p1, 0), Boundary::new(t1, 0)),
            Ordering::Less
        );
    }

    #[test]
    fn test_char_offsets_round_trip_through_breaks() {
        let d = doc("<p>ab<br>cd</p>");
        assert_eq!(d.char_len(), 5);
        let b = d.boundary_at(3, Affinity::After);
        assert_eq!(d.char_offset(b), 3);
        assert_eq!(d.text(b.node), Some("cd"));
        let before = d.boundary_at(2, Affinity::Before);
        assert_eq!(d.text(before.node), Some("ab"));
        assert_eq!(before.offset, 2);
    }

    #[test]
    fn test_normalize_merges_identical_siblings() {
        let mut d = doc("<p><b>a</b><b>b</b><i></i>c</p>");
        let root = d.root();
        d.normalize(root);
        assert_eq!(html::to_html(&d, root), "<p><b>ab</b>c</p>");
    }

    #[test]
    fn test_split_element_after() {
        let mut d = doc("<ul><li>a</li><li>b</li><li>c</li></ul>");
        let ul = d.children(d.root())[0];
        let tail = d.split_element_after(ul, 1).expect("split");
        assert_eq!(d.children(ul).len(), 1);
        assert_eq!(d.children(tail).len(), 2);
        assert_eq!(
            html::to_html(&d, d.root()),
            "<ul><li>a</li></ul><ul><li>b</li><li>c</li></ul>"
        );
    }

    #[test]
    fn test_wrap_range() {
        let mut d = doc("a<b>b</b>c<p>x</p>");
        let root = d.root();
        let first = d.children(root)[0];
        let last = d.children(root)[2];
        d.wrap_range(first, last, Element::new("p"));
        assert_eq!(html::to_html(&d, root), "<p>a<b>b</b>c</p><p>x</p>");
    }

    #[test]
    fn test_leaves_around_line_break() {
        let d = doc("<p>ab<br>c</p>");
        let at_break = d.boundary_at(2, Affinity::Before);
        let text = first_text(&d);
        assert_eq!(d.leaf_before(at_break), Some(Leaf::Char(text, 1)));
        assert!(matches!(d.leaf_after(at_break), Some(Leaf::Break(_))));
        assert_eq!(d.leaf_before(d.boundary_at(0, Affinity::Before)), None);
        assert_eq!(d.leaf_after(d.end_boundary()), None);
    }
}
