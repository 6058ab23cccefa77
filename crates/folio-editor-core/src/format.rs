//! Formatting operations on the live selection.
//!
//! Inline operations split text at the selection edges, then wrap or lift each
//! selected text node. Block operations resolve the text blocks the selection
//! touches, wrapping loose root-level inline content into paragraphs first.
//! Every operation keeps the selection on the same content and finishes by
//! normalizing the tree.

use smol_str::SmolStr;

use crate::commands::{BlockFormat, CommandOutcome, FormatState, Notice, NoticeKind, ThemeSpec};
use crate::dom::{Document, Element, NodeId, is_heading, is_list, is_text_block};
use crate::edit;
use crate::error::EditorError;
use crate::selection::{Affinity, Boundary, SelectionRange};
use crate::style::{Alignment, StyleAttributes, is_highlight_property, is_valid_color};
use crate::text_helpers::find_word_range;

/// Inline formats toggled by tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineFormat {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
}

impl InlineFormat {
    fn tag(self) -> &'static str {
        match self {
            Self::Bold => "b",
            Self::Italic => "i",
            Self::Underline => "u",
            Self::StrikeThrough => "s",
        }
    }

    fn tags(self) -> &'static [&'static str] {
        match self {
            Self::Bold => &["b", "strong"],
            Self::Italic => &["i", "em"],
            Self::Underline => &["u"],
            Self::StrikeThrough => &["s", "strike", "del"],
        }
    }

    /// Element applies this format, by tag or by inline style.
    pub fn matches(self, el: &Element) -> bool {
        if self.tags().contains(&el.tag.as_str()) {
            return true;
        }
        let attrs = StyleAttributes::from_decls(&el.style());
        let flag = match self {
            Self::Bold => attrs.bold,
            Self::Italic => attrs.italic,
            Self::Underline => attrs.underline,
            Self::StrikeThrough => attrs.strikethrough,
        };
        flag.unwrap_or(false)
    }

    fn strip_style(self, el: &mut Element) {
        let mut style = el.style();
        match self {
            Self::Bold => {
                style.remove("font-weight");
            }
            Self::Italic => {
                style.remove("font-style");
            }
            Self::Underline | Self::StrikeThrough => {
                let keyword = if self == Self::Underline {
                    "underline"
                } else {
                    "line-through"
                };
                for prop in ["text-decoration", "text-decoration-line"] {
                    let Some(value) = style.get(prop).map(str::to_string) else {
                        continue;
                    };
                    let rest: Vec<&str> = value.split_whitespace().filter(|w| *w != keyword).collect();
                    if rest.is_empty() || rest == ["none"] {
                        style.remove(prop);
                    } else {
                        style.set(prop, rest.join(" "));
                    }
                }
            }
        }
        el.set_style(&style);
    }
}

/// Inline wrappers removed by `removeFormat`.
const FORMATTING_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "strike", "del", "sub", "sup", "font", "span", "mark",
    "code",
];

fn finish(doc: &mut Document) -> CommandOutcome {
    prune_empty_lists(doc);
    let root = doc.root();
    doc.normalize(root);
    CommandOutcome::Applied
}

fn prune_empty_lists(doc: &mut Document) {
    let root = doc.root();
    for node in doc.descendants(root) {
        let empty_list = doc.tag(node).is_some_and(is_list)
            && !doc.children(node).iter().any(|c| doc.element(*c).is_some());
        if empty_list {
            doc.remove(node);
        }
    }
}

// === Selection helpers ===

/// Resolve a caret onto a text node in the same block, if one touches it.
fn text_caret(doc: &Document, caret: Boundary) -> Option<Boundary> {
    if doc.is_text(caret.node) {
        return Some(caret);
    }
    let resolved = doc.boundary_at(doc.char_offset(caret), Affinity::Before);
    let same_block = doc.block_ancestor(resolved.node) == doc.block_ancestor(caret.node)
        || caret.node == doc.root();
    (doc.is_text(resolved.node) && same_block).then_some(resolved)
}

/// The selection to format. A collapsed caret widens to the word around it.
fn target_range(doc: &mut Document) -> Option<SelectionRange> {
    let range = doc.selection()?;
    if !range.is_collapsed() {
        return Some(range);
    }
    let caret = text_caret(doc, range.start)?;
    let word = find_word_range(doc.text(caret.node)?, caret.offset)?;
    doc.set_selection(Some(SelectionRange::new(
        Boundary::new(caret.node, word.start),
        Boundary::new(caret.node, word.end),
    )));
    doc.selection()
}

/// Split text nodes at the range edges so the selection covers whole nodes.
fn split_edges(doc: &mut Document) -> Option<SelectionRange> {
    let range = doc.selection()?;
    let end = range.end;
    if doc.text_len(end.node).is_some_and(|len| end.offset > 0 && end.offset < len) {
        doc.split_text(end.node, end.offset);
    }
    let range = doc.selection()?;
    let start = range.start;
    if doc.text_len(start.node).is_some_and(|len| start.offset > 0 && start.offset < len) {
        let tail = doc.split_text(start.node, start.offset)?;
        let range = doc.selection()?;
        doc.set_selection(Some(SelectionRange::new(Boundary::new(tail, 0), range.end)));
    }
    doc.selection()
}

fn is_structural_whitespace(doc: &Document, text: NodeId) -> bool {
    doc.text(text).is_some_and(|t| t.trim().is_empty())
        && doc.parent(text).is_some_and(|p| {
            p == doc.root()
                || doc.tag(p).is_some_and(|t| {
                    is_list(t) || matches!(t, "table" | "thead" | "tbody" | "tfoot" | "tr")
                })
        })
}

/// Split, then list the text nodes wholly inside the selection.
fn prepare_inline(doc: &mut Document) -> Option<Vec<NodeId>> {
    target_range(doc)?;
    let range = split_edges(doc)?;
    let texts: Vec<NodeId> = doc
        .text_nodes_within(range.start, range.end)
        .into_iter()
        .filter(|t| !is_structural_whitespace(doc, *t))
        .collect();
    (!texts.is_empty()).then_some(texts)
}

/// A text node or `<br>` overlapping the range. Text that only touches a
/// non-collapsed range at its edge does not count.
fn leaf_intersects(doc: &Document, node: NodeId, range: SelectionRange) -> bool {
    match doc.text(node) {
        Some(text) => {
            if text.trim().is_empty() {
                return false;
            }
            if !range.is_collapsed() {
                let len = text.chars().count();
                if (node == range.start.node && range.start.offset >= len)
                    || (node == range.end.node && range.end.offset == 0)
                {
                    return false;
                }
            }
        }
        None if doc.is_tag(node, "br") => {}
        None => return false,
    }
    doc.node_intersects(node, range.start, range.end)
}

fn intersecting_texts(doc: &Document, range: SelectionRange) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|n| doc.is_text(*n) && leaf_intersects(doc, *n, range))
        .collect()
}

fn has_inline(doc: &Document, text: NodeId, format: InlineFormat) -> bool {
    doc.closest(text, |el| el.is_inline() && format.matches(el))
        .is_some()
}

/// Split ancestors between `node` and `ancestor` so `node` is the only content
/// of a copy of `ancestor`. Returns that copy (or `ancestor` itself).
fn isolate(doc: &mut Document, node: NodeId, ancestor: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        let parent = doc.parent(current)?;
        let index = doc.index_in_parent(current)?;
        let container = if index > 0 {
            doc.split_element_after(parent, index)?
        } else {
            parent
        };
        if doc.children(container).len() > 1 {
            doc.split_element_after(container, 1)?;
        }
        if parent == ancestor {
            return Some(container);
        }
        current = container;
    }
}

/// Remove matching inline ancestors from a text node without touching its
/// siblings. `strip` edits the isolated ancestor and returns true when it
/// should be unwrapped outright.
fn lift_inline(
    doc: &mut Document,
    text: NodeId,
    matches: impl Fn(&Element) -> bool,
    strip: impl Fn(&mut Element) -> bool,
) {
    while let Some(ancestor) = doc.closest(text, |el| el.is_inline() && matches(el)) {
        let Some(container) = isolate(doc, text, ancestor) else {
            break;
        };
        let unwrap = match doc.element_mut(container) {
            Some(el) => strip(el),
            None => break,
        };
        let leftover = doc.element(container).is_some_and(|el| {
            matches(el) || (matches!(el.tag.as_str(), "span" | "font") && el.attrs.is_empty())
        });
        if unwrap || leftover {
            doc.unwrap(container);
        }
    }
}

fn touched_items(doc: &Document, texts: &[NodeId]) -> Vec<NodeId> {
    let mut items = Vec::new();
    for text in texts {
        if let Some(li) = doc.closest(*text, |el| el.tag == "li") {
            if !items.contains(&li) {
                items.push(li);
            }
        }
    }
    items
}

fn set_style_property(doc: &mut Document, id: NodeId, name: &str, value: &str) {
    if let Some(el) = doc.element_mut(id) {
        let mut style = el.style();
        style.set(name, value);
        el.set_style(&style);
    }
}

fn remove_style_property(doc: &mut Document, id: NodeId, name: &str) -> bool {
    let Some(el) = doc.element_mut(id) else {
        return false;
    };
    let mut style = el.style();
    let removed = style.remove(name);
    el.set_style(&style);
    removed
}

/// Set a style property on a span holding exactly this text node.
fn style_text(doc: &mut Document, text: NodeId, name: &str, value: &str) {
    let span = match doc.parent(text) {
        Some(p) if doc.is_tag(p, "span") && doc.children(p).len() == 1 => p,
        _ => match doc.wrap(text, Element::new("span")) {
            Some(span) => span,
            None => return,
        },
    };
    set_style_property(doc, span, name, value);
}

// === Inline commands ===

/// Toggle an inline format. Removes it when every selected text node already
/// has it, applies it to the rest otherwise.
pub fn toggle_inline(doc: &mut Document, format: InlineFormat) -> CommandOutcome {
    let Some(texts) = prepare_inline(doc) else {
        return CommandOutcome::Unchanged;
    };
    let active = texts.iter().all(|t| has_inline(doc, *t, format));
    for text in texts {
        if active {
            lift_inline(
                doc,
                text,
                |el| format.matches(el),
                |el| {
                    if format.tags().contains(&el.tag.as_str()) {
                        return true;
                    }
                    format.strip_style(el);
                    false
                },
            );
        } else if !has_inline(doc, text, format) {
            doc.wrap(text, Element::new(format.tag()));
        }
    }
    finish(doc)
}

/// Apply a text color. List items touched by the selection take the same
/// color so their markers match the text.
pub fn fore_color(doc: &mut Document, color: &str) -> CommandOutcome {
    let Some(texts) = prepare_inline(doc) else {
        return CommandOutcome::Unchanged;
    };
    for text in &texts {
        style_text(doc, *text, "color", color);
    }
    for li in touched_items(doc, &texts) {
        set_style_property(doc, li, "color", color);
    }
    tracing::debug!(target: "folio::format", color, nodes = texts.len(), "applied text color");
    finish(doc)
}

pub fn hilite_color(doc: &mut Document, color: &str) -> CommandOutcome {
    let Some(texts) = prepare_inline(doc) else {
        return CommandOutcome::Unchanged;
    };
    for text in &texts {
        style_text(doc, *text, "background-color", color);
    }
    finish(doc)
}

/// Strip text color from the selection, leaving other formatting alone.
pub fn remove_color(doc: &mut Document) -> CommandOutcome {
    let Some(texts) = prepare_inline(doc) else {
        return CommandOutcome::Unchanged;
    };
    for text in &texts {
        lift_inline(
            doc,
            *text,
            |el| el.style().get("color").is_some() || (el.tag == "font" && el.has_attr("color")),
            |el| {
                let mut style = el.style();
                style.remove("color");
                el.set_style(&style);
                el.remove_attr("color");
                false
            },
        );
    }
    for li in touched_items(doc, &texts) {
        remove_style_property(doc, li, "color");
    }
    finish(doc)
}

/// Strip background highlight from the selection and unwrap `mark`.
pub fn remove_highlight(doc: &mut Document) -> CommandOutcome {
    let Some(texts) = prepare_inline(doc) else {
        return CommandOutcome::Unchanged;
    };
    for text in texts {
        lift_inline(
            doc,
            text,
            |el| el.tag == "mark" || el.style().iter().any(|(name, _)| is_highlight_property(name)),
            |el| {
                if el.tag == "mark" {
                    return true;
                }
                let mut style = el.style();
                style.retain(|name, _| !is_highlight_property(name));
                el.set_style(&style);
                false
            },
        );
    }
    finish(doc)
}

/// Unwrap every formatting wrapper around the selection. Links stay.
pub fn remove_format(doc: &mut Document) -> CommandOutcome {
    let Some(texts) = prepare_inline(doc) else {
        return CommandOutcome::Unchanged;
    };
    for text in &texts {
        lift_inline(
            doc,
            *text,
            |el| FORMATTING_TAGS.contains(&el.tag.as_str()),
            |_| true,
        );
    }
    for li in touched_items(doc, &texts) {
        remove_style_property(doc, li, "color");
    }
    finish(doc)
}

/// Check a link target. Relative and script URLs are refused.
pub fn validate_url(raw: &str) -> Result<String, EditorError> {
    let raw = raw.trim();
    let parsed = url::Url::parse(raw).map_err(|_| EditorError::InvalidUrl(raw.to_string()))?;
    match parsed.scheme() {
        "javascript" | "vbscript" | "data" => Err(EditorError::InvalidUrl(raw.to_string())),
        _ => Ok(raw.to_string()),
    }
}

/// Link the selection. A caret with no word around it inserts the URL as
/// the link text.
pub fn create_link(doc: &mut Document, url: &str) -> CommandOutcome {
    let href = match validate_url(url) {
        Ok(href) => href,
        Err(err) => {
            tracing::debug!(target: "folio::format", url, "rejected link");
            return CommandOutcome::Rejected(Notice::from(&err));
        }
    };
    let Some(range) = doc.selection() else {
        return CommandOutcome::Unchanged;
    };
    if range.is_collapsed() && target_range(doc).is_none() {
        let link = doc.create_element_from(Element::new("a").with_attr("href", href.as_str()));
        let text = doc.create_text(href);
        doc.append_child(link, text);
        if !edit::insert_inline(doc, &[link]) {
            doc.remove(link);
            return CommandOutcome::Unchanged;
        }
        return finish(doc);
    }
    let Some(texts) = prepare_inline(doc) else {
        return CommandOutcome::Unchanged;
    };
    for text in texts {
        lift_inline(doc, text, |el| el.tag == "a", |_| true);
        doc.wrap(text, Element::new("a").with_attr("href", href.as_str()));
    }
    finish(doc)
}

/// Remove links from the selection. A caret inside a link unlinks all of it.
pub fn unlink(doc: &mut Document) -> CommandOutcome {
    let Some(range) = doc.selection() else {
        return CommandOutcome::Unchanged;
    };
    if range.is_collapsed() {
        if let Some(link) = doc.closest(range.start.node, |el| el.tag == "a") {
            doc.unwrap(link);
            return finish(doc);
        }
    }
    let Some(texts) = prepare_inline(doc) else {
        return CommandOutcome::Unchanged;
    };
    let linked: Vec<NodeId> = texts
        .into_iter()
        .filter(|t| doc.closest(*t, |el| el.tag == "a").is_some())
        .collect();
    if linked.is_empty() {
        return CommandOutcome::Unchanged;
    }
    for text in linked {
        lift_inline(doc, text, |el| el.tag == "a", |_| true);
    }
    finish(doc)
}

// === Block helpers ===

fn previous_element_sibling(doc: &Document, id: NodeId) -> Option<NodeId> {
    let mut current = doc.previous_sibling(id);
    while let Some(node) = current {
        if doc.element(node).is_some() {
            return Some(node);
        }
        if doc.text(node).is_some_and(|t| !t.trim().is_empty()) {
            return None;
        }
        current = doc.previous_sibling(node);
    }
    None
}

/// Wrap root-level inline runs touched by the range into paragraphs. An empty
/// document gets a single empty paragraph holding the caret.
fn ensure_blocks(doc: &mut Document, range: SelectionRange) {
    let root = doc.root();
    if doc.children(root).is_empty() {
        let p = doc.create_element("p");
        let br = doc.create_element("br");
        doc.append_child(p, br);
        doc.append_child(root, p);
        doc.set_selection(Some(SelectionRange::caret(Boundary::new(p, 0))));
        return;
    }
    let caret_at_root = range.is_collapsed() && range.start.node == root;
    let mut runs: Vec<(NodeId, NodeId)> = Vec::new();
    let mut current: Option<(NodeId, NodeId, bool)> = None;
    for (index, child) in doc.children(root).iter().copied().enumerate() {
        let inline = match doc.element(child) {
            Some(el) => el.is_inline(),
            None => doc.is_text(child),
        };
        if !inline {
            if let Some((first, last, true)) = current.take() {
                runs.push((first, last));
            }
            continue;
        }
        let touched = doc.node_intersects(child, range.start, range.end)
            || (caret_at_root && (index == range.start.offset || index + 1 == range.start.offset));
        current = match current {
            Some((first, _, seen)) => Some((first, child, seen || touched)),
            None => Some((child, child, touched)),
        };
    }
    if let Some((first, last, true)) = current {
        runs.push((first, last));
    }
    for (first, last) in runs {
        let (Some(start), Some(end)) = (doc.index_in_parent(first), doc.index_in_parent(last)) else {
            continue;
        };
        let blank = doc.children(root)[start..=end]
            .iter()
            .all(|n| doc.text(*n).is_some_and(|t| t.trim().is_empty()));
        if !blank {
            doc.wrap_range(first, last, Element::new("p"));
        }
    }
}

/// Text block holding a caret, looking at root-level neighbours when the
/// caret sits between blocks.
pub(crate) fn caret_block(doc: &Document, at: Boundary) -> Option<NodeId> {
    if let Some(block) = doc.block_ancestor(at.node) {
        return Some(block);
    }
    let children = doc.children(at.node);
    [Some(at.offset), at.offset.checked_sub(1)]
        .into_iter()
        .flatten()
        .filter_map(|i| children.get(i).copied())
        .find(|c| doc.tag(*c).is_some_and(is_text_block))
}

/// Text blocks touched by the selection, in document order.
pub fn touched_blocks(doc: &mut Document) -> Vec<NodeId> {
    let Some(range) = doc.selection() else {
        return Vec::new();
    };
    ensure_blocks(doc, range);
    let Some(range) = doc.selection() else {
        return Vec::new();
    };
    let root = doc.root();
    let mut blocks = Vec::new();
    for node in doc.descendants(root) {
        if !leaf_intersects(doc, node, range) {
            continue;
        }
        if let Some(block) = doc.block_ancestor(node) {
            if !blocks.contains(&block) {
                blocks.push(block);
            }
        }
    }
    if blocks.is_empty() {
        blocks.extend(caret_block(doc, range.start));
    }
    blocks
}

/// The list item a block belongs to, if its parent is a list.
fn list_item(doc: &Document, block: NodeId) -> Option<NodeId> {
    let li = doc.closest(block, |el| el.tag == "li")?;
    doc.parent(li)
        .filter(|p| doc.tag(*p).is_some_and(is_list))
        .map(|_| li)
}

/// Take a list item out of its list. The item becomes a paragraph, or is
/// unwrapped when it holds blocks. Returns the first resulting block.
pub(crate) fn lift_list_item(doc: &mut Document, li: NodeId) -> Option<NodeId> {
    let list = doc.parent(li)?;
    let segment = isolate(doc, li, list)?;
    let has_blocks = doc
        .children(li)
        .iter()
        .any(|c| doc.element(*c).is_some_and(Element::is_block));
    let first = if has_blocks {
        let first = doc.children(li).first().copied();
        doc.unwrap(li);
        first
    } else {
        doc.rename(li, "p");
        Some(li)
    };
    doc.unwrap(segment);
    first
}

fn switch_list_item(doc: &mut Document, li: NodeId, tag: &str) {
    let Some(list) = doc.parent(li) else {
        return;
    };
    if let Some(segment) = isolate(doc, li, list) {
        doc.rename(segment, tag);
        if let Some(el) = doc.element_mut(segment) {
            el.remove_attr("start");
        }
    }
}

fn wrap_in_list(doc: &mut Document, block: NodeId, tag: &str) {
    let item = match doc.tag(block) {
        Some("p" | "div") => {
            doc.rename(block, "li");
            block
        }
        Some("td" | "th") => {
            let list = doc.create_element(tag);
            let li = doc.create_element("li");
            doc.append_children_from(block, li);
            doc.append_child(list, li);
            doc.append_child(block, list);
            return;
        }
        _ => match doc.wrap(block, Element::new("li")) {
            Some(li) => li,
            None => return,
        },
    };
    match previous_element_sibling(doc, item) {
        Some(prev) if doc.is_tag(prev, tag) => doc.append_child(prev, item),
        _ => {
            doc.wrap(item, Element::new(tag));
        }
    }
}

// === Block commands ===

/// Turn the touched blocks into (or out of) a list of the given kind.
///
/// Blocks already in a list of the other kind switch kind, so a selection is
/// never in both list types at once.
pub fn toggle_list(doc: &mut Document, ordered: bool) -> CommandOutcome {
    let tag = if ordered { "ol" } else { "ul" };
    let blocks = touched_blocks(doc);
    if blocks.is_empty() {
        return CommandOutcome::Unchanged;
    }
    let items: Vec<Option<NodeId>> = blocks.iter().map(|b| list_item(doc, *b)).collect();
    let all_in_list = items.iter().all(|li| {
        li.and_then(|li| doc.parent(li))
            .is_some_and(|list| doc.is_tag(list, tag))
    });
    let mut seen = Vec::new();
    for (block, item) in blocks.into_iter().zip(items) {
        match item {
            Some(li) if seen.contains(&li) => {}
            Some(li) => {
                seen.push(li);
                if all_in_list {
                    lift_list_item(doc, li);
                } else if !doc.parent(li).is_some_and(|list| doc.is_tag(list, tag)) {
                    switch_list_item(doc, li, tag);
                }
            }
            None => wrap_in_list(doc, block, tag),
        }
    }
    tracing::debug!(target: "folio::format", list = tag, off = all_in_list, "toggled list");
    finish(doc)
}

/// Retag the touched blocks. Headings toggle: applying the level every block
/// already has turns them back into paragraphs.
pub fn format_block(doc: &mut Document, format: BlockFormat) -> CommandOutcome {
    let blocks = touched_blocks(doc);
    if blocks.is_empty() {
        return CommandOutcome::Unchanged;
    }
    let target = format.tag();
    let all_target = blocks.iter().all(|b| doc.is_tag(*b, target));
    let tag = match (all_target, format.is_heading()) {
        (true, true) => "p",
        (true, false) => return CommandOutcome::Unchanged,
        (false, _) => target,
    };
    for block in blocks {
        match doc.tag(block) {
            Some("li" | "td" | "th") => {
                let inner = doc.create_element(tag);
                doc.append_children_from(block, inner);
                doc.append_child(block, inner);
            }
            Some(_) if tag == "p" && doc.parent(block).is_some_and(|p| doc.is_tag(p, "li")) => {
                doc.unwrap(block);
            }
            _ => doc.rename(block, tag),
        }
    }
    finish(doc)
}

fn nest_list_item(doc: &mut Document, li: NodeId) -> bool {
    let Some(tag) = doc.parent(li).and_then(|l| doc.tag(l)).map(SmolStr::new) else {
        return false;
    };
    let Some(prev) = previous_element_sibling(doc, li).filter(|p| doc.is_tag(*p, "li")) else {
        return false;
    };
    let last = doc
        .children(prev)
        .iter()
        .rev()
        .copied()
        .find(|c| doc.element(*c).is_some());
    let sublist = match last {
        Some(last) if doc.is_tag(last, &tag) => last,
        _ => {
            let sublist = doc.create_element(&tag);
            doc.append_child(prev, sublist);
            sublist
        }
    };
    doc.append_child(sublist, li);
    true
}

/// Increase nesting: list items move into a sublist of the previous item,
/// other blocks go into a blockquote.
pub fn indent(doc: &mut Document) -> CommandOutcome {
    let blocks = touched_blocks(doc);
    let mut changed = false;
    let mut quotes: Vec<NodeId> = Vec::new();
    let mut seen = Vec::new();
    for block in blocks {
        if let Some(li) = list_item(doc, block) {
            if !seen.contains(&li) {
                seen.push(li);
                changed |= nest_list_item(doc, li);
            }
            continue;
        }
        match previous_element_sibling(doc, block) {
            Some(prev) if quotes.contains(&prev) => doc.append_child(prev, block),
            _ => match doc.wrap(block, Element::new("blockquote")) {
                Some(quote) => quotes.push(quote),
                None => continue,
            },
        }
        changed = true;
    }
    if changed {
        finish(doc)
    } else {
        CommandOutcome::Unchanged
    }
}

fn outdent_list_item(doc: &mut Document, li: NodeId) -> bool {
    let Some(list) = doc.parent(li) else {
        return false;
    };
    let Some(outer) = doc.parent(list).filter(|p| doc.is_tag(*p, "li")) else {
        return lift_list_item(doc, li).is_some();
    };
    let Some(index) = doc.index_in_parent(li) else {
        return false;
    };
    // Following siblings become a sublist of the outdented item.
    if index + 1 < doc.children(list).len() {
        if let Some(rest) = doc.split_element_after(list, index + 1) {
            doc.append_child(li, rest);
        }
    }
    doc.insert_after(outer, li);
    true
}

/// Reverse of [`indent`].
pub fn outdent(doc: &mut Document) -> CommandOutcome {
    let blocks = touched_blocks(doc);
    let mut changed = false;
    let mut seen = Vec::new();
    for block in blocks {
        if let Some(li) = list_item(doc, block) {
            if !seen.contains(&li) {
                seen.push(li);
                changed |= outdent_list_item(doc, li);
            }
            continue;
        }
        let Some(quote) = doc.closest(block, |el| el.tag == "blockquote") else {
            continue;
        };
        if quote == block {
            doc.rename(block, "p");
        } else if let Some(container) = isolate(doc, block, quote) {
            doc.unwrap(container);
        }
        changed = true;
    }
    if changed {
        finish(doc)
    } else {
        CommandOutcome::Unchanged
    }
}

/// Set the alignment of every touched block. Left alignment removes the
/// property unless an enclosing block would otherwise override it.
pub fn justify(doc: &mut Document, alignment: Alignment) -> CommandOutcome {
    let blocks = touched_blocks(doc);
    if blocks.is_empty() {
        return CommandOutcome::Unchanged;
    }
    for block in blocks {
        let inherited = doc
            .ancestors(block)
            .filter_map(|a| doc.element(a))
            .find_map(|el| StyleAttributes::from_decls(&el.style()).alignment);
        let Some(el) = doc.element_mut(block) else {
            continue;
        };
        el.remove_attr("align");
        let mut style = el.style();
        if alignment == Alignment::Left && inherited.is_none_or(|a| a == Alignment::Left) {
            style.remove("text-align");
        } else {
            style.set("text-align", alignment.as_str());
        }
        el.set_style(&style);
    }
    finish(doc)
}

const HEADING_SCALE: [(&str, f32); 6] = [
    ("h1", 2.0),
    ("h2", 1.6),
    ("h3", 1.35),
    ("h4", 1.2),
    ("h5", 1.1),
    ("h6", 1.0),
];

const THEMED_BODY_TAGS: &[&str] = &["p", "li", "blockquote", "code", "pre", "div", "span"];

/// Apply an author theme to the whole document: font family, base size and
/// accent color on body elements, scaled sizes on headings. List items carry
/// the accent so their markers follow it.
pub fn apply_theme(doc: &mut Document, theme: &ThemeSpec) -> CommandOutcome {
    if !is_valid_color(&theme.accent) {
        return CommandOutcome::Rejected(Notice::new(
            NoticeKind::InvalidValue,
            format!("invalid accent color: {}", theme.accent),
        ));
    }
    let base = if theme.base_px.is_finite() && theme.base_px > 0.0 {
        theme.base_px
    } else {
        16.0
    };
    let scale = if theme.heading_scale.is_finite() && theme.heading_scale > 0.0 {
        theme.heading_scale
    } else {
        1.15
    };
    let font = theme
        .font_family
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());
    let root = doc.root();
    let mut changed = false;
    for node in doc.descendants(root) {
        let Some(el) = doc.element_mut(node) else {
            continue;
        };
        let size = match HEADING_SCALE.iter().find(|(tag, _)| el.tag.as_str() == *tag) {
            Some((_, mult)) => (base * mult * scale).round(),
            None if THEMED_BODY_TAGS.contains(&el.tag.as_str()) => base.round(),
            None => continue,
        };
        let mut style = el.style();
        if let Some(font) = font {
            style.set("font-family", font);
        }
        style.set("font-size", format!("{size}px"));
        style.set("color", theme.accent.as_str());
        el.set_style(&style);
        changed = true;
    }
    if changed {
        finish(doc)
    } else {
        CommandOutcome::Unchanged
    }
}

// === Read-back ===

fn font_color(el: &Element) -> Option<String> {
    (el.tag == "font")
        .then(|| el.attr("color").map(str::to_string))
        .flatten()
}

/// Style in effect at a node: the nearest declaration of each property among
/// its inclusive ancestors, with formatting tags standing in for weights and
/// decorations.
pub fn resolved_style(doc: &Document, id: NodeId) -> StyleAttributes {
    let mut out = StyleAttributes::default();
    for node in std::iter::once(id).chain(doc.ancestors(id)) {
        let Some(el) = doc.element(node) else {
            continue;
        };
        let own = StyleAttributes::from_decls(&el.style());
        let tag = el.tag.as_str();
        out.color = out.color.or(own.color).or_else(|| font_color(el));
        out.background = out.background.or(own.background);
        out.alignment = out.alignment.or(own.alignment);
        out.bold = out
            .bold
            .or(own.bold)
            .or_else(|| InlineFormat::Bold.tags().contains(&tag).then_some(true));
        out.italic = out
            .italic
            .or(own.italic)
            .or_else(|| InlineFormat::Italic.tags().contains(&tag).then_some(true));
        out.underline = out
            .underline
            .or(own.underline)
            .or_else(|| InlineFormat::Underline.tags().contains(&tag).then_some(true));
        out.strikethrough = out
            .strikethrough
            .or(own.strikethrough)
            .or_else(|| InlineFormat::StrikeThrough.tags().contains(&tag).then_some(true));
        out.font_family = out.font_family.or(own.font_family);
        out.font_size = out.font_size.or(own.font_size);
    }
    out
}

/// Formatting active at the current selection.
pub fn format_state(doc: &Document) -> FormatState {
    let Some(range) = doc.selection() else {
        return FormatState::default();
    };
    let leaves = if range.is_collapsed() {
        text_caret(doc, range.start)
            .map(|b| vec![b.node])
            .unwrap_or_default()
    } else {
        intersecting_texts(doc, range)
    };
    let anchor = leaves.first().copied().unwrap_or(range.start.node);
    let all = |format: InlineFormat| {
        !leaves.is_empty() && leaves.iter().all(|t| has_inline(doc, *t, format))
    };
    let block = doc
        .block_ancestor(anchor)
        .or_else(|| caret_block(doc, range.start));
    let list = doc
        .closest(anchor, |el| el.tag == "li")
        .and_then(|li| doc.parent(li))
        .and_then(|l| doc.tag(l));
    let alignment = block
        .and_then(|b| {
            std::iter::once(b)
                .chain(doc.ancestors(b))
                .filter_map(|n| doc.element(n))
                .find_map(|el| StyleAttributes::from_decls(&el.style()).alignment)
        })
        .unwrap_or_default();
    let link = doc
        .closest(anchor, |el| el.tag == "a")
        .and_then(|a| doc.element(a))
        .and_then(|el| el.attr("href"))
        .map(str::to_string);
    FormatState {
        bold: all(InlineFormat::Bold),
        italic: all(InlineFormat::Italic),
        underline: all(InlineFormat::Underline),
        strike_through: all(InlineFormat::StrikeThrough),
        unordered_list: list == Some("ul"),
        ordered_list: list == Some("ol"),
        alignment,
        block: block
            .and_then(|b| doc.tag(b))
            .map(SmolStr::new)
            .unwrap_or_default(),
        link,
        color: resolved_style(doc, anchor).color,
    }
}

/// Heading level of a block tag.
pub fn heading_level(tag: &str) -> Option<u8> {
    is_heading(tag)
        .then(|| tag[1..].parse().ok())
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;
    use crate::selection::select_chars;

    fn doc(markup: &str) -> Document {
        html::parse_fragment(markup, usize::MAX).expect("parse")
    }

    fn body(doc: &Document) -> String {
        html::to_html(doc, doc.root())
    }

    #[test]
    fn test_bold_wraps_selection() {
        let mut d = doc("<p>Hello world</p>");
        select_chars(&mut d, 0, 5);
        assert_eq!(toggle_inline(&mut d, InlineFormat::Bold), CommandOutcome::Applied);
        assert_eq!(body(&d), "<p><b>Hello</b> world</p>");
        assert_eq!(d.selection().map(|s| s.char_range(&d)), Some((0, 5)));
    }

    #[test]
    fn test_bold_toggles_off_middle_of_run() {
        let mut d = doc("<p><b>Hello</b></p>");
        select_chars(&mut d, 1, 4);
        toggle_inline(&mut d, InlineFormat::Bold);
        assert_eq!(body(&d), "<p><b>H</b>ell<b>o</b></p>");
    }

    #[test]
    fn test_toggle_off_style_based_bold() {
        let mut d = doc(r#"<p><span style="font-weight: bold; color: red">Hi</span></p>"#);
        select_chars(&mut d, 0, 2);
        toggle_inline(&mut d, InlineFormat::Bold);
        assert_eq!(body(&d), r#"<p><span style="color: red">Hi</span></p>"#);
    }

    #[test]
    fn test_caret_widens_to_word() {
        let mut d = doc("<p>one two</p>");
        select_chars(&mut d, 5, 5);
        toggle_inline(&mut d, InlineFormat::Italic);
        assert_eq!(body(&d), "<p>one <i>two</i></p>");
    }

    #[test]
    fn test_caret_without_word_is_unchanged() {
        let mut d = doc("<p>a  b</p>");
        select_chars(&mut d, 2, 2);
        assert_eq!(
            toggle_inline(&mut d, InlineFormat::Bold),
            CommandOutcome::Unchanged
        );
        assert_eq!(body(&d), "<p>a  b</p>");
    }

    #[test]
    fn test_fore_color_syncs_list_markers() {
        let mut d = doc("<ul><li>one</li><li>two</li></ul>");
        select_chars(&mut d, 1, 5);
        fore_color(&mut d, "#ff0000");
        let root = d.root();
        let items: Vec<NodeId> = d
            .descendants(root)
            .into_iter()
            .filter(|n| d.is_tag(*n, "li"))
            .collect();
        assert_eq!(items.len(), 2);
        for li in items {
            assert_eq!(resolved_style(&d, li).color.as_deref(), Some("#ff0000"));
        }
    }

    #[test]
    fn test_remove_color_keeps_bold() {
        let mut d = doc(r#"<p><span style="color: red"><b>Hi</b></span></p>"#);
        select_chars(&mut d, 0, 2);
        remove_color(&mut d);
        assert_eq!(body(&d), "<p><b>Hi</b></p>");
    }

    #[test]
    fn test_remove_highlight_unwraps_mark() {
        let mut d = doc(r#"<p><mark>a</mark><span style="background-color: yellow; color: red">b</span></p>"#);
        select_chars(&mut d, 0, 2);
        remove_highlight(&mut d);
        assert_eq!(body(&d), r#"<p>a<span style="color: red">b</span></p>"#);
    }

    #[test]
    fn test_remove_format_keeps_links() {
        let mut d = doc(r#"<p><a href="https://a.example"><b><i>x</i></b></a></p>"#);
        select_chars(&mut d, 0, 1);
        remove_format(&mut d);
        assert_eq!(body(&d), r#"<p><a href="https://a.example">x</a></p>"#);
    }

    #[test]
    fn test_create_link_rejects_invalid_url() {
        let mut d = doc("<p>Hello</p>");
        select_chars(&mut d, 0, 5);
        let outcome = create_link(&mut d, "not a url");
        assert!(matches!(
            outcome,
            CommandOutcome::Rejected(Notice {
                kind: NoticeKind::InvalidLink,
                ..
            })
        ));
        assert_eq!(body(&d), "<p>Hello</p>");
        assert!(validate_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_create_and_remove_link() {
        let mut d = doc("<p>see docs</p>");
        select_chars(&mut d, 4, 8);
        create_link(&mut d, "https://docs.rs");
        assert_eq!(body(&d), r#"<p>see <a href="https://docs.rs">docs</a></p>"#);
        select_chars(&mut d, 5, 5);
        unlink(&mut d);
        assert_eq!(body(&d), "<p>see docs</p>");
    }

    #[test]
    fn test_heading_toggle() {
        let mut d = doc("<p>Title</p>");
        select_chars(&mut d, 0, 5);
        format_block(&mut d, BlockFormat::Heading(2));
        assert_eq!(body(&d), "<h2>Title</h2>");
        format_block(&mut d, BlockFormat::Heading(2));
        assert_eq!(body(&d), "<p>Title</p>");
    }

    #[test]
    fn test_format_block_wraps_root_text() {
        let mut d = doc("loose <b>text</b>");
        select_chars(&mut d, 2, 2);
        format_block(&mut d, BlockFormat::Heading(1));
        assert_eq!(body(&d), "<h1>loose <b>text</b></h1>");
    }

    #[test]
    fn test_list_toggle_on_and_off() {
        let mut d = doc("<p>a</p><p>b</p>");
        select_chars(&mut d, 0, 2);
        toggle_list(&mut d, false);
        assert_eq!(body(&d), "<ul><li>a</li><li>b</li></ul>");
        toggle_list(&mut d, false);
        assert_eq!(body(&d), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_list_switch_kind() {
        let mut d = doc("<ul><li>a</li><li>b</li><li>c</li></ul>");
        select_chars(&mut d, 2, 2);
        toggle_list(&mut d, true);
        assert_eq!(
            body(&d),
            "<ul><li>a</li></ul><ol><li>b</li></ol><ul><li>c</li></ul>"
        );
        let state = format_state(&d);
        assert!(state.ordered_list);
        assert!(!state.unordered_list);
    }

    #[test]
    fn test_indent_and_outdent_list_item() {
        let mut d = doc("<ul><li>a</li><li>b</li></ul>");
        select_chars(&mut d, 2, 2);
        indent(&mut d);
        assert_eq!(body(&d), "<ul><li>a<ul><li>b</li></ul></li></ul>");
        outdent(&mut d);
        assert_eq!(body(&d), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_indent_paragraph_into_blockquote() {
        let mut d = doc("<p>a</p><p>b</p>");
        select_chars(&mut d, 0, 2);
        indent(&mut d);
        assert_eq!(body(&d), "<blockquote><p>a</p><p>b</p></blockquote>");
        outdent(&mut d);
        assert_eq!(body(&d), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_justify_sets_and_clears_alignment() {
        let mut d = doc("<p>a</p>");
        select_chars(&mut d, 0, 1);
        justify(&mut d, Alignment::Center);
        assert_eq!(body(&d), r#"<p style="text-align: center">a</p>"#);
        assert_eq!(format_state(&d).alignment, Alignment::Center);
        justify(&mut d, Alignment::Left);
        assert_eq!(body(&d), "<p>a</p>");
    }

    #[test]
    fn test_apply_theme_scales_headings() {
        let mut d = doc("<h1>T</h1><ul><li>x</li></ul>");
        let theme = ThemeSpec {
            accent: "#112233".into(),
            font_family: Some("Georgia".into()),
            base_px: 16.0,
            heading_scale: 1.0,
        };
        apply_theme(&mut d, &theme);
        assert_eq!(
            body(&d),
            concat!(
                r#"<h1 style="font-family: Georgia; font-size: 32px; color: #112233">T</h1>"#,
                r#"<ul><li style="font-family: Georgia; font-size: 16px; color: #112233">x</li></ul>"#,
            )
        );
    }

    #[test]
    fn test_format_state_reports_inline_and_block() {
        let mut d = doc(r#"<h3><b><a href="https://x.example">bold</a></b></h3>"#);
        select_chars(&mut d, 1, 3);
        let state = format_state(&d);
        assert!(state.bold);
        assert!(!state.italic);
        assert_eq!(state.block, "h3");
        assert_eq!(state.link.as_deref(), Some("https://x.example"));
        assert_eq!(heading_level(&state.block), Some(3));
    }
}
