//! Markup sanitizer.
//!
//! Two passes share one tree walk:
//! - [`sanitize`] normalizes pasted or persisted markup into the editor's
//!   subset, stripping the style categories selected by [`SanitizeOptions`].
//! - [`sanitize_for_display`] applies a strict tag and attribute allow-list to
//!   untrusted markup before it is shown.
//!
//! Neither pass fails. When the markup cannot be read into a tree, a pattern
//! based fallback strips what it can from the raw string.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeData, NodeId, is_block};
use crate::error::ParseError;
use crate::html;
use crate::style::{
    Alignment, StyleDecls, is_font_property, is_highlight_property, is_shadow_property, is_white,
};
use crate::text_helpers::slugify;

/// Default input limit for a single sanitize call.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 2 * 1024 * 1024;

/// Style categories to strip. Unset categories pass through unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeOptions {
    /// `background`, `background-color`, `background-image`, `mark`, `bgcolor`.
    pub strip_highlight: bool,
    /// `text-shadow`, `box-shadow`, `filter`.
    pub strip_shadows: bool,
    /// `font-family`, `font`, `font-size`.
    pub strip_fonts: bool,
    /// `color` declarations that resolve to white.
    pub strip_white_text: bool,
}

impl SanitizeOptions {
    pub const fn none() -> Self {
        Self {
            strip_highlight: false,
            strip_shadows: false,
            strip_fonts: false,
            strip_white_text: false,
        }
    }

    /// Clipboard profile: every category stripped except white text.
    pub const fn paste() -> Self {
        Self {
            strip_highlight: true,
            strip_shadows: true,
            strip_fonts: true,
            strip_white_text: false,
        }
    }

    /// Persisted-content profile.
    pub const fn load() -> Self {
        Self {
            strip_highlight: true,
            strip_shadows: false,
            strip_fonts: false,
            strip_white_text: false,
        }
    }

    pub const fn with_white_text(mut self) -> Self {
        self.strip_white_text = true;
        self
    }

    fn strips(&self, property: &str) -> bool {
        (self.strip_highlight && is_highlight_property(property))
            || (self.strip_shadows && is_shadow_property(property))
            || (self.strip_fonts && is_font_property(property))
    }
}

/// Elements dropped together with their content.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "head", "title", "meta", "link", "template", "iframe", "object", "embed",
    "noscript",
];

/// Tags the editor keeps after sanitizing.
const EDITOR_TAGS: &[&str] = &[
    "p", "br", "div", "span", "b", "strong", "i", "em", "u", "s", "strike", "del", "sub", "sup",
    "a", "ul", "ol", "li", "blockquote", "pre", "code", "h1", "h2", "h3", "h4", "h5", "h6", "mark",
    "hr", "table", "thead", "tbody", "tfoot", "tr", "td", "th",
];

/// Tags kept for display.
const DISPLAY_TAGS: &[&str] = &[
    "a", "b", "strong", "i", "em", "u", "ul", "ol", "li", "br", "p", "span", "div", "blockquote",
    "code", "mark", "font",
];

const EDITOR_ATTRS: &[&str] = &[
    "style", "href", "title", "target", "rel", "id", "colspan", "rowspan", "start",
];

fn display_attrs(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "title"],
        "font" => &["color"],
        "ol" => &["start", "style"],
        "span" | "p" | "div" | "li" | "ul" | "blockquote" | "mark" => &["style"],
        _ => &[],
    }
}

/// Style properties kept for display.
const DISPLAY_STYLE_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "text-align",
    "font-weight",
    "font-style",
    "text-decoration",
    "margin-left",
];

fn is_unsafe_url(href: &str) -> bool {
    let compact: String = href
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:") || compact.starts_with("data:")
}

/// Sanitize markup with the default input limit.
pub fn sanitize(raw: &str, options: &SanitizeOptions) -> String {
    sanitize_with_limit(raw, options, DEFAULT_MAX_INPUT_BYTES)
}

/// Sanitize markup, falling back to pattern stripping if it cannot be parsed.
pub fn sanitize_with_limit(raw: &str, options: &SanitizeOptions, max_bytes: usize) -> String {
    match try_sanitize(raw, options, max_bytes) {
        Ok(clean) => clean,
        Err(error) => {
            tracing::warn!(
                target: "folio::sanitize",
                %error,
                len = raw.len(),
                "tree sanitize failed, using pattern fallback"
            );
            fallback_sanitize(raw, options)
        }
    }
}

fn try_sanitize(
    raw: &str,
    options: &SanitizeOptions,
    max_bytes: usize,
) -> Result<String, ParseError> {
    let mut doc = html::parse_fragment(raw, max_bytes)?;
    let root = doc.root();
    sanitize_tree(&mut doc, root, options);
    Ok(html::to_html(&doc, root))
}

/// Sanitize the children of `parent` in place.
pub fn sanitize_tree(doc: &mut Document, parent: NodeId, options: &SanitizeOptions) {
    for child in doc.children(parent).to_vec() {
        sanitize_node(doc, child, options);
    }
}

fn sanitize_node(doc: &mut Document, id: NodeId, options: &SanitizeOptions) {
    let Some(tag) = doc.tag(id).map(str::to_string) else {
        return;
    };
    if DROPPED_TAGS.contains(&tag.as_str()) {
        doc.remove(id);
        return;
    }
    sanitize_tree(doc, id, options);

    match tag.as_str() {
        "mark" if options.strip_highlight => {
            doc.unwrap(id);
        }
        "font" => convert_font(doc, id, options),
        t if !EDITOR_TAGS.contains(&t) => {
            doc.unwrap(id);
        }
        _ => clean_attributes(doc, id, options),
    }
}

/// `<font color face>` becomes a styled `span`; a bare `font` is unwrapped.
fn convert_font(doc: &mut Document, id: NodeId, options: &SanitizeOptions) {
    let Some(el) = doc.element_mut(id) else {
        return;
    };
    let mut style = el.style();
    if let Some(color) = el.remove_attr("color").filter(|c| !c.trim().is_empty()) {
        style.set("color", color.trim());
    }
    if let Some(face) = el.remove_attr("face").filter(|f| !f.trim().is_empty()) {
        style.set("font-family", face.trim());
    }
    let keep_style = {
        prune_style(&mut style, options);
        !style.is_empty()
    };
    if keep_style {
        el.tag = "span".into();
        el.attrs.clear();
        el.set_style(&style);
    } else {
        doc.unwrap(id);
    }
}

fn clean_attributes(doc: &mut Document, id: NodeId, options: &SanitizeOptions) {
    let Some(el) = doc.element_mut(id) else {
        return;
    };
    let legacy_align = el.remove_attr("align").and_then(|a| Alignment::parse(&a));
    let bgcolor = el.remove_attr("bgcolor");
    let is_cell = matches!(el.tag.as_str(), "td" | "th" | "table" | "tr");
    el.attrs.retain(|attr| {
        let name = attr.name.as_str();
        !name.starts_with("on") && EDITOR_ATTRS.contains(&name)
    });
    if el.attr("href").is_some_and(is_unsafe_url) {
        el.remove_attr("href");
    }
    let mut style = el.style();
    if let Some(align) = legacy_align {
        if style.get("text-align").is_none() {
            style.set("text-align", align.as_str());
        }
    }
    if let Some(bg) = bgcolor.filter(|_| is_cell && !options.strip_highlight) {
        if style.get("background-color").is_none() {
            style.set("background-color", bg);
        }
    }
    prune_style(&mut style, options);
    el.set_style(&style);
}

fn prune_style(style: &mut StyleDecls, options: &SanitizeOptions) {
    style.retain(|name, value| {
        if options.strips(name) {
            return false;
        }
        if name == "text-align" {
            return Alignment::parse(value).is_some_and(|a| a.as_str() == value.trim());
        }
        if options.strip_white_text && name == "color" && is_white(value) {
            return false;
        }
        !value.to_ascii_lowercase().contains("expression(")
    });
}

/// Apply the display allow-list to untrusted markup.
pub fn sanitize_for_display(raw: &str) -> String {
    match html::parse_fragment(raw, DEFAULT_MAX_INPUT_BYTES) {
        Ok(mut doc) => {
            let root = doc.root();
            display_tree(&mut doc, root);
            html::to_html(&doc, root)
        }
        Err(error) => {
            tracing::warn!(target: "folio::sanitize", %error, "display sanitize fell back to patterns");
            fallback_display(raw)
        }
    }
}

fn display_tree(doc: &mut Document, parent: NodeId) {
    for child in doc.children(parent).to_vec() {
        let Some(tag) = doc.tag(child).map(str::to_string) else {
            continue;
        };
        if DROPPED_TAGS.contains(&tag.as_str()) {
            doc.remove(child);
            continue;
        }
        display_tree(doc, child);
        if !DISPLAY_TAGS.contains(&tag.as_str()) {
            doc.unwrap(child);
            continue;
        }
        let Some(el) = doc.element_mut(child) else {
            continue;
        };
        let allowed = display_attrs(&tag);
        el.attrs.retain(|a| allowed.contains(&a.name.as_str()));
        if el.attr("href").is_some_and(is_unsafe_url) {
            el.remove_attr("href");
        }
        if el.has_attr("style") {
            let mut style = el.style();
            style.retain(|name, value| {
                DISPLAY_STYLE_PROPERTIES.contains(&name)
                    && !value.to_ascii_lowercase().contains("url(")
                    && !value.to_ascii_lowercase().contains("expression(")
            });
            el.set_style(&style);
        }
        if tag == "a" {
            el.set_attr("target", "_blank");
            el.set_attr("rel", "noopener noreferrer");
        }
    }
}

// === Pattern fallback ===

static MARK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?mark\b[^>]*>").expect("mark tag regex"));
static BGCOLOR_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+bgcolor\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("bgcolor regex")
});
static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+style\s*=\s*("([^"]*)"|'([^']*)')"#).expect("style attribute regex")
});
static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<(?:script|style|iframe|object|embed|noscript|template|title)\b[^>]*>.*?</(?:script|style|iframe|object|embed|noscript|template|title)\s*>",
    )
    .expect("script block regex")
});
static DROPPED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:script|style|iframe|object|embed|noscript|template|title|head|meta|link)\b[^>]*>",
    )
    .expect("dropped tag regex")
});
static EVENT_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("event attribute regex")
});
static SCRIPT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(javascript|vbscript)\s*:").expect("script url regex"));
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?([a-z][a-z0-9]*)\b[^>]*>").expect("tag regex"));

/// Best-effort stripping of the enabled categories straight from the string.
///
/// Script-carrying elements, event handlers and script URLs are always
/// removed, whatever the options.
pub fn fallback_sanitize(raw: &str, options: &SanitizeOptions) -> String {
    let mut out = strip_active_content(raw);
    if options.strip_highlight {
        out = MARK_TAG.replace_all(&out, "").into_owned();
        out = BGCOLOR_ATTR.replace_all(&out, "").into_owned();
    }
    STYLE_ATTR
        .replace_all(&out, |caps: &Captures<'_>| {
            let body = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let mut style = StyleDecls::parse(body);
            prune_style(&mut style, options);
            if style.is_empty() {
                String::new()
            } else {
                format!(" style=\"{}\"", style.to_string().replace('"', "'"))
            }
        })
        .into_owned()
}

fn strip_active_content(raw: &str) -> String {
    let out = SCRIPT_BLOCK.replace_all(raw, "");
    let out = DROPPED_TAG.replace_all(&out, "");
    let out = EVENT_ATTR.replace_all(&out, "");
    SCRIPT_URL.replace_all(&out, "").into_owned()
}

/// Pattern fallback for [`sanitize_for_display`].
pub fn fallback_display(raw: &str) -> String {
    let out = strip_active_content(raw);
    ANY_TAG
        .replace_all(&out, |caps: &Captures<'_>| {
            let tag = caps
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default();
            if DISPLAY_TAGS.contains(&tag.as_str()) {
                caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default()
            } else {
                String::new()
            }
        })
        .into_owned()
}

// === Text utilities ===

/// Text content with block boundaries and `<br>` mapped to newlines.
pub fn plain_text(raw: &str) -> String {
    let Ok(doc) = html::parse_fragment(raw, DEFAULT_MAX_INPUT_BYTES) else {
        let stripped = ANY_TAG.replace_all(raw, " ");
        return html::decode_entities(stripped.trim());
    };
    let mut out = String::new();
    collect_text(&doc, doc.root(), &mut out);
    out.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(doc: &Document, id: NodeId, out: &mut String) {
    for child in doc.children(id) {
        match doc.data(*child) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element(el)) if el.tag == "br" => out.push('\n'),
            Some(NodeData::Element(el)) if DROPPED_TAGS.contains(&el.tag.as_str()) => {}
            Some(NodeData::Element(el)) => {
                let block = is_block(&el.tag);
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                collect_text(doc, *child, out);
                if block && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

pub fn word_count(raw: &str) -> usize {
    plain_text(raw).split_whitespace().count()
}

static ALIGN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[a-zA-Z0-9_-]+)?:::\s*align-(left|center|right|justify)")
        .expect("align prefix regex")
});
static ALIGN_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s):::align-(left|center|right|justify)\s*\n(.*?)\n:::[ \t]*\n?")
        .expect("align block regex")
});
static ALIGN_INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":::align-(left|center|right|justify)[ \t]+([^\n]+)(?:\n|$)")
        .expect("align inline regex")
});
static ALIGN_STRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s):::($|\s)").expect("stray marker regex"));

/// Convert legacy `:::align-x` markers into aligned `div`s.
pub fn normalize_alignment_markers(text: &str) -> String {
    if !text.contains(":::") {
        return text.to_string();
    }
    let out = ALIGN_PREFIX.replace_all(text, ":::align-${1}");
    let out = ALIGN_BLOCK.replace_all(&out, "<div style=\"text-align: ${1}\">${2}</div>\n");
    let out = ALIGN_INLINE.replace_all(&out, "<div style=\"text-align: ${1}\">${2}</div>\n");
    ALIGN_STRAY.replace_all(&out, " ").into_owned()
}

/// One heading in a table of contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// Give every heading a unique slug id and list them in document order.
pub fn heading_anchors(raw: &str) -> (String, Vec<TocEntry>) {
    let Ok(mut doc) = html::parse_fragment(raw, DEFAULT_MAX_INPUT_BYTES) else {
        return (raw.to_string(), Vec::new());
    };
    let root = doc.root();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut toc = Vec::new();
    for (i, node) in doc
        .descendants(root)
        .into_iter()
        .filter(|n| doc.tag(*n).is_some_and(crate::dom::is_heading))
        .enumerate()
    {
        let text = doc.text_content(node).trim().to_string();
        let level = doc
            .tag(node)
            .and_then(|t| t[1..].parse::<u8>().ok())
            .unwrap_or(1);
        let mut base = slugify(&text);
        if base.is_empty() {
            base = format!("heading-{i}");
        }
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        let id = if *count == 1 {
            base
        } else {
            format!("{base}-{count}")
        };
        if let Some(el) = doc.element_mut(node) {
            el.set_attr("id", id.clone());
        }
        toc.push(TocEntry { id, text, level });
    }
    (html::to_html(&doc, root), toc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text_len(markup: &str) -> usize {
        let doc = html::parse_fragment(markup, usize::MAX).expect("parse");
        doc.text_content(doc.root()).chars().count()
    }

    #[test]
    fn test_scenario_pasted_highlight() {
        let out = sanitize(
            "<div style=\"background:yellow;color:red\">Hi</div>",
            &SanitizeOptions::paste(),
        );
        assert_eq!(out, "<div style=\"color: red\">Hi</div>");
        assert!(!out.contains("background"));
    }

    #[test]
    fn test_unset_categories_pass_through() {
        let raw = "<span style=\"background-color: yellow; text-shadow: 1px 1px red\">x</span>";
        assert_eq!(
            sanitize(raw, &SanitizeOptions::none()),
            "<span style=\"background-color: yellow; text-shadow: 1px 1px red\">x</span>"
        );
        assert_eq!(
            sanitize(
                raw,
                &SanitizeOptions {
                    strip_shadows: true,
                    ..SanitizeOptions::none()
                }
            ),
            "<span style=\"background-color: yellow\">x</span>"
        );
    }

    #[test]
    fn test_mark_unwrapped_only_when_stripping_highlight() {
        assert_eq!(
            sanitize("<p>a <mark>b</mark> c</p>", &SanitizeOptions::load()),
            "<p>a b c</p>"
        );
        assert_eq!(
            sanitize("<p><mark>b</mark></p>", &SanitizeOptions::none()),
            "<p><mark>b</mark></p>"
        );
    }

    #[test]
    fn test_font_conversion() {
        let opts = SanitizeOptions::none();
        assert_eq!(
            sanitize("<font color=\"#f00\" face=\"Arial\">x</font>", &opts),
            "<span style=\"color: #f00; font-family: Arial\">x</span>"
        );
        assert_eq!(
            sanitize("<font face=\"Arial\">x</font>", &SanitizeOptions::paste()),
            "x"
        );
        assert_eq!(sanitize("<font>x</font>", &opts), "x");
    }

    #[test]
    fn test_dangerous_content_removed() {
        let out = sanitize(
            "<p onclick=\"x()\" dir=\"rtl\">a<script>alert(1)</script><a href=\"javascript:alert(1)\">b</a></p>",
            &SanitizeOptions::paste(),
        );
        assert_eq!(out, "<p>a<a>b</a></p>");
    }

    #[test]
    fn test_unknown_tags_unwrapped() {
        assert_eq!(
            sanitize("<section><article><p>keep <o:p>me</o:p></p></article></section>", &SanitizeOptions::paste()),
            "<p>keep me</p>"
        );
    }

    #[test]
    fn test_alignment_rules() {
        assert_eq!(
            sanitize("<p align=\"center\">a</p><p style=\"text-align: -webkit-center\">b</p>", &SanitizeOptions::paste()),
            "<p style=\"text-align: center\">a</p><p>b</p>"
        );
    }

    #[test]
    fn test_white_text_profile() {
        let opts = SanitizeOptions::paste().with_white_text();
        assert_eq!(
            sanitize("<span style=\"color: #FFFFFF\">ghost</span><span style=\"color: #333\">ok</span>", &opts),
            "<span>ghost</span><span style=\"color: #333\">ok</span>"
        );
    }

    #[test]
    fn test_display_allow_list() {
        let out = sanitize_for_display(
            "<h2 id=\"t\">Title</h2><a href=\"https://example.com\" onclick=\"x\">go</a><img src=x onerror=y><font color=\"red\" size=\"3\">c</font>",
        );
        insta::assert_snapshot!(out, @r#"Title<a href="https://example.com" target="_blank" rel="noopener noreferrer">go</a><font color="red">c</font>"#);
    }

    #[test]
    fn test_parse_failure_uses_fallback() {
        let deep = format!(
            "{}<span style=\"color: red; background: yellow\">x</span><mark>y</mark>",
            "<div>".repeat(300)
        );
        let out = sanitize(&deep, &SanitizeOptions::paste());
        assert!(!out.contains("background"));
        assert!(!out.contains("<mark>"));
        assert!(out.contains("style=\"color: red\""));
    }

    #[test]
    fn test_fallback_display_strips_scripts() {
        let out = fallback_display("<p onclick='x'>a<script>bad()</script><iframe src=x></iframe><b>b</b></p>");
        assert_eq!(out, "<p>a<b>b</b></p>");
    }

    #[test]
    fn test_form_and_svg_content_is_unwrapped() {
        let out = sanitize(
            "<p>Buy <button>now</button> or <svg><text>later</text></svg></p><textarea>note</textarea>",
            &SanitizeOptions::paste(),
        );
        assert!(out.starts_with("<p>Buy now or later</p>"));
        assert!(out.contains("note"));
        assert!(!out.contains("<button"));
        assert!(!out.contains("<svg"));
        let shown = sanitize_for_display("<select><option>one</option></select><math>x</math>");
        assert_eq!(shown, "onex");
    }

    #[test]
    fn test_fallback_always_strips_active_content() {
        let raw = "<p onclick=\"steal()\">x<script>steal()</script><iframe src=\"https://evil\"></iframe><a href=\"javascript:steal()\">y</a></p>";
        let out = sanitize_with_limit(raw, &SanitizeOptions::none(), 16);
        assert!(!out.contains("<script"));
        assert!(!out.contains("<iframe"));
        assert!(!out.contains("onclick"));
        assert!(!out.to_ascii_lowercase().contains("javascript:"));
        assert!(out.contains('x') && out.contains('y'));
    }

    #[test]
    fn test_plain_text_and_word_count() {
        let raw = "<h1>Title</h1><p>one two<br>three</p><ul><li>four</li></ul>";
        assert_eq!(plain_text(raw), "Title\none two\nthree\nfour");
        assert_eq!(word_count(raw), 5);
    }

    #[test]
    fn test_alignment_markers() {
        assert_eq!(
            normalize_alignment_markers("p:::align-center\nHello\n:::\n"),
            "<div style=\"text-align: center\">Hello</div>\n"
        );
        assert_eq!(
            normalize_alignment_markers(":::align-right Signed"),
            "<div style=\"text-align: right\">Signed</div>\n"
        );
        assert_eq!(normalize_alignment_markers("plain"), "plain");
    }

    #[test]
    fn test_heading_anchors() {
        let (out, toc) = heading_anchors("<h1>Intro</h1><p>x</p><h2>Intro</h2><h3>!!</h3>");
        assert_eq!(
            out,
            "<h1 id=\"intro\">Intro</h1><p>x</p><h2 id=\"intro-2\">Intro</h2><h3 id=\"heading-2\">!!</h3>"
        );
        assert_eq!(toc.len(), 3);
        assert_eq!(toc[1].level, 2);
        assert_eq!(toc[1].id, "intro-2");
    }

    fn arbitrary_markup() -> impl Strategy<Value = String> {
        let tag = prop::sample::select(vec![
            "p", "div", "span", "b", "mark", "font", "section", "o:p", "li", "h2", "custom-el",
            "button", "select", "svg", "math",
        ]);
        let style = prop::sample::select(vec![
            "",
            " style=\"color: red\"",
            " style=\"background: yellow; font-size: 20px\"",
            " style=\"text-shadow: 1px 1px #000\"",
            " color=\"blue\"",
        ]);
        let text = "[a-zA-Z &<>]{0,8}";
        prop::collection::vec((tag, style, text), 0..8).prop_map(|parts| {
            let mut out = String::new();
            for (tag, style, text) in &parts {
                out.push_str(&format!("<{tag}{style}>{}", html::escape_text(text)));
            }
            for (tag, _, _) in parts.iter().rev() {
                out.push_str(&format!("</{tag}>"));
            }
            out
        })
    }

    proptest! {
        #[test]
        fn sanitize_preserves_text_and_allow_list(markup in arbitrary_markup()) {
            let before = text_len(&markup);
            let clean = sanitize(&markup, &SanitizeOptions::paste());
            prop_assert_eq!(text_len(&clean), before);
            let doc = html::parse_fragment(&clean, usize::MAX).expect("parse");
            for node in doc.descendants(doc.root()) {
                if let Some(tag) = doc.tag(node) {
                    prop_assert!(EDITOR_TAGS.contains(&tag), "tag {} survived", tag);
                    prop_assert!(tag != "mark");
                }
            }
            prop_assert!(!clean.contains("background"));
            prop_assert!(!clean.contains("font-size"));
        }

        #[test]
        fn display_sanitize_preserves_text(markup in arbitrary_markup()) {
            let before = text_len(&markup);
            let clean = sanitize_for_display(&markup);
            prop_assert_eq!(text_len(&clean), before);
        }
    }
}
