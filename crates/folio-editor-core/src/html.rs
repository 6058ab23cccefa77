//! Markup reader and writer.
//!
//! The reader is a forgiving tokenizer plus tree builder covering what
//! clipboards and stored rich text actually contain: tags with quoted or bare
//! attributes, comments, doctype, raw-text elements and character references.
//! Anything it cannot make sense of is kept as text. Input size and nesting
//! depth are bounded so callers can fall back when either is exceeded.

use std::fmt;

use markdown_weaver_escape::{StrWrite, escape_html, escape_html_body_text};

use crate::dom::{Attr, Document, Element, NodeData, NodeId, is_block, is_void};
use crate::error::ParseError;

/// Deepest element nesting the reader accepts.
pub const MAX_DEPTH: usize = 256;

/// Parse a fragment into a fresh document.
pub fn parse_fragment(input: &str, max_bytes: usize) -> Result<Document, ParseError> {
    let mut doc = Document::new();
    let root = doc.root();
    parse_into(&mut doc, root, input, max_bytes)?;
    Ok(doc)
}

/// Parse a fragment and append the result under `parent`.
///
/// On error nothing is attached.
pub fn parse_into(
    doc: &mut Document,
    parent: NodeId,
    input: &str,
    max_bytes: usize,
) -> Result<(), ParseError> {
    if input.len() > max_bytes {
        return Err(ParseError::TooLarge {
            len: input.len(),
            limit: max_bytes,
        });
    }
    let mut scratch = Document::new();
    let scratch_root = scratch.root();
    TreeBuilder::new(&mut scratch).run(Tokenizer::new(input))?;
    for child in scratch.children(scratch_root).to_vec() {
        if let Some(copy) = doc.import(&scratch, child) {
            doc.append_child(parent, copy);
        }
    }
    Ok(())
}

// === Tokenizer ===

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    StartTag {
        name: String,
        attrs: Vec<Attr>,
        self_closing: bool,
    },
    EndTag(String),
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    raw_text_end: Option<String>,
}

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            raw_text_end: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_past(&mut self, pat: &str) {
        match self.rest().find(pat) {
            Some(i) => self.pos += i + pat.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn raw_text(&mut self, tag: &str) -> Token {
        let rest = self.rest();
        let needle = format!("</{tag}");
        let end = rest
            .to_ascii_lowercase()
            .find(&needle)
            .unwrap_or(rest.len());
        let text = &rest[..end];
        self.pos += end;
        if tag == "textarea" || tag == "title" {
            Token::Text(decode_entities(text))
        } else {
            Token::Text(text.to_string())
        }
    }

    fn tag_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_ascii_lowercase()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
        self.pos += rest.len() - trimmed.len();
    }

    fn start_tag(&mut self) -> Token {
        self.pos += 1;
        let name = self.tag_name();
        let mut attrs: Vec<Attr> = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                break;
            }
            if let Some(after) = rest.strip_prefix("/>") {
                self_closing = true;
                self.pos = self.src.len() - after.len();
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let name_end = rest
                .find(|c: char| c.is_ascii_whitespace() || matches!(c, '=' | '>' | '/'))
                .unwrap_or(rest.len());
            let attr_name = rest[..name_end].to_ascii_lowercase();
            self.pos += name_end;
            self.skip_whitespace();
            let mut value = String::new();
            if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                value = self.attr_value();
            }
            if !attr_name.is_empty() && !attrs.iter().any(|a| a.name == attr_name) {
                attrs.push(Attr {
                    name: attr_name.into(),
                    value,
                });
            }
        }
        if RAW_TEXT_TAGS.contains(&name.as_str()) && !self_closing {
            self.raw_text_end = Some(name.clone());
        }
        Token::StartTag {
            name,
            attrs,
            self_closing,
        }
    }

    fn attr_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(q).unwrap_or(body.len());
                self.pos += 1 + end + usize::from(end < body.len());
                decode_entities(&body[..end])
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                decode_entities(&rest[..end])
            }
        }
    }

    fn end_tag(&mut self) -> Token {
        self.pos += 2;
        let name = self.tag_name();
        self.skip_past(">");
        Token::EndTag(name)
    }

    fn text(&mut self) -> Token {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut end = rest.len();
        for (i, c) in rest.char_indices().skip(1) {
            if c == '<' && starts_markup(bytes.get(i + 1).copied()) {
                end = i;
                break;
            }
        }
        self.pos += end;
        Token::Text(decode_entities(&rest[..end]))
    }
}

fn starts_markup(next: Option<u8>) -> bool {
    matches!(next, Some(b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(tag) = self.raw_text_end.take() {
            if !self.rest().is_empty() {
                let token = self.raw_text(&tag);
                if token != Token::Text(String::new()) {
                    return Some(token);
                }
            }
        }
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }
            let bytes = rest.as_bytes();
            if rest.starts_with("<!--") {
                self.skip_past("-->");
                continue;
            }
            if bytes[0] == b'<' && matches!(bytes.get(1), Some(b'!' | b'?')) {
                self.skip_past(">");
                continue;
            }
            if bytes[0] == b'<' && bytes.get(1) == Some(&b'/') {
                if bytes.get(2).is_some_and(u8::is_ascii_alphabetic) {
                    return Some(self.end_tag());
                }
                self.skip_past(">");
                continue;
            }
            if bytes[0] == b'<' && bytes.get(1).is_some_and(u8::is_ascii_alphabetic) {
                return Some(self.start_tag());
            }
            return Some(self.text());
        }
    }
}

// === Tree builder ===

struct TreeBuilder<'d> {
    doc: &'d mut Document,
    open: Vec<NodeId>,
    in_head: bool,
}

impl<'d> TreeBuilder<'d> {
    fn new(doc: &'d mut Document) -> Self {
        let root = doc.root();
        Self {
            doc,
            open: vec![root],
            in_head: false,
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn current_tag(&self) -> Option<&str> {
        self.doc.tag(self.current())
    }

    /// Pop through the nearest open `tag`, stopping at any element in `scope`.
    fn close_in_scope(&mut self, tag: &str, scope: &[&str]) {
        let found = self
            .open
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find_map(|(i, id)| match self.doc.tag(*id) {
                Some(t) if t == tag => Some(Some(i)),
                Some(t) if scope.contains(&t) => Some(None),
                _ => None,
            })
            .flatten();
        if let Some(i) = found {
            self.open.truncate(i);
        }
    }

    fn run(mut self, tokens: Tokenizer<'_>) -> Result<(), ParseError> {
        for token in tokens {
            match token {
                Token::Text(text) => {
                    if self.in_head || text.is_empty() {
                        continue;
                    }
                    let parent = self.current();
                    match self.doc.children(parent).last().copied() {
                        Some(last) if self.doc.is_text(last) => {
                            let at = self.doc.text_len(last).unwrap_or(0);
                            self.doc.insert_text(last, at, &text);
                        }
                        _ => {
                            let node = self.doc.create_text(text);
                            self.doc.append_child(parent, node);
                        }
                    }
                }
                Token::StartTag {
                    name,
                    attrs,
                    self_closing,
                } => self.start_tag(name, attrs, self_closing)?,
                Token::EndTag(name) => self.end_tag(&name),
            }
        }
        Ok(())
    }

    fn start_tag(
        &mut self,
        name: String,
        attrs: Vec<Attr>,
        self_closing: bool,
    ) -> Result<(), ParseError> {
        match name.as_str() {
            "html" | "body" => {
                self.in_head = false;
                return Ok(());
            }
            "head" => {
                self.in_head = true;
                return Ok(());
            }
            _ if self.in_head => return Ok(()),
            _ => {}
        }
        if is_block(&name) && self.current_tag() == Some("p") {
            self.open.pop();
        }
        match name.as_str() {
            "li" => self.close_in_scope("li", &["ul", "ol"]),
            "td" | "th" => {
                self.close_in_scope("td", &["tr", "table"]);
                self.close_in_scope("th", &["tr", "table"]);
            }
            "tr" => self.close_in_scope("tr", &["table"]),
            _ => {}
        }
        let element = Element {
            tag: name.as_str().into(),
            attrs,
        };
        let node = self.doc.create_element_from(element);
        let parent = self.current();
        self.doc.append_child(parent, node);
        if !is_void(&name) && !self_closing {
            if self.open.len() > MAX_DEPTH {
                return Err(ParseError::TooDeep(MAX_DEPTH));
            }
            self.open.push(node);
        }
        Ok(())
    }

    fn end_tag(&mut self, name: &str) {
        match name {
            "head" => {
                self.in_head = false;
                return;
            }
            "html" | "body" | "br" => return,
            _ if self.in_head => return,
            _ => {}
        }
        if let Some(i) = self
            .open
            .iter()
            .skip(1)
            .rposition(|id| self.doc.tag(*id) == Some(name))
        {
            self.open.truncate(i + 1);
        }
    }
}

// === Character references ===

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '©'),
    ("reg", '®'),
    ("trade", '™'),
    ("hellip", '…'),
    ("mdash", '—'),
    ("ndash", '–'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("laquo", '«'),
    ("raquo", '»'),
    ("bull", '•'),
    ("middot", '·'),
    ("times", '×'),
    ("divide", '÷'),
    ("deg", '°'),
    ("euro", '€'),
    ("pound", '£'),
    ("yen", '¥'),
    ("cent", '¢'),
    ("sect", '§'),
    ("para", '¶'),
];

/// Decode character references. Unknown or unterminated references stay literal.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_one(rest) {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_one(s: &str) -> Option<(char, usize)> {
    let semi = s
        .char_indices()
        .take(34)
        .find(|(_, c)| *c == ';')
        .map(|(i, _)| i)?;
    let body = &s[1..semi];
    let c = if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        char::from_u32(code).filter(|c| *c != '\0')?
    } else {
        NAMED_ENTITIES
            .iter()
            .find(|(name, _)| *name == body)
            .map(|(_, c)| *c)?
    };
    Some((c, semi + 1))
}

// === Writer ===

/// String sink for the escape routines.
struct MarkupWriter {
    out: String,
}

impl fmt::Write for MarkupWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }
}

impl StrWrite for MarkupWriter {
    type Error = fmt::Error;

    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(&mut self.out, args)
    }
}

impl MarkupWriter {
    fn node(&mut self, doc: &Document, id: NodeId) -> fmt::Result {
        match doc.data(id) {
            None => Ok(()),
            Some(NodeData::Root) => self.children(doc, id),
            Some(NodeData::Text(text)) => escape_html_body_text(&mut *self, text),
            Some(NodeData::Element(el)) => {
                self.out.push('<');
                self.out.push_str(&el.tag);
                for attr in &el.attrs {
                    self.out.push(' ');
                    self.out.push_str(&attr.name);
                    self.out.push_str("=\"");
                    escape_html(&mut *self, &attr.value)?;
                    self.out.push('"');
                }
                self.out.push('>');
                if el.is_void() {
                    return Ok(());
                }
                self.children(doc, id)?;
                self.out.push_str("</");
                self.out.push_str(&el.tag);
                self.out.push('>');
                Ok(())
            }
        }
    }

    fn children(&mut self, doc: &Document, id: NodeId) -> fmt::Result {
        for child in doc.children(id) {
            self.node(doc, *child)?;
        }
        Ok(())
    }
}

/// Serialize the contents of `id` (not the node itself).
pub fn to_html(doc: &Document, id: NodeId) -> String {
    let mut writer = MarkupWriter { out: String::new() };
    // MarkupWriter never reports an error
    let _ = writer.children(doc, id);
    writer.out
}

/// Serialize a node including its own tag.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut writer = MarkupWriter { out: String::new() };
    let _ = writer.node(doc, id);
    writer.out
}

/// Escape plain text for use as element content.
pub fn escape_text(text: &str) -> String {
    let mut writer = MarkupWriter { out: String::new() };
    let _ = escape_html_body_text(&mut writer, text);
    writer.out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &str) -> String {
        let doc = parse_fragment(input, usize::MAX).expect("parse");
        to_html(&doc, doc.root())
    }

    #[test]
    fn test_basic_markup() {
        assert_eq!(
            round_trip("<p>Hello <b>world</b></p>"),
            "<p>Hello <b>world</b></p>"
        );
    }

    #[test]
    fn test_attributes_and_case() {
        assert_eq!(
            round_trip("<SPAN Style='color: red' title=x>a</SPAN>"),
            "<span style=\"color: red\" title=\"x\">a</span>"
        );
    }

    #[test]
    fn test_void_and_self_closing() {
        assert_eq!(round_trip("a<br/>b<br>c"), "a<br>b<br>c");
    }

    #[test]
    fn test_comments_and_doctype_dropped() {
        assert_eq!(
            round_trip("<!DOCTYPE html><!-- StartFragment --><p>x</p><!--EndFragment-->"),
            "<p>x</p>"
        );
    }

    #[test]
    fn test_html_body_wrappers_and_head() {
        assert_eq!(
            round_trip("<html><head><title>t</title><style>p{}</style></head><body><p>x</p></body></html>"),
            "<p>x</p>"
        );
    }

    #[test]
    fn test_entities() {
        assert_eq!(round_trip("<p>a &amp; b &lt;c&gt; &#39;d&#x27;</p>"), "<p>a &amp; b &lt;c&gt; 'd'</p>");
        assert_eq!(decode_entities("AT&T &unknown; &"), "AT&T &unknown; &");
        assert_eq!(decode_entities("&nbsp;"), "\u{a0}");
    }

    #[test]
    fn test_implied_end_tags() {
        assert_eq!(
            round_trip("<ul><li>one<li>two</ul><p>a<p>b"),
            "<ul><li>one</li><li>two</li></ul><p>a</p><p>b</p>"
        );
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        assert_eq!(round_trip("<p>a</b>c</p>"), "<p>ac</p>");
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        assert_eq!(round_trip("<p>1 < 2</p>"), "<p>1 &lt; 2</p>");
    }

    #[test]
    fn test_raw_text_kept_verbatim() {
        let doc = parse_fragment("<script>if (a < b) {}</script>", usize::MAX).expect("parse");
        let script = doc.children(doc.root())[0];
        assert_eq!(doc.text_content(script), "if (a < b) {}");
    }

    #[test]
    fn test_too_large() {
        assert_eq!(
            parse_fragment("<p>abc</p>", 4).err(),
            Some(ParseError::TooLarge { len: 10, limit: 4 })
        );
    }

    #[test]
    fn test_too_deep() {
        let input = "<span>".repeat(MAX_DEPTH + 2);
        assert_eq!(
            parse_fragment(&input, usize::MAX).err(),
            Some(ParseError::TooDeep(MAX_DEPTH))
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let mut doc = Document::new();
        let a = doc.create_element_from(Element::new("a").with_attr("href", "x\"><script>"));
        let root = doc.root();
        doc.append_child(root, a);
        assert_eq!(to_html(&doc, root), "<a href=\"x&quot;&gt;&lt;script&gt;\"></a>");
    }
}
