//! Text analysis helpers.
//!
//! Char-offset based word navigation used to widen a collapsed caret before
//! formatting, plus slug and plain-text conversions shared with hosts.

use std::ops::Range;

use crate::html::escape_text;

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\''
}

/// Find word boundary backward from cursor.
pub fn find_word_boundary_backward(text: &str, cursor: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = cursor.min(chars.len());
    while pos > 0 && is_word_char(chars[pos - 1]) {
        pos -= 1;
    }
    pos
}

/// Find word boundary forward from cursor.
pub fn find_word_boundary_forward(text: &str, cursor: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = cursor.min(chars.len());
    while pos < chars.len() && is_word_char(chars[pos]) {
        pos += 1;
    }
    pos
}

/// Char range of the word touching `cursor`, if any.
///
/// A caret directly after a word (e.g. at the end of a line) still selects it.
pub fn find_word_range(text: &str, cursor: usize) -> Option<Range<usize>> {
    let start = find_word_boundary_backward(text, cursor);
    let end = find_word_boundary_forward(text, cursor);
    (start < end).then_some(start..end)
}

/// URL-safe slug: lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// Convert clipboard plain text to markup: escaped, newlines become `<br>`.
pub fn text_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split('\n')
        .map(escape_text)
        .collect::<Vec<_>>()
        .join("<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_word_boundary_backward() {
        assert_eq!(find_word_boundary_backward("hello world test", 16), 12);
        assert_eq!(find_word_boundary_backward("hello world test", 14), 12);
        assert_eq!(find_word_boundary_backward("hello world test", 6), 6);
    }

    #[test]
    fn test_find_word_boundary_forward() {
        assert_eq!(find_word_boundary_forward("hello world test", 0), 5);
        assert_eq!(find_word_boundary_forward("hello world test", 8), 11);
        assert_eq!(find_word_boundary_forward("hello world test", 5), 5);
    }

    #[test]
    fn test_find_word_range() {
        assert_eq!(find_word_range("hello world", 2), Some(0..5));
        assert_eq!(find_word_range("hello world", 5), Some(0..5));
        assert_eq!(find_word_range("hello world", 6), Some(6..11));
        assert_eq!(find_word_range("a  b", 2), None);
        assert_eq!(find_word_range("", 0), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust -- in  2024 "), "rust-in-2024");
        assert_eq!(slugify("Ünïcode"), "ncode");
    }

    #[test]
    fn test_text_to_html() {
        assert_eq!(text_to_html("a < b\r\nc & d"), "a &lt; b<br>c &amp; d");
    }
}
