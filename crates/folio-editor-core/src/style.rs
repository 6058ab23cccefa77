//! Inline `style` attribute handling.
//!
//! Provides:
//! - `StyleDecls` - ordered declaration list parsed from a `style` attribute
//! - `StyleAttributes` - typed view of the declarations the editor cares about
//! - Property category predicates used by the sanitizer (highlight, shadow, font)
//! - Color validation for color commands

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Ordered list of `name: value` declarations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleDecls(Vec<(SmolStr, String)>);

impl StyleDecls {
    /// Parse a `;`-delimited declaration list.
    ///
    /// Semicolons inside parentheses or quotes (e.g. `url("a;b")`) do not split.
    /// Declarations without a `:` or with an empty name/value are dropped.
    pub fn parse(style: &str) -> Self {
        let mut decls = Vec::new();
        for decl in split_declarations(style) {
            let Some((name, value)) = decl.split_once(':') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            decls.push((SmolStr::new(name), value.to_string()));
        }
        Self(decls)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, replacing every existing declaration of it.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter().position(|(n, _)| n == name) {
            Some(pos) => {
                self.0[pos].1 = value;
                let mut seen = false;
                self.0.retain(|(n, _)| {
                    if n != name {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.0.push((SmolStr::new(name), value)),
        }
    }

    /// Remove a property. Returns true if anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|(n, _)| n != name);
        self.0.len() != before
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.0.retain(|(n, v)| keep(n, v));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl fmt::Display for StyleDecls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

fn split_declarations(style: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                out.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&style[start..]);
    out
}

/// Block alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }
}

/// Typed view over the style properties the editor reads back.
///
/// Only the properties present on the node itself; inherited values are
/// resolved by walking ancestors (see [`crate::format::resolved_style`]).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleAttributes {
    pub color: Option<String>,
    pub background: Option<String>,
    pub alignment: Option<Alignment>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
}

impl StyleAttributes {
    pub fn from_decls(decls: &StyleDecls) -> Self {
        let decoration = decls.get("text-decoration").or(decls.get("text-decoration-line"));
        Self {
            color: decls.get("color").map(str::to_string),
            background: decls
                .get("background-color")
                .or(decls.get("background"))
                .map(str::to_string),
            alignment: decls.get("text-align").and_then(Alignment::parse),
            bold: decls.get("font-weight").map(is_bold_weight),
            italic: decls
                .get("font-style")
                .map(|v| matches!(v.trim(), "italic" | "oblique")),
            underline: decoration.map(|v| v.contains("underline")),
            strikethrough: decoration.map(|v| v.contains("line-through")),
            font_family: decls.get("font-family").map(str::to_string),
            font_size: decls.get("font-size").map(str::to_string),
        }
    }
}

fn is_bold_weight(value: &str) -> bool {
    let value = value.trim();
    match value {
        "bold" | "bolder" => true,
        _ => value.parse::<u16>().is_ok_and(|w| w >= 600),
    }
}

/// Background / highlight properties.
pub fn is_highlight_property(name: &str) -> bool {
    matches!(name, "background" | "background-color" | "background-image")
}

/// Shadow and filter properties.
pub fn is_shadow_property(name: &str) -> bool {
    matches!(name, "text-shadow" | "box-shadow" | "filter")
}

/// Font properties that let pasted content override the host theme.
pub fn is_font_property(name: &str) -> bool {
    matches!(name, "font-family" | "font" | "font-size")
}

const NAMED_COLORS: &[&str] = &[
    "aqua", "black", "blue", "brown", "coral", "crimson", "cyan", "darkblue", "darkgray",
    "darkgreen", "darkred", "fuchsia", "gold", "gray", "green", "grey", "indigo", "lightblue",
    "lightgray", "lightgreen", "lime", "magenta", "maroon", "navy", "olive", "orange", "orchid",
    "pink", "purple", "red", "royalblue", "salmon", "silver", "skyblue", "slategray", "teal",
    "tomato", "transparent", "turquoise", "violet", "white", "yellow", "currentcolor",
];

/// Check a CSS color value: hex, `rgb()/rgba()/hsl()/hsla()`, or a common named color.
pub fn is_valid_color(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    for func in ["rgba(", "rgb(", "hsla(", "hsl("] {
        if let Some(args) = value.strip_prefix(func) {
            let Some(args) = args.strip_suffix(')') else {
                return false;
            };
            let parts: Vec<&str> = args
                .split([',', ' ', '/'])
                .filter(|p| !p.is_empty())
                .collect();
            return (3..=4).contains(&parts.len())
                && parts.iter().all(|p| {
                    let p = p.trim_end_matches(['%', 'g', 'r', 'a', 'd', 'e']);
                    p.parse::<f32>().is_ok()
                });
        }
    }
    NAMED_COLORS.contains(&value.as_str())
}

/// True for colors that render as (near) pure white.
pub fn is_white(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(compact.as_str(), "white" | "#fff" | "#ffffff" | "#ffff" | "#ffffffff")
        || compact == "rgb(255,255,255)"
        || compact.starts_with("rgba(255,255,255,")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let decls = StyleDecls::parse("COLOR:red; background : yellow;;font-size:12px");
        assert_eq!(decls.len(), 3);
        assert_eq!(decls.get("color"), Some("red"));
        assert_eq!(decls.get("background"), Some("yellow"));
        assert_eq!(
            decls.to_string(),
            "color: red; background: yellow; font-size: 12px"
        );
    }

    #[test]
    fn test_parse_keeps_parenthesized_semicolons() {
        let decls = StyleDecls::parse("background-image: url(\"a;b.png\"); color: blue");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls.get("background-image"), Some("url(\"a;b.png\")"));
    }

    #[test]
    fn test_set_replaces_duplicates() {
        let mut decls = StyleDecls::parse("color: red; margin: 0; color: blue");
        decls.set("color", "green");
        assert_eq!(decls.to_string(), "color: green; margin: 0");
        assert!(decls.remove("margin"));
        assert!(!decls.remove("margin"));
    }

    #[test]
    fn test_style_attributes() {
        let attrs = StyleAttributes::from_decls(&StyleDecls::parse(
            "font-weight: 700; text-decoration: underline line-through; text-align: center",
        ));
        assert_eq!(attrs.bold, Some(true));
        assert_eq!(attrs.underline, Some(true));
        assert_eq!(attrs.strikethrough, Some(true));
        assert_eq!(attrs.alignment, Some(Alignment::Center));
        assert_eq!(attrs.italic, None);
    }

    #[test]
    fn test_color_validation() {
        assert!(is_valid_color("#ff0000"));
        assert!(is_valid_color("#F00"));
        assert!(is_valid_color("rgb(255, 0, 0)"));
        assert!(is_valid_color("rgba(0 0 0 / 50%)"));
        assert!(is_valid_color("Red"));
        assert!(!is_valid_color("#ff00"));
        assert!(!is_valid_color("red; background: url(x)"));
        assert!(!is_valid_color("expression(alert(1))"));
    }

    #[test]
    fn test_is_white() {
        assert!(is_white("#FFF"));
        assert!(is_white("rgb(255, 255, 255)"));
        assert!(is_white("rgba(255,255,255,0.9)"));
        assert!(!is_white("#fefefe"));
    }
}
