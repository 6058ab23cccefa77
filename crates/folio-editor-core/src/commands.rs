//! Editor commands.
//!
//! Semantic formatting operations, decoupled from how they are triggered
//! (toolbar button, keyboard shortcut, host call). Hosts that speak in
//! command names go through [`Command::parse`].

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::EditorError;
use crate::style::{Alignment, is_valid_color};

/// Block-level formats for `formatBlock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFormat {
    Paragraph,
    Heading(u8),
    Blockquote,
    Preformatted,
    Div,
}

impl BlockFormat {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Paragraph => "p",
            Self::Heading(1) => "h1",
            Self::Heading(2) => "h2",
            Self::Heading(3) => "h3",
            Self::Heading(4) => "h4",
            Self::Heading(5) => "h5",
            Self::Heading(_) => "h6",
            Self::Blockquote => "blockquote",
            Self::Preformatted => "pre",
            Self::Div => "div",
        }
    }

    /// Accepts `h2`, `H2`, `<h2>` and friends.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_ascii_lowercase();
        match tag.as_str() {
            "p" => Some(Self::Paragraph),
            "blockquote" => Some(Self::Blockquote),
            "pre" => Some(Self::Preformatted),
            "div" => Some(Self::Div),
            _ => {
                let level = tag.strip_prefix('h')?.parse::<u8>().ok()?;
                (1..=6).contains(&level).then_some(Self::Heading(level))
            }
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Self::Heading(_))
    }
}

/// Author theme applied to the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSpec {
    pub accent: String,
    pub font_family: Option<String>,
    pub base_px: f32,
    pub heading_scale: f32,
}

impl Default for ThemeSpec {
    fn default() -> Self {
        Self {
            accent: "#4f46e5".into(),
            font_family: None,
            base_px: 16.0,
            heading_scale: 1.15,
        }
    }
}

/// All formatting commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    InsertUnorderedList,
    InsertOrderedList,
    Indent,
    Outdent,
    Justify(Alignment),
    ForeColor(SmolStr),
    HiliteColor(SmolStr),
    CreateLink(String),
    Unlink,
    RemoveFormat,
    /// Strip text color only.
    RemoveColor,
    /// Strip background highlight only.
    RemoveHighlight,
    Undo,
    Redo,
    FormatBlock(BlockFormat),
    ApplyTheme(ThemeSpec),
}

fn required<'a>(command: &str, value: Option<&'a str>) -> Result<&'a str, EditorError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EditorError::InvalidValue {
            command: command.to_string(),
            value: None,
        })
}

fn color(command: &str, value: Option<&str>) -> Result<SmolStr, EditorError> {
    let value = required(command, value)?;
    if !is_valid_color(value) {
        return Err(EditorError::InvalidValue {
            command: command.to_string(),
            value: Some(value.to_string()),
        });
    }
    Ok(SmolStr::new(value))
}

impl Command {
    /// Parse a command name and optional value.
    ///
    /// Link URLs are validated at execution time so the rejection can be
    /// reported as a notice.
    pub fn parse(name: &str, value: Option<&str>) -> Result<Self, EditorError> {
        let command = match name {
            "bold" => Self::Bold,
            "italic" => Self::Italic,
            "underline" => Self::Underline,
            "strikeThrough" | "strikethrough" => Self::StrikeThrough,
            "insertUnorderedList" => Self::InsertUnorderedList,
            "insertOrderedList" => Self::InsertOrderedList,
            "indent" => Self::Indent,
            "outdent" => Self::Outdent,
            "justifyLeft" => Self::Justify(Alignment::Left),
            "justifyCenter" => Self::Justify(Alignment::Center),
            "justifyRight" => Self::Justify(Alignment::Right),
            "justifyFull" => Self::Justify(Alignment::Justify),
            "foreColor" => Self::ForeColor(color(name, value)?),
            "hiliteColor" | "backColor" => Self::HiliteColor(color(name, value)?),
            "createLink" => Self::CreateLink(required(name, value)?.to_string()),
            "unlink" => Self::Unlink,
            "removeFormat" => Self::RemoveFormat,
            "removeColor" => Self::RemoveColor,
            "removeHighlight" => Self::RemoveHighlight,
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "formatBlock" => {
                let tag = required(name, value)?;
                Self::FormatBlock(BlockFormat::from_tag(tag).ok_or_else(|| {
                    EditorError::InvalidValue {
                        command: name.to_string(),
                        value: Some(tag.to_string()),
                    }
                })?)
            }
            "heading" => {
                let level = required(name, value)?;
                match level.parse::<u8>() {
                    Ok(n @ 1..=6) => Self::FormatBlock(BlockFormat::Heading(n)),
                    _ => {
                        return Err(EditorError::InvalidValue {
                            command: name.to_string(),
                            value: Some(level.to_string()),
                        });
                    }
                }
            }
            "applyTheme" => {
                let accent = color(name, value)?;
                Self::ApplyTheme(ThemeSpec {
                    accent: accent.to_string(),
                    ..ThemeSpec::default()
                })
            }
            other => return Err(EditorError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Host-facing command name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::StrikeThrough => "strikeThrough",
            Self::InsertUnorderedList => "insertUnorderedList",
            Self::InsertOrderedList => "insertOrderedList",
            Self::Indent => "indent",
            Self::Outdent => "outdent",
            Self::Justify(Alignment::Left) => "justifyLeft",
            Self::Justify(Alignment::Center) => "justifyCenter",
            Self::Justify(Alignment::Right) => "justifyRight",
            Self::Justify(Alignment::Justify) => "justifyFull",
            Self::ForeColor(_) => "foreColor",
            Self::HiliteColor(_) => "hiliteColor",
            Self::CreateLink(_) => "createLink",
            Self::Unlink => "unlink",
            Self::RemoveFormat => "removeFormat",
            Self::RemoveColor => "removeColor",
            Self::RemoveHighlight => "removeHighlight",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::FormatBlock(_) => "formatBlock",
            Self::ApplyTheme(_) => "applyTheme",
        }
    }

    /// Undo and redo move through history instead of editing content.
    pub fn is_history(&self) -> bool {
        matches!(self, Self::Undo | Self::Redo)
    }
}

/// Kinds of user-facing rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    InvalidLink,
    InvalidValue,
    UnknownCommand,
}

/// Lightweight, non-fatal message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&EditorError> for Notice {
    fn from(error: &EditorError) -> Self {
        let kind = match error {
            EditorError::InvalidUrl(_) => NoticeKind::InvalidLink,
            EditorError::UnknownCommand(_) => NoticeKind::UnknownCommand,
            _ => NoticeKind::InvalidValue,
        };
        Self::new(kind, error.to_string())
    }
}

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Content changed.
    Applied,
    /// Nothing to do (empty selection, history bound, no matching format).
    Unchanged,
    /// Input refused; content untouched.
    Rejected(Notice),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Active formatting at the current selection, for toolbar state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike_through: bool,
    pub unordered_list: bool,
    pub ordered_list: bool,
    pub alignment: Alignment,
    pub block: SmolStr,
    pub link: Option<String>,
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("bold", None), Ok(Command::Bold));
        assert_eq!(
            Command::parse("justifyFull", None),
            Ok(Command::Justify(Alignment::Justify))
        );
        assert_eq!(
            Command::parse("formatBlock", Some("<H2>")),
            Ok(Command::FormatBlock(BlockFormat::Heading(2)))
        );
        assert_eq!(
            Command::parse("heading", Some("3")),
            Ok(Command::FormatBlock(BlockFormat::Heading(3)))
        );
        assert_eq!(
            Command::parse("foreColor", Some("#ff0000")),
            Ok(Command::ForeColor("#ff0000".into()))
        );
    }

    #[test]
    fn test_parse_rejections() {
        assert!(matches!(
            Command::parse("fontName", Some("Arial")),
            Err(EditorError::UnknownCommand(_))
        ));
        assert!(matches!(
            Command::parse("foreColor", None),
            Err(EditorError::InvalidValue { .. })
        ));
        assert!(matches!(
            Command::parse("foreColor", Some("red; background: url(x)")),
            Err(EditorError::InvalidValue { .. })
        ));
        assert!(matches!(
            Command::parse("heading", Some("7")),
            Err(EditorError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_name_round_trip() {
        for name in [
            "bold",
            "italic",
            "underline",
            "strikeThrough",
            "insertUnorderedList",
            "insertOrderedList",
            "indent",
            "outdent",
            "justifyLeft",
            "justifyCenter",
            "justifyRight",
            "justifyFull",
            "unlink",
            "removeFormat",
            "removeColor",
            "removeHighlight",
            "undo",
            "redo",
        ] {
            let command = Command::parse(name, None).expect("parse");
            assert_eq!(command.name(), name);
        }
    }

    #[test]
    fn test_notice_from_error() {
        let notice = Notice::from(&EditorError::InvalidUrl("not a url".into()));
        assert_eq!(notice.kind, NoticeKind::InvalidLink);
        assert_eq!(notice.to_string(), "invalid URL: not a url");
    }
}
