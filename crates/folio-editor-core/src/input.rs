//! Input events and keyboard shortcuts.
//!
//! Platform-agnostic definitions for raw input reaching the editable surface.
//! `InputEvent` is the semantic intent of a `beforeinput` event; `KeyCombo`
//! is a keydown with its modifiers, mapped onto editor commands by
//! [`KeyCombo::command`].

use smol_str::SmolStr;

use crate::commands::Command;

/// Semantic input reaching the surface.
///
/// Based on the W3C Input Events `inputType` values the surface handles
/// itself. Paste goes through the session's clipboard path instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Insert typed text (including IME commits and replacements).
    InsertText(String),
    /// Insert a line break (`<br>`, Shift+Enter).
    InsertLineBreak,
    /// Insert a paragraph break (Enter).
    InsertParagraph,
    /// Delete content backward (Backspace).
    DeleteBackward,
    /// Delete content forward (Delete key).
    DeleteForward,
}

impl InputEvent {
    /// Map a browser `inputType` and its data. Unhandled types return `None`.
    pub fn from_input_type(input_type: &str, data: Option<&str>) -> Option<Self> {
        match input_type {
            "insertText" | "insertReplacementText" | "insertCompositionText" => {
                let data = data.filter(|d| !d.is_empty())?;
                Some(Self::InsertText(data.to_string()))
            }
            "insertLineBreak" => Some(Self::InsertLineBreak),
            "insertParagraph" => Some(Self::InsertParagraph),
            "deleteContentBackward" => Some(Self::DeleteBackward),
            "deleteContentForward" => Some(Self::DeleteForward),
            _ => None,
        }
    }

    /// Check if this input deletes content.
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::DeleteBackward | Self::DeleteForward)
    }

    /// Check if this input starts a new line or block.
    pub fn is_line_break(&self) -> bool {
        matches!(self, Self::InsertLineBreak | Self::InsertParagraph)
    }
}

/// Keys the surface distinguishes. Everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character.
    Character(SmolStr),
    Enter,
    Backspace,
    Delete,
    Tab,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    Shift,
    Control,
    Alt,
    Meta,
    Other(SmolStr),
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Enter" => Self::Enter,
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Tab" => Self::Tab,
            "Escape" => Self::Escape,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Shift" => Self::Shift,
            "Control" => Self::Control,
            "Alt" => Self::Alt,
            "Meta" => Self::Meta,
            k if k.chars().count() == 1 => Self::Character(SmolStr::new(k)),
            k => Self::Other(SmolStr::new(k)),
        }
    }

    /// Check if this is a navigation key.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft
                | Self::ArrowRight
                | Self::ArrowUp
                | Self::ArrowDown
                | Self::Home
                | Self::End
                | Self::PageUp
                | Self::PageDown
        )
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::Shift | Self::Control | Self::Alt | Self::Meta)
    }

    fn is_char(&self, c: char) -> bool {
        match self {
            Self::Character(s) => {
                let mut chars = s.chars();
                chars.next().is_some_and(|k| k.eq_ignore_ascii_case(&c)) && chars.next().is_none()
            }
            _ => false,
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META_SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: true,
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    /// Get the primary modifier + Shift for the platform.
    pub fn primary_shift(is_mac: bool) -> Self {
        if is_mac {
            Self::META_SHIFT
        } else {
            Self::CTRL_SHIFT
        }
    }

    /// Ctrl or Cmd held, without Alt.
    fn has_primary(&self) -> bool {
        (self.ctrl || self.meta) && !self.alt
    }
}

/// A key combination for triggering an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn primary(key: Key, is_mac: bool) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary(is_mac),
        }
    }

    pub fn primary_shift(key: Key, is_mac: bool) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary_shift(is_mac),
        }
    }

    /// The command bound to this combination, if any.
    ///
    /// Ctrl and Cmd are both accepted as the primary modifier, so the
    /// bindings hold on every platform.
    pub fn command(&self) -> Option<Command> {
        if !self.modifiers.has_primary() {
            return None;
        }
        let shift = self.modifiers.shift;
        let key = &self.key;
        if key.is_char('z') {
            return Some(if shift { Command::Redo } else { Command::Undo });
        }
        if shift {
            return None;
        }
        if key.is_char('y') {
            Some(Command::Redo)
        } else if key.is_char('b') {
            Some(Command::Bold)
        } else if key.is_char('i') {
            Some(Command::Italic)
        } else if key.is_char('u') {
            Some(Command::Underline)
        } else {
            None
        }
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let platform handle it.
    NotHandled,
    /// Event should be passed through (navigation, etc.).
    PassThrough,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_mapping() {
        assert_eq!(
            InputEvent::from_input_type("insertText", Some("a")),
            Some(InputEvent::InsertText("a".into()))
        );
        assert_eq!(InputEvent::from_input_type("insertText", None), None);
        assert_eq!(
            InputEvent::from_input_type("insertParagraph", None),
            Some(InputEvent::InsertParagraph)
        );
        assert_eq!(InputEvent::from_input_type("insertFromDrop", None), None);
        assert!(InputEvent::DeleteForward.is_deletion());
    }

    #[test]
    fn test_shortcuts() {
        for is_mac in [false, true] {
            assert_eq!(
                KeyCombo::primary(Key::character("z"), is_mac).command(),
                Some(Command::Undo)
            );
            assert_eq!(
                KeyCombo::primary_shift(Key::character("Z"), is_mac).command(),
                Some(Command::Redo)
            );
            assert_eq!(
                KeyCombo::primary(Key::character("y"), is_mac).command(),
                Some(Command::Redo)
            );
            assert_eq!(
                KeyCombo::primary(Key::character("b"), is_mac).command(),
                Some(Command::Bold)
            );
        }
        assert_eq!(KeyCombo::new(Key::character("b")).command(), None);
        assert_eq!(
            KeyCombo::with_modifiers(
                Key::character("b"),
                Modifiers {
                    alt: true,
                    ..Modifiers::CTRL
                }
            )
            .command(),
            None
        );
    }

    #[test]
    fn test_key_from_dom() {
        assert_eq!(Key::from_dom("a"), Key::character("a"));
        assert_eq!(Key::from_dom("ArrowUp"), Key::ArrowUp);
        assert!(Key::from_dom("Home").is_navigation());
        assert_eq!(Key::from_dom("F5"), Key::Other("F5".into()));
    }
}
