//! folio-editor-core: rich-text editing engine without framework dependencies.
//!
//! This crate provides:
//! - `Document` - arena DOM with a live selection
//! - `sanitize` - allow-list cleaning for pasted and loaded HTML
//! - `SelectionTracker` - saved selection across focus changes
//! - `HistoryStack` - bounded snapshot undo/redo
//! - `execute_command` - formatting commands over the selection
//! - `EditorSession` - one editable surface driven by platform events

pub mod commands;
pub mod config;
pub mod dom;
pub mod edit;
pub mod error;
pub mod execute;
pub mod format;
pub mod html;
pub mod input;
pub mod platform;
pub mod sanitize;
pub mod selection;
pub mod style;
pub mod surface;
pub mod text_helpers;
pub mod undo;

pub use commands::{
    BlockFormat, Command, CommandOutcome, FormatState, Notice, NoticeKind, ThemeSpec,
};
pub use config::EditorConfig;
pub use dom::{Document, Element, NodeData, NodeId};
pub use error::{EditorError, ParseError};
pub use execute::{execute_command, execute_input};
pub use input::{InputEvent, Key, KeyCombo, KeydownResult, Modifiers};
pub use platform::{ClipboardData, ClipboardSource, Clock, EditorHost, ManualClock, SystemClock};
pub use sanitize::{
    DEFAULT_MAX_INPUT_BYTES, SanitizeOptions, TocEntry, normalize_alignment_markers, plain_text,
    sanitize, sanitize_for_display, sanitize_with_limit, word_count,
};
pub use selection::{Affinity, Boundary, RestoreOutcome, SelectionRange, SelectionTracker};
pub use smol_str::SmolStr;
pub use style::{Alignment, StyleAttributes, StyleDecls};
pub use surface::{EditorSession, SurfaceState, SuspendGuard};
pub use text_helpers::{slugify, text_to_html};
pub use undo::{DEFAULT_HISTORY_DEPTH, HistoryEntry, HistoryStack, UndoManager};
