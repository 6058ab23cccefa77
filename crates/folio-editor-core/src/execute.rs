//! Command and input execution on a document.
//!
//! `execute_command` and `execute_input` are the central dispatch points for
//! every content-changing operation. They work on a bare [`Document`] and its
//! live selection; history, host notification and debouncing belong to the
//! session.

use crate::commands::{Command, CommandOutcome};
use crate::dom::Document;
use crate::edit;
use crate::format::{self, InlineFormat};
use crate::input::InputEvent;

/// Execute a formatting command on the current selection.
///
/// `Undo` and `Redo` move through session history and are `Unchanged` here.
pub fn execute_command(doc: &mut Document, command: &Command) -> CommandOutcome {
    let outcome = match command {
        Command::Bold => format::toggle_inline(doc, InlineFormat::Bold),
        Command::Italic => format::toggle_inline(doc, InlineFormat::Italic),
        Command::Underline => format::toggle_inline(doc, InlineFormat::Underline),
        Command::StrikeThrough => format::toggle_inline(doc, InlineFormat::StrikeThrough),
        Command::InsertUnorderedList => format::toggle_list(doc, false),
        Command::InsertOrderedList => format::toggle_list(doc, true),
        Command::Indent => format::indent(doc),
        Command::Outdent => format::outdent(doc),
        Command::Justify(alignment) => format::justify(doc, *alignment),
        Command::ForeColor(color) => format::fore_color(doc, color),
        Command::HiliteColor(color) => format::hilite_color(doc, color),
        Command::CreateLink(url) => format::create_link(doc, url),
        Command::Unlink => format::unlink(doc),
        Command::RemoveFormat => format::remove_format(doc),
        Command::RemoveColor => format::remove_color(doc),
        Command::RemoveHighlight => format::remove_highlight(doc),
        Command::FormatBlock(block) => format::format_block(doc, *block),
        Command::ApplyTheme(theme) => format::apply_theme(doc, theme),
        Command::Undo | Command::Redo => CommandOutcome::Unchanged,
    };
    tracing::debug!(target: "folio::execute", command = command.name(), ?outcome, "executed command");
    outcome
}

/// Apply a raw input event. Returns true if the document changed.
pub fn execute_input(doc: &mut Document, event: &InputEvent) -> bool {
    let changed = match event {
        InputEvent::InsertText(text) => edit::insert_text(doc, text),
        InputEvent::InsertLineBreak => edit::insert_line_break(doc),
        InputEvent::InsertParagraph => edit::insert_paragraph(doc),
        InputEvent::DeleteBackward => edit::delete_backward(doc),
        InputEvent::DeleteForward => edit::delete_forward(doc),
    };
    tracing::trace!(target: "folio::execute", ?event, changed, "applied input");
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;
    use crate::selection::select_chars;

    #[test]
    fn test_dispatch_applies_format_and_input() {
        let mut doc = html::parse_fragment("<p>Hello</p>", usize::MAX).expect("parse");
        select_chars(&mut doc, 0, 5);
        assert_eq!(execute_command(&mut doc, &Command::Bold), CommandOutcome::Applied);
        select_chars(&mut doc, 5, 5);
        assert!(execute_input(&mut doc, &InputEvent::InsertText("!".into())));
        insta::assert_snapshot!(html::to_html(&doc, doc.root()), @"<p><b>Hello!</b></p>");
    }

    #[test]
    fn test_history_commands_are_left_to_session() {
        let mut doc = html::parse_fragment("<p>a</p>", usize::MAX).expect("parse");
        assert_eq!(execute_command(&mut doc, &Command::Undo), CommandOutcome::Unchanged);
    }
}
