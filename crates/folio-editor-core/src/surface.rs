//! The editing session: one editable surface bound to a host page.
//!
//! `EditorSession` owns the document, its history and the saved selection,
//! and turns platform events into document changes. Every event handler is
//! infallible from the host's point of view: failures become notices or
//! logged fallbacks.
//!
//! Typing and paste are committed to history after a quiet period (the
//! debounce), formatting commands immediately. Content swaps (undo, redo and
//! host-driven replacement) run under a [`SuspendGuard`], which inhibits
//! history and restores the selection when dropped.

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::commands::{Command, CommandOutcome, FormatState, Notice};
use crate::config::EditorConfig;
use crate::dom::Document;
use crate::edit;
use crate::error::EditorError;
use crate::execute::{execute_command, execute_input};
use crate::format;
use crate::html;
use crate::input::{InputEvent, KeyCombo, KeydownResult};
use crate::platform::{ClipboardSource, Clock, EditorHost, SystemClock};
use crate::sanitize::{self, SanitizeOptions, sanitize_with_limit};
use crate::selection::{self, SelectionRange, SelectionTracker};
use crate::text_helpers::text_to_html;
use crate::undo::{HistoryStack, UndoManager};

/// Lifecycle of an editable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceState {
    /// Created, no content written yet.
    Uninitialized,
    /// Initial content written, not yet edited.
    Loaded,
    /// Receiving user input.
    Editing,
    /// Content is being swapped programmatically.
    Suspended,
    /// Torn down. Terminal.
    Unmounted,
}

impl SurfaceState {
    pub fn can_transition_to(self, to: Self) -> bool {
        use SurfaceState::*;
        matches!(
            (self, to),
            (Uninitialized, Loaded)
                | (Loaded, Editing)
                | (Loaded | Editing, Suspended)
                | (Suspended, Editing)
                | (Uninitialized | Loaded | Editing, Unmounted)
        )
    }

    /// Whether user events are processed in this state.
    pub fn accepts_input(self) -> bool {
        matches!(self, Self::Loaded | Self::Editing)
    }
}

/// An editable surface and everything it remembers.
pub struct EditorSession<H, C = SystemClock> {
    doc: Document,
    history: HistoryStack,
    tracker: SelectionTracker,
    state: SurfaceState,
    focused: bool,
    config: EditorConfig,
    /// Deadline of the debounced history push.
    pending: Option<Instant>,
    /// Host update deferred while a local edit settles.
    parked: Option<String>,
    /// Serializations sent to the host since the last settle.
    emitted: Vec<String>,
    host: H,
    clock: C,
}

impl<H: EditorHost> EditorSession<H, SystemClock> {
    pub fn new(host: H, config: EditorConfig) -> Self {
        Self::with_clock(host, config, SystemClock)
    }
}

impl<H: EditorHost, C: Clock> EditorSession<H, C> {
    pub fn with_clock(host: H, config: EditorConfig, clock: C) -> Self {
        Self {
            doc: Document::new(),
            history: HistoryStack::new(config.history_depth),
            tracker: SelectionTracker::new(),
            state: SurfaceState::Uninitialized,
            focused: false,
            config,
            pending: None,
            parked: None,
            emitted: Vec::new(),
            host,
            clock,
        }
    }

    // === Accessors ===

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Live selection, if any.
    pub fn selection(&self) -> Option<SelectionRange> {
        self.doc.selection()
    }

    /// Last selection captured while the surface had focus.
    pub fn saved_selection(&self) -> Option<SelectionRange> {
        self.tracker.saved()
    }

    /// Whether a debounced history push is waiting.
    pub fn has_pending_snapshot(&self) -> bool {
        self.pending.is_some()
    }

    pub fn format_state(&self) -> FormatState {
        format::format_state(&self.doc)
    }

    /// Serialized content of the surface.
    pub fn current_html(&self) -> String {
        html::to_html(&self.doc, self.doc.root())
    }

    pub fn word_count(&self) -> usize {
        sanitize::word_count(&self.current_html())
    }

    // === Lifecycle ===

    /// Write the initial content. Only valid once, before anything else.
    pub fn initialize(&mut self, markup: &str) -> bool {
        if self.transition(SurfaceState::Loaded).is_err() {
            return false;
        }
        let clean = sanitize_with_limit(markup, &self.config.load, self.config.max_input_bytes);
        load_markup(&mut self.doc, &clean);
        selection::place_caret_at_end(&mut self.doc);
        self.tracker.clear();
        self.history.reset(self.current_html());
        tracing::debug!(
            target: "folio::surface",
            len = clean.len(),
            "surface initialized"
        );
        true
    }

    /// The host replaced the content from outside (a fetch, a page switch).
    ///
    /// Deferred while a local edit is waiting for its history push. Returns
    /// true if the document was replaced now.
    pub fn on_host_content_replaced(&mut self, markup: &str) -> bool {
        match self.state {
            SurfaceState::Uninitialized => return self.initialize(markup),
            SurfaceState::Loaded | SurfaceState::Editing => {}
            state => {
                tracing::debug!(target: "folio::surface", ?state, "host update ignored");
                return false;
            }
        }
        if self.pending.is_some() {
            tracing::debug!(target: "folio::surface", "local edit pending, parking host update");
            self.parked = Some(markup.to_string());
            return false;
        }
        self.apply_external(markup)
    }

    /// Tear the surface down. Returns the final content for a last save.
    pub fn unmount(&mut self) -> Option<String> {
        let final_html = match self.state {
            SurfaceState::Unmounted => return None,
            SurfaceState::Uninitialized => None,
            _ => Some(self.current_html()),
        };
        if self.pending.take().is_some() {
            tracing::debug!(target: "folio::surface", "dropping pending snapshot on unmount");
        }
        self.parked = None;
        self.emitted.clear();
        self.tracker.clear();
        self.focused = false;
        self.state = SurfaceState::Unmounted;
        tracing::debug!(target: "folio::surface", "surface unmounted");
        final_html
    }

    /// Start a programmatic content swap.
    pub fn suspend(&mut self) -> Result<SuspendGuard<'_, H, C>, EditorError> {
        self.transition(SurfaceState::Suspended)?;
        self.history.set_inhibit(true);
        Ok(SuspendGuard { session: self })
    }

    // === Focus and selection ===

    pub fn focus(&mut self) {
        if !self.begin_edit() {
            return;
        }
        self.focused = true;
        if self.doc.selection().is_none() {
            self.tracker.restore_or_end(&mut self.doc);
        }
    }

    /// Focus left the surface, e.g. for a toolbar control. The selection is
    /// kept for the next command.
    pub fn blur(&mut self) {
        if !self.focused {
            return;
        }
        self.tracker.capture(&self.doc, true);
        self.focused = false;
        self.doc.set_selection(None);
    }

    /// The platform selection moved. Ranges outside the root are dropped.
    pub fn on_selection_change(&mut self, range: Option<SelectionRange>) {
        if !self.state.accepts_input() || !self.focused {
            return;
        }
        match range {
            Some(range) if range.is_valid(&self.doc) => {
                self.doc.set_selection(Some(range));
                self.tracker.capture(&self.doc, true);
            }
            _ => self.doc.set_selection(None),
        }
    }

    /// Select a linear char range, as a user drag would.
    pub fn select_chars(&mut self, start: usize, end: usize) {
        if !self.state.accepts_input() {
            return;
        }
        selection::select_chars(&mut self.doc, start, end);
        self.tracker.capture(&self.doc, true);
    }

    // === Input ===

    /// Handle a raw input event. Returns true if the content changed.
    pub fn on_input(&mut self, event: &InputEvent) -> bool {
        if !self.begin_edit() {
            return false;
        }
        if event.is_line_break() {
            self.flush_pending();
        }
        self.ensure_selection();
        if !execute_input(&mut self.doc, event) {
            return false;
        }
        self.commit_typing();
        true
    }

    /// Insert clipboard contents at the selection.
    ///
    /// HTML is run through the paste profile; plain text is escaped with
    /// newlines kept as line breaks.
    pub fn on_paste(&mut self, clipboard: &impl ClipboardSource) -> bool {
        if !self.begin_edit() {
            return false;
        }
        let markup = match (clipboard.html(), clipboard.text()) {
            (Some(raw), _) => {
                sanitize_with_limit(&raw, &self.config.paste, self.config.max_input_bytes)
            }
            (None, Some(text)) => text_to_html(&text),
            (None, None) => return false,
        };
        let fragment = parse_or_text(&markup);
        self.ensure_selection();
        if !edit::insert_fragment(&mut self.doc, &fragment) {
            return false;
        }
        tracing::debug!(target: "folio::surface", len = markup.len(), "pasted");
        self.commit_typing();
        true
    }

    pub fn on_keydown(&mut self, combo: &KeyCombo) -> KeydownResult {
        if combo.key.is_navigation() || combo.key.is_modifier() {
            return KeydownResult::PassThrough;
        }
        let Some(command) = combo.command() else {
            return KeydownResult::NotHandled;
        };
        if !self.state.accepts_input() {
            return KeydownResult::NotHandled;
        }
        self.execute(&command);
        KeydownResult::Handled
    }

    // === Commands ===

    /// Run a formatting command on the current or saved selection.
    pub fn execute(&mut self, command: &Command) -> CommandOutcome {
        match command {
            Command::Undo => return changed_outcome(self.undo()),
            Command::Redo => return changed_outcome(self.redo()),
            _ => {}
        }
        if !self.begin_edit() {
            return CommandOutcome::Unchanged;
        }
        self.flush_pending();
        self.ensure_selection();
        let outcome = execute_command(&mut self.doc, command);
        match &outcome {
            CommandOutcome::Applied => {
                let html = self.current_html();
                self.emit(&html);
                self.history.push(html);
                self.tracker.capture(&self.doc, true);
                self.settle();
            }
            CommandOutcome::Rejected(notice) => self.host.on_notice(notice),
            CommandOutcome::Unchanged => {}
        }
        outcome
    }

    /// Run a command by its `execCommand` name. Unknown names and bad values
    /// are reported to the host as notices.
    pub fn execute_named(&mut self, name: &str, value: Option<&str>) -> CommandOutcome {
        match Command::parse(name, value) {
            Ok(command) => self.execute(&command),
            Err(error) => {
                tracing::debug!(target: "folio::surface", %error, "command rejected");
                let notice = Notice::from(&error);
                self.host.on_notice(&notice);
                CommandOutcome::Rejected(notice)
            }
        }
    }

    pub fn undo(&mut self) -> bool {
        if !self.begin_edit() {
            return false;
        }
        self.flush_pending();
        match self.history.undo() {
            Some(entry) => self.swap_to(entry.as_str()),
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.begin_edit() {
            return false;
        }
        self.flush_pending();
        match self.history.redo() {
            Some(entry) => self.swap_to(entry.as_str()),
            None => false,
        }
    }

    /// Fire the debounced history push if its deadline has passed.
    pub fn poll_timers(&mut self) -> bool {
        match self.pending {
            Some(due) if self.clock.now() >= due => {
                self.flush_pending();
                true
            }
            _ => false,
        }
    }

    // === Internals ===

    fn transition(&mut self, to: SurfaceState) -> Result<(), EditorError> {
        if !self.state.can_transition_to(to) {
            tracing::debug!(
                target: "folio::surface",
                from = ?self.state,
                to = ?to,
                "invalid surface transition"
            );
            return Err(EditorError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Move to `Editing` on the first event. False if events are not
    /// accepted in the current state.
    fn begin_edit(&mut self) -> bool {
        match self.state {
            SurfaceState::Editing => true,
            SurfaceState::Loaded => self.transition(SurfaceState::Editing).is_ok(),
            state => {
                tracing::debug!(target: "folio::surface", ?state, "event ignored");
                false
            }
        }
    }

    fn ensure_selection(&mut self) {
        if self.doc.selection().is_none() {
            self.tracker.restore_or_end(&mut self.doc);
        }
    }

    fn emit(&mut self, html: &str) {
        self.host.on_change(html);
        self.emitted.push(html.to_string());
    }

    /// Notify the host and schedule a history push.
    fn commit_typing(&mut self) {
        let html = self.current_html();
        self.emit(&html);
        if self.focused {
            self.tracker.capture(&self.doc, true);
        }
        self.pending = Some(self.clock.now() + self.config.debounce());
    }

    fn flush_pending(&mut self) {
        if self.pending.take().is_none() {
            return;
        }
        let html = self.current_html();
        self.history.push(html);
        self.settle();
    }

    /// The local edit is in history. Apply a parked host update unless it is
    /// an echo of something we emitted.
    fn settle(&mut self) {
        if let Some(parked) = self.parked.take() {
            if self.emitted.iter().any(|html| *html == parked) {
                tracing::trace!(target: "folio::surface", "dropping echoed host update");
            } else {
                self.apply_external(&parked);
            }
        }
        self.emitted.clear();
    }

    fn apply_external(&mut self, markup: &str) -> bool {
        let clean = sanitize_with_limit(markup, &self.config.load, self.config.max_input_bytes);
        if clean == self.current_html() {
            return false;
        }
        let html = match self.suspend() {
            Ok(mut guard) => {
                guard.replace_content(&clean);
                guard.html()
            }
            Err(_) => return false,
        };
        self.history.push(html);
        tracing::debug!(target: "folio::surface", "applied host update");
        true
    }

    fn swap_to(&mut self, snapshot: &str) -> bool {
        let html = match self.suspend() {
            Ok(mut guard) => {
                guard.replace_content(snapshot);
                guard.document_mut().set_selection(None);
                guard.html()
            }
            Err(_) => return false,
        };
        // Nothing can be parked once pending edits are flushed, so there is
        // no echo to track.
        self.host.on_change(&html);
        true
    }
}

/// Exclusive access to the document while its content is swapped.
///
/// History pushes are ignored for the guard's lifetime. On drop the saved
/// selection is restored if it still fits, otherwise the caret goes to the
/// end, and the surface returns to `Editing`.
pub struct SuspendGuard<'a, H, C> {
    session: &'a mut EditorSession<H, C>,
}

impl<H, C> SuspendGuard<'_, H, C> {
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.session.doc
    }

    /// Replace the whole content with already-clean markup.
    pub fn replace_content(&mut self, markup: &str) {
        let doc = &mut self.session.doc;
        doc.clear();
        load_markup(doc, markup);
    }

    pub fn html(&self) -> String {
        html::to_html(&self.session.doc, self.session.doc.root())
    }
}

impl<H, C> Drop for SuspendGuard<'_, H, C> {
    fn drop(&mut self) {
        let session = &mut *self.session;
        if session.doc.selection().is_none() {
            let outcome = session.tracker.restore_or_end(&mut session.doc);
            tracing::trace!(target: "folio::surface", ?outcome, "selection after swap");
        }
        session.history.set_inhibit(false);
        session.state = SurfaceState::Editing;
    }
}

fn changed_outcome(changed: bool) -> CommandOutcome {
    if changed {
        CommandOutcome::Applied
    } else {
        CommandOutcome::Unchanged
    }
}

/// Structural pass for everything entering the live document. Styles pass
/// through; active content and unknown tags do not.
const STRUCTURE_ONLY: SanitizeOptions = SanitizeOptions::none();

/// Parse markup into the root. Markup the parser refuses is kept as plain
/// text in a paragraph.
fn load_markup(doc: &mut Document, markup: &str) {
    let root = doc.root();
    match html::parse_into(doc, root, markup, usize::MAX) {
        Ok(_) => sanitize::sanitize_tree(doc, root, &STRUCTURE_ONLY),
        Err(error) => {
            tracing::warn!(target: "folio::surface", %error, "content unparseable, loading as text");
            let text = sanitize::plain_text(markup);
            let fallback = text_to_html(&text);
            let p = doc.create_element("p");
            doc.append_child(root, p);
            if html::parse_into(doc, p, &fallback, usize::MAX).is_err() {
                let t = doc.create_text(text);
                doc.append_child(p, t);
            }
        }
    }
}

fn parse_or_text(markup: &str) -> Document {
    match html::parse_fragment(markup, usize::MAX) {
        Ok(mut doc) => {
            let root = doc.root();
            sanitize::sanitize_tree(&mut doc, root, &STRUCTURE_ONLY);
            doc
        }
        Err(error) => {
            tracing::warn!(target: "folio::surface", %error, "paste unparseable, inserting as text");
            let mut doc = Document::new();
            let root = doc.root();
            let t = doc.create_text(sanitize::plain_text(markup));
            doc.append_child(root, t);
            doc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::platform::{ClipboardData, ManualClock};

    #[derive(Default)]
    struct Recorder {
        changes: Vec<String>,
        notices: Vec<Notice>,
    }

    impl EditorHost for Recorder {
        fn on_change(&mut self, html: &str) {
            self.changes.push(html.to_string());
        }

        fn on_notice(&mut self, notice: &Notice) {
            self.notices.push(notice.clone());
        }
    }

    fn session(clock: &ManualClock, html: &str) -> EditorSession<Recorder, &ManualClock> {
        let mut s = EditorSession::with_clock(Recorder::default(), EditorConfig::default(), clock);
        assert!(s.initialize(html));
        s.focus();
        s
    }

    #[test]
    fn test_state_transitions() {
        use SurfaceState::*;
        assert!(Uninitialized.can_transition_to(Loaded));
        assert!(Suspended.can_transition_to(Editing));
        assert!(!Uninitialized.can_transition_to(Editing));
        assert!(!Unmounted.can_transition_to(Editing));
        assert!(!Suspended.can_transition_to(Unmounted));
    }

    #[test]
    fn test_initialize_once() {
        let clock = ManualClock::new();
        let mut s = EditorSession::with_clock((), EditorConfig::default(), &clock);
        assert!(s.initialize("<p>a</p><script>x</script>"));
        assert_eq!(s.state(), SurfaceState::Loaded);
        assert_eq!(s.current_html(), "<p>a</p>");
        assert_eq!(s.history().len(), 1);
        assert!(!s.initialize("<p>b</p>"));
        assert_eq!(s.current_html(), "<p>a</p>");
    }

    #[test]
    fn test_typing_is_debounced_into_one_snapshot() {
        let clock = ManualClock::new();
        let mut s = session(&clock, "<p>a</p>");
        s.on_input(&InputEvent::InsertText("b".into()));
        s.on_input(&InputEvent::InsertText("c".into()));
        assert_eq!(s.host().changes.len(), 2);
        assert_eq!(s.history().len(), 1);
        clock.advance(Duration::from_millis(100));
        assert!(!s.poll_timers());
        clock.advance(Duration::from_millis(300));
        assert!(s.poll_timers());
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.current_html(), "<p>abc</p>");
    }

    #[test]
    fn test_undo_flushes_pending_and_redo_returns() {
        let clock = ManualClock::new();
        let mut s = session(&clock, "<p>a</p>");
        s.on_input(&InputEvent::InsertText("b".into()));
        assert!(s.undo());
        assert_eq!(s.current_html(), "<p>a</p>");
        assert_eq!(s.state(), SurfaceState::Editing);
        assert!(!s.history().is_inhibited());
        assert!(s.redo());
        assert_eq!(s.current_html(), "<p>ab</p>");
        assert!(!s.redo());
    }

    #[test]
    fn test_undo_redo_do_not_accumulate_emitted() {
        let clock = ManualClock::new();
        let mut s = session(&clock, "<p>a</p>");
        s.select_chars(0, 1);
        assert_eq!(s.execute(&Command::Bold), CommandOutcome::Applied);
        for _ in 0..5 {
            assert!(s.undo());
            assert!(s.redo());
        }
        assert!(s.emitted.is_empty());
        assert_eq!(s.host().changes.len(), 11);
    }

    #[test]
    fn test_oversized_content_is_structurally_cleaned() {
        let clock = ManualClock::new();
        let config = EditorConfig {
            max_input_bytes: 32,
            ..EditorConfig::default()
        };
        let mut s = EditorSession::with_clock((), config, &clock);
        assert!(s.initialize(
            "<p onmouseover=\"steal()\">a<a href=\"data:text/html,boom\">b</a></p><custom-el>c</custom-el><iframe src=\"https://evil\">"
        ));
        let html = s.current_html();
        assert_eq!(html, "<p>a<a>b</a></p>c");
        s.focus();
        let pasted = "<p>d<script>steal()</script><a href=\" javascript:steal()\">e</a></p>";
        assert!(s.on_paste(&ClipboardData::from_html(pasted)));
        let html = s.current_html();
        assert!(!html.contains("<script"));
        assert!(!html.contains("javascript"));
        let doc = s.document();
        assert!(doc.text_content(doc.root()).contains("de"));
    }

    #[test]
    fn test_rejected_command_notifies_host() {
        let clock = ManualClock::new();
        let mut s = session(&clock, "<p>hello</p>");
        s.select_chars(0, 5);
        let outcome = s.execute_named("createLink", Some("not a url"));
        assert!(matches!(outcome, CommandOutcome::Rejected(_)));
        assert_eq!(s.host().notices.len(), 1);
        assert_eq!(s.current_html(), "<p>hello</p>");
        assert!(matches!(
            s.execute_named("fontName", Some("Arial")),
            CommandOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_command_uses_saved_selection_after_blur() {
        let clock = ManualClock::new();
        let mut s = session(&clock, "<p>hello world</p>");
        s.select_chars(0, 5);
        s.blur();
        assert_eq!(s.selection(), None);
        assert_eq!(s.execute(&Command::Bold), CommandOutcome::Applied);
        assert_eq!(s.current_html(), "<p><b>hello</b> world</p>");
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn test_unmount_is_terminal() {
        let clock = ManualClock::new();
        let mut s = session(&clock, "<p>a</p>");
        s.on_input(&InputEvent::InsertText("b".into()));
        assert_eq!(s.unmount().as_deref(), Some("<p>ab</p>"));
        assert!(!s.has_pending_snapshot());
        assert!(!s.on_input(&InputEvent::InsertText("c".into())));
        assert_eq!(s.unmount(), None);
        assert!(s.suspend().is_err());
    }
}
