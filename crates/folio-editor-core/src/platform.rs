//! Platform abstraction traits for the editing session.
//!
//! These traits define the interface between the session and whatever hosts
//! it (browser bindings, native UI, tests). The session never reaches out
//! to a platform directly: content notifications go through [`EditorHost`],
//! time comes from a [`Clock`], and paste data from a [`ClipboardSource`].

use std::cell::Cell;
use std::time::Duration;

use web_time::Instant;

use crate::commands::Notice;

/// Outbound seam to the page that owns the session.
pub trait EditorHost {
    /// Called after every committed edit with the serialized content.
    fn on_change(&mut self, html: &str);

    /// Called when a command is rejected with a user-facing message.
    fn on_notice(&mut self, notice: &Notice) {
        tracing::info!(target: "folio::host", kind = ?notice.kind, "{notice}");
    }
}

/// Host that ignores every notification.
impl EditorHost for () {
    fn on_change(&mut self, _html: &str) {}
}

/// Source of the current time for debounce timers.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Shared by reference between a test
/// and the session it drives.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Read access to pasted data.
///
/// Implemented over a platform paste event; [`ClipboardData`] is the owned
/// form used by hosts and tests.
pub trait ClipboardSource {
    /// `text/html` payload, if present.
    fn html(&self) -> Option<String>;

    /// `text/plain` payload, if present.
    fn text(&self) -> Option<String>;
}

/// Owned clipboard contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardData {
    pub html: Option<String>,
    pub text: Option<String>,
}

impl ClipboardData {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            text: None,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            html: None,
            text: Some(text.into()),
        }
    }
}

impl ClipboardSource for ClipboardData {
    fn html(&self) -> Option<String> {
        self.html.clone().filter(|h| !h.trim().is_empty())
    }

    fn text(&self) -> Option<String> {
        self.text.clone().filter(|t| !t.is_empty())
    }
}
