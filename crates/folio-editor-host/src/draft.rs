//! Local drafts: debounced snapshots of a page's form state.

use std::collections::HashMap;
use std::time::Duration;

use folio_editor_core::Clock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use web_time::Instant;

use crate::error::Result;

/// Key/value storage for draft JSON (browser local storage or similar).
pub trait DraftStore {
    fn load(&self, key: &str) -> Option<String>;
    fn store(&mut self, key: &str, json: String);
    fn remove(&mut self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: HashMap<String, String>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, key: &str) -> Option<String> {
        self.drafts.get(key).cloned()
    }

    fn store(&mut self, key: &str, json: String) {
        self.drafts.insert(key.to_string(), json);
    }

    fn remove(&mut self, key: &str) {
        self.drafts.remove(key);
    }
}

/// Writes a draft once edits have been quiet for `delay`.
#[derive(Debug)]
pub struct DraftAutosave<C> {
    key: String,
    delay: Duration,
    due: Option<Instant>,
    clock: C,
}

impl<C: Clock> DraftAutosave<C> {
    pub fn new(key: impl Into<String>, delay: Duration, clock: C) -> Self {
        Self {
            key: key.into(),
            delay,
            due: None,
            clock,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Restart the quiet period.
    pub fn schedule(&mut self) {
        self.due = Some(self.clock.now() + self.delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn is_due(&self) -> bool {
        self.due.is_some_and(|due| self.clock.now() >= due)
    }

    /// Write `draft` if the quiet period is over. Returns true if written.
    pub fn poll<T: Serialize>(&mut self, draft: &T, store: &mut dyn DraftStore) -> Result<bool> {
        if !self.is_due() {
            return Ok(false);
        }
        self.due = None;
        let json = serde_json::to_string(draft)?;
        tracing::trace!(target: "folio::draft", key = %self.key, len = json.len(), "draft written");
        store.store(&self.key, json);
        Ok(true)
    }

    /// Read a previously written draft. Unreadable drafts are discarded.
    pub fn restore<T: DeserializeOwned>(&self, store: &mut dyn DraftStore) -> Option<T> {
        let raw = store.load(&self.key)?;
        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(error) => {
                tracing::warn!(target: "folio::draft", key = %self.key, %error, "discarding unreadable draft");
                store.remove(&self.key);
                None
            }
        }
    }

    pub fn discard(&mut self, store: &mut dyn DraftStore) {
        self.due = None;
        store.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_editor_core::ManualClock;

    #[test]
    fn test_autosave_waits_for_quiet_period() {
        let clock = ManualClock::new();
        let mut store = MemoryDraftStore::new();
        let mut autosave = DraftAutosave::new("draft:test", Duration::from_millis(800), &clock);
        assert!(!autosave.poll(&"a", &mut store).expect("poll"));

        autosave.schedule();
        clock.advance(Duration::from_millis(500));
        autosave.schedule();
        clock.advance(Duration::from_millis(500));
        assert!(!autosave.poll(&"b", &mut store).expect("poll"));
        clock.advance(Duration::from_millis(300));
        assert!(autosave.poll(&"c", &mut store).expect("poll"));
        assert_eq!(store.load("draft:test").as_deref(), Some("\"c\""));
        assert!(!autosave.is_pending());
        assert_eq!(autosave.restore::<String>(&mut store).as_deref(), Some("c"));
    }

    #[test]
    fn test_unreadable_draft_is_dropped() {
        let clock = ManualClock::new();
        let mut store = MemoryDraftStore::new();
        store.store("draft:x", "{not json".into());
        let autosave = DraftAutosave::new("draft:x", Duration::ZERO, &clock);
        assert_eq!(autosave.restore::<Vec<u8>>(&mut store), None);
        assert_eq!(store.load("draft:x"), None);
    }
}
