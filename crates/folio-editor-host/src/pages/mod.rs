//! The three form pages that embed an editing session.
//!
//! A page owns its form fields, one [`EditorSession`] for its rich-text
//! field and a [`DraftAutosave`]. The embedding UI forwards editor events to
//! [`HostPage::editor_mut`], calls [`HostPage::tick`] from its timer loop and
//! [`HostPage::unmount`] when navigating away.

mod blog;
mod experience;
mod project;

pub use blog::{BlogEditPage, DEFAULT_ACCENT, clamp_accent};
pub use experience::{ExperienceForm, ExperiencePage};
pub use project::{ProjectForm, ProjectPage};

use folio_editor_core::{Clock, EditorHost, EditorSession, Notice, SurfaceState};

use crate::draft::{DraftAutosave, DraftStore};
use crate::error::Result;
use crate::store::{ContentStore, Record, RecordKind};

/// Session host for a form page. Remembers that the content changed and
/// keeps rejected-command notices for display.
#[derive(Debug, Default)]
pub struct FormHost {
    changed: bool,
    notices: Vec<Notice>,
}

impl FormHost {
    /// Whether the content changed since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn clear_notices(&mut self) {
        self.notices.clear();
    }
}

impl EditorHost for FormHost {
    fn on_change(&mut self, html: &str) {
        tracing::trace!(target: "folio::host", len = html.len(), "editor content changed");
        self.changed = true;
    }

    fn on_notice(&mut self, notice: &Notice) {
        tracing::info!(target: "folio::host", kind = ?notice.kind, "{notice}");
        self.notices.push(notice.clone());
    }
}

pub type PageEditor<C> = EditorSession<FormHost, C>;

pub trait HostPage<C: Clock> {
    fn kind(&self) -> RecordKind;

    fn editor(&self) -> &PageEditor<C>;

    fn editor_mut(&mut self) -> &mut PageEditor<C>;

    fn autosave_mut(&mut self) -> &mut DraftAutosave<C>;

    /// Form state as a record, body taken from the live editor.
    fn to_record(&self) -> Record;

    /// Validate, sanitize the body and store. Returns the record id.
    fn save(&mut self, store: &mut dyn ContentStore) -> Result<String>;

    /// Save, then drop the local draft.
    fn publish(
        &mut self,
        store: &mut dyn ContentStore,
        drafts: &mut dyn DraftStore,
    ) -> Result<String> {
        let id = self.save(store)?;
        self.autosave_mut().discard(drafts);
        Ok(id)
    }

    /// Fire due editor timers and write the draft once edits are quiet.
    /// Returns true if a draft was written.
    fn tick(&mut self, drafts: &mut dyn DraftStore) -> Result<bool> {
        self.editor_mut().poll_timers();
        if self.editor_mut().host_mut().take_changed() {
            self.autosave_mut().schedule();
        }
        if !self.autosave_mut().is_due() {
            return Ok(false);
        }
        let record = self.to_record();
        self.autosave_mut().poll(&record, drafts)
    }

    /// Final save, then tear the editor down. `None` if already unmounted.
    fn unmount(&mut self, store: &mut dyn ContentStore) -> Result<Option<String>> {
        if self.editor().state() == SurfaceState::Unmounted {
            return Ok(None);
        }
        self.autosave_mut().cancel();
        let saved = self.save(store);
        self.editor_mut().unmount();
        tracing::debug!(target: "folio::host", kind = %self.kind(), ok = saved.is_ok(), "page unmounted");
        saved.map(Some)
    }
}

fn draft_key(kind: RecordKind, id: Option<&str>) -> String {
    format!("draft:{kind}:{}", id.unwrap_or("new"))
}

/// Split a comma-separated field into trimmed, non-empty entries.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" rust, ,wasm ,"), vec!["rust", "wasm"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_draft_key() {
        assert_eq!(draft_key(RecordKind::BlogPost, None), "draft:blog_post:new");
        assert_eq!(draft_key(RecordKind::Project, Some("7")), "draft:project:7");
    }
}
