//! folio-editor-host: the form pages that embed a folio editing session.
//!
//! Each page owns its form fields and an [`EditorSession`](folio_editor_core::EditorSession),
//! writes debounced local drafts, and saves through a [`ContentStore`].

pub mod config;
pub mod draft;
pub mod error;
pub mod pages;
pub mod store;
pub mod telemetry;

pub use config::HostConfig;
pub use draft::{DraftAutosave, DraftStore, MemoryDraftStore};
pub use error::HostError;
pub use pages::{
    BlogEditPage, ExperienceForm, ExperiencePage, FormHost, HostPage, PageEditor, ProjectForm,
    ProjectPage,
};
pub use store::{
    BlogPostRecord, ContentStore, ExperienceRecord, MemoryStore, ProjectLinks, ProjectRecord,
    Record, RecordKind, ThemeSettings,
};
