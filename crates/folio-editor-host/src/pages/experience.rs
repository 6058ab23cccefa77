use folio_editor_core::{Clock, EditorSession, SystemClock, plain_text, sanitize};
use serde::{Deserialize, Serialize};

use super::{FormHost, HostPage, PageEditor, collapse_whitespace, draft_key, split_list};
use crate::config::HostConfig;
use crate::draft::DraftAutosave;
use crate::error::{HostError, Result};
use crate::store::{ContentStore, ExperienceRecord, Record, RecordKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceForm {
    pub company: String,
    pub role: String,
    pub project: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub is_current: bool,
    /// Comma-separated tools and skills.
    pub tags: String,
}

/// Work experience entry with a rich-text description.
pub struct ExperiencePage<C = SystemClock> {
    id: Option<String>,
    form: ExperienceForm,
    editor: PageEditor<C>,
    autosave: DraftAutosave<C>,
}

impl<C: Clock + Clone> ExperiencePage<C> {
    pub fn new(config: &HostConfig, clock: C) -> Self {
        Self::build(None, ExperienceForm::default(), "", config, clock)
    }

    pub fn open(record: ExperienceRecord, config: &HostConfig, clock: C) -> Self {
        let form = ExperienceForm {
            company: record.company,
            role: record.role,
            project: record.project,
            location: record.location,
            start_date: record.start_date,
            is_current: record.end_date.is_none(),
            end_date: record.end_date.unwrap_or_default(),
            tags: record.tags.join(", "),
        };
        Self::build(record.id, form, &record.description_html, config, clock)
    }

    pub fn load(store: &dyn ContentStore, id: &str, config: &HostConfig, clock: C) -> Result<Self> {
        match store.get(RecordKind::Experience, id)? {
            Some(Record::Experience(record)) => Ok(Self::open(record, config, clock)),
            _ => Err(HostError::NotFound {
                kind: RecordKind::Experience,
                id: id.to_string(),
            }),
        }
    }

    fn build(
        id: Option<String>,
        form: ExperienceForm,
        body: &str,
        config: &HostConfig,
        clock: C,
    ) -> Self {
        let mut editor =
            EditorSession::with_clock(FormHost::default(), config.experience.clone(), clock.clone());
        editor.initialize(body);
        let key = draft_key(RecordKind::Experience, id.as_deref());
        Self {
            id,
            form,
            editor,
            autosave: DraftAutosave::new(key, config.autosave(), clock),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn form(&self) -> &ExperienceForm {
        &self.form
    }

    /// Edit the form fields. Schedules a draft write.
    pub fn form_mut(&mut self) -> &mut ExperienceForm {
        self.autosave.schedule();
        &mut self.form
    }

    pub fn validate(&self) -> Result<()> {
        if self.form.company.trim().is_empty() {
            return Err(HostError::MissingField { field: "company" });
        }
        if self.form.start_date.trim().is_empty() {
            return Err(HostError::MissingField { field: "start_date" });
        }
        Ok(())
    }

    fn record(&self, description_html: String) -> ExperienceRecord {
        let form = &self.form;
        let end_date = match form.end_date.trim() {
            _ if form.is_current => None,
            "" => None,
            end => Some(end.to_string()),
        };
        ExperienceRecord {
            id: self.id.clone(),
            company: form.company.trim().to_string(),
            role: form.role.trim().to_string(),
            project: form.project.trim().to_string(),
            location: form.location.trim().to_string(),
            start_date: form.start_date.trim().to_string(),
            end_date,
            description: collapse_whitespace(&plain_text(&description_html)),
            description_html,
            tags: split_list(&form.tags),
        }
    }
}

impl<C: Clock + Clone> HostPage<C> for ExperiencePage<C> {
    fn kind(&self) -> RecordKind {
        RecordKind::Experience
    }

    fn editor(&self) -> &PageEditor<C> {
        &self.editor
    }

    fn editor_mut(&mut self) -> &mut PageEditor<C> {
        &mut self.editor
    }

    fn autosave_mut(&mut self) -> &mut DraftAutosave<C> {
        &mut self.autosave
    }

    fn to_record(&self) -> Record {
        Record::Experience(self.record(self.editor.current_html()))
    }

    fn save(&mut self, store: &mut dyn ContentStore) -> Result<String> {
        self.validate()?;
        let html = sanitize(&self.editor.current_html(), &self.editor.config().load);
        let id = store.put(Record::Experience(self.record(html)))?;
        tracing::info!(target: "folio::host", %id, "experience saved");
        self.id = Some(id.clone());
        Ok(id)
    }
}
