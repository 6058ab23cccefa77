use folio_editor_core::{Clock, EditorSession, SystemClock, format::validate_url, sanitize};
use serde::{Deserialize, Serialize};

use super::{FormHost, HostPage, PageEditor, draft_key, split_list};
use crate::config::HostConfig;
use crate::draft::DraftAutosave;
use crate::error::{HostError, Result};
use crate::store::{ContentStore, ProjectLinks, ProjectRecord, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub name: String,
    pub project_url: String,
    /// Comma-separated.
    pub tech_stack: String,
    /// Comma-separated image URLs.
    pub images: String,
    pub featured: bool,
    pub sort_order: i32,
    pub client: String,
    pub role: String,
    pub location: String,
    /// `YYYY-MM`.
    pub start: String,
    /// `YYYY-MM`, empty while ongoing.
    pub end: String,
    pub status: String,
}

impl Default for ProjectForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            project_url: String::new(),
            tech_stack: String::new(),
            images: String::new(),
            featured: false,
            sort_order: 0,
            client: String::new(),
            role: String::new(),
            location: String::new(),
            start: String::new(),
            end: String::new(),
            status: "In Progress".to_string(),
        }
    }
}

fn year_month(raw: &str) -> Option<(u32, u32)> {
    let (year, month) = raw.trim().split_once('-')?;
    let year = year.parse().ok().filter(|y| *y > 0)?;
    let month = month.parse().ok().filter(|m| (1..=12).contains(m))?;
    Some((year, month))
}

/// Portfolio project with a rich-text summary.
pub struct ProjectPage<C = SystemClock> {
    id: Option<String>,
    form: ProjectForm,
    editor: PageEditor<C>,
    autosave: DraftAutosave<C>,
}

impl<C: Clock + Clone> ProjectPage<C> {
    pub fn new(config: &HostConfig, clock: C) -> Self {
        Self::build(None, ProjectForm::default(), "", config, clock)
    }

    pub fn open(record: ProjectRecord, config: &HostConfig, clock: C) -> Self {
        let form = ProjectForm {
            name: record.name,
            project_url: record.links.map(|l| l.url).unwrap_or_default(),
            tech_stack: record.tech_stack.join(", "),
            images: record.images.join(", "),
            featured: record.featured,
            sort_order: record.sort_order,
            client: record.client,
            role: record.role,
            location: record.location,
            start: record.start_date,
            end: record.end_date.unwrap_or_default(),
            status: record.status,
        };
        Self::build(record.id, form, &record.summary, config, clock)
    }

    pub fn load(store: &dyn ContentStore, id: &str, config: &HostConfig, clock: C) -> Result<Self> {
        match store.get(RecordKind::Project, id)? {
            Some(Record::Project(record)) => Ok(Self::open(record, config, clock)),
            _ => Err(HostError::NotFound {
                kind: RecordKind::Project,
                id: id.to_string(),
            }),
        }
    }

    fn build(
        id: Option<String>,
        form: ProjectForm,
        body: &str,
        config: &HostConfig,
        clock: C,
    ) -> Self {
        let mut editor =
            EditorSession::with_clock(FormHost::default(), config.project.clone(), clock.clone());
        editor.initialize(body);
        let key = draft_key(RecordKind::Project, id.as_deref());
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

    pub fn form(&self) -> &ProjectForm {
        &self.form
    }

    /// Edit the form fields. Schedules a draft write.
    pub fn form_mut(&mut self) -> &mut ProjectForm {
        self.autosave.schedule();
        &mut self.form
    }

    /// Check required fields, the link and the date range. Returns the
    /// link target, if one was given.
    pub fn validate(&self) -> Result<Option<String>> {
        let form = &self.form;
        if form.name.trim().is_empty() {
            return Err(HostError::MissingField { field: "name" });
        }
        let url = match form.project_url.trim() {
            "" => None,
            raw => Some(validate_url(raw).map_err(|_| HostError::InvalidField {
                field: "project_url",
                message: "enter a valid URL (include http/https)".into(),
            })?),
        };
        let start = match form.start.trim() {
            "" => None,
            raw => Some(year_month(raw).ok_or_else(|| HostError::InvalidField {
                field: "start",
                message: format!("{raw:?} is not YYYY-MM"),
            })?),
        };
        if !form.end.trim().is_empty() {
            let end = year_month(&form.end).ok_or_else(|| HostError::InvalidField {
                field: "end",
                message: format!("{:?} is not YYYY-MM", form.end.trim()),
            })?;
            if start.is_some_and(|start| end < start) {
                return Err(HostError::InvalidField {
                    field: "end",
                    message: "end date must be after start date".into(),
                });
            }
        }
        Ok(url)
    }

    fn record(&self, summary: String, url: Option<String>) -> ProjectRecord {
        let form = &self.form;
        ProjectRecord {
            id: self.id.clone(),
            name: form.name.trim().to_string(),
            summary,
            tech_stack: split_list(&form.tech_stack),
            images: split_list(&form.images),
            featured: form.featured,
            sort_order: form.sort_order,
            client: form.client.trim().to_string(),
            role: form.role.trim().to_string(),
            location: form.location.trim().to_string(),
            start_date: form.start.trim().to_string(),
            end_date: Some(form.end.trim())
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            status: form.status.clone(),
            links: url.map(|url| ProjectLinks { url }),
        }
    }
}

impl<C: Clock + Clone> HostPage<C> for ProjectPage<C> {
    fn kind(&self) -> RecordKind {
        RecordKind::Project
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
        let url = Some(self.form.project_url.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        Record::Project(self.record(self.editor.current_html(), url))
    }

    fn save(&mut self, store: &mut dyn ContentStore) -> Result<String> {
        let url = self.validate()?;
        let summary = sanitize(&self.editor.current_html(), &self.editor.config().load);
        let id = store.put(Record::Project(self.record(summary, url)))?;
        tracing::info!(target: "folio::host", %id, "project saved");
        self.id = Some(id.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month() {
        assert_eq!(year_month("2024-03"), Some((2024, 3)));
        assert_eq!(year_month("2024-13"), None);
        assert_eq!(year_month("2024"), None);
    }
}
