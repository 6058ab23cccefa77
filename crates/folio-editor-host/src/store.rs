//! Persisted records and the CRUD seam they go through.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    BlogPost,
    Experience,
    Project,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlogPost => "blog_post",
            Self::Experience => "experience",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typography chosen for a post. The accent color is stored beside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeSettings {
    pub font_family: String,
    pub base_px: f32,
    pub heading_scale: f32,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            font_family: String::new(),
            base_px: 16.0,
            heading_scale: 1.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostRecord {
    pub id: Option<String>,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub body_html: String,
    pub color: String,
    pub theme: ThemeSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRecord {
    pub id: Option<String>,
    pub company: String,
    pub role: String,
    pub project: String,
    pub location: String,
    pub start_date: String,
    /// `None` while the role is current.
    pub end_date: Option<String>,
    pub description_html: String,
    /// Tag-free description for list views.
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLinks {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: Option<String>,
    pub name: String,
    pub summary: String,
    pub tech_stack: Vec<String>,
    pub images: Vec<String>,
    pub featured: bool,
    pub sort_order: i32,
    pub client: String,
    pub role: String,
    pub location: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<ProjectLinks>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    BlogPost(BlogPostRecord),
    Experience(ExperienceRecord),
    Project(ProjectRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::BlogPost(_) => RecordKind::BlogPost,
            Self::Experience(_) => RecordKind::Experience,
            Self::Project(_) => RecordKind::Project,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::BlogPost(r) => r.id.as_deref(),
            Self::Experience(r) => r.id.as_deref(),
            Self::Project(r) => r.id.as_deref(),
        }
    }

    fn set_id(&mut self, id: String) {
        let slot = match self {
            Self::BlogPost(r) => &mut r.id,
            Self::Experience(r) => &mut r.id,
            Self::Project(r) => &mut r.id,
        };
        *slot = Some(id);
    }
}

/// Where saved pages go.
pub trait ContentStore {
    fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Record>>;

    /// Insert or update. Records without an id get one assigned, which is
    /// returned.
    fn put(&mut self, record: Record) -> Result<String>;
}

/// In-memory store for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<(RecordKind, String), Record>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ContentStore for MemoryStore {
    fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Record>> {
        Ok(self.records.get(&(kind, id.to_string())).cloned())
    }

    fn put(&mut self, mut record: Record) -> Result<String> {
        let kind = record.kind();
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => {
                self.next_id += 1;
                let id = format!("{kind}-{}", self.next_id);
                record.set_id(id.clone());
                id
            }
        };
        tracing::debug!(target: "folio::store", %kind, %id, "record stored");
        self.records.insert((kind, id.clone()), record);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str) -> ProjectRecord {
        ProjectRecord {
            id: None,
            name: name.into(),
            summary: String::new(),
            tech_stack: vec![],
            images: vec![],
            featured: false,
            sort_order: 0,
            client: String::new(),
            role: String::new(),
            location: String::new(),
            start_date: String::new(),
            end_date: None,
            status: "In Progress".into(),
            links: None,
        }
    }

    #[test]
    fn test_put_assigns_and_keeps_ids() {
        let mut store = MemoryStore::new();
        let id = store.put(Record::Project(project("a"))).expect("put");
        assert_eq!(id, "project-1");
        let Some(Record::Project(mut saved)) =
            store.get(RecordKind::Project, &id).expect("get")
        else {
            panic!("project missing");
        };
        assert_eq!(saved.id.as_deref(), Some("project-1"));
        saved.name = "b".into();
        assert_eq!(store.put(Record::Project(saved)).expect("put"), id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(RecordKind::BlogPost, &id).expect("get"), None);
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(Record::Project(project("x"))).expect("json");
        assert_eq!(json["kind"], "project");
        assert_eq!(json["techStack"], serde_json::json!([]));
        assert!(json.get("links").is_none());
    }
}
