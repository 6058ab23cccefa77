use chrono::{DateTime, Utc};
use folio_editor_core::{
    Clock, Command, CommandOutcome, EditorSession, SystemClock, ThemeSpec,
    normalize_alignment_markers, plain_text, sanitize, slugify,
};

use super::{FormHost, HostPage, PageEditor, draft_key, split_list};
use crate::config::HostConfig;
use crate::draft::{DraftAutosave, DraftStore};
use crate::error::{HostError, Result};
use crate::store::{BlogPostRecord, ContentStore, Record, RecordKind, ThemeSettings};

pub const DEFAULT_ACCENT: &str = "#4f46e5";

const EXCERPT_CHARS: usize = 200;

/// `#rgb` or `#rrggbb`, otherwise the default accent.
pub fn clamp_accent(raw: &str) -> String {
    let raw = raw.trim();
    let valid = raw.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    });
    if valid {
        raw.to_string()
    } else {
        DEFAULT_ACCENT.to_string()
    }
}

fn excerpt(html: &str) -> String {
    let text = plain_text(html).split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > EXCERPT_CHARS {
        let head: String = text.chars().take(EXCERPT_CHARS - 3).collect();
        format!("{head}…")
    } else {
        text
    }
}

/// Blog post editor: title, slug, tags, accent color, theme and body.
pub struct BlogEditPage<C = SystemClock> {
    id: Option<String>,
    title: String,
    slug: String,
    /// Once the author edits the slug it stops following the title.
    slug_edited: bool,
    tags_text: String,
    accent: String,
    theme: ThemeSettings,
    created_at: Option<DateTime<Utc>>,
    editor: PageEditor<C>,
    autosave: DraftAutosave<C>,
}

impl<C: Clock + Clone> BlogEditPage<C> {
    pub fn new(config: &HostConfig, clock: C) -> Self {
        Self::build(None, "", config, clock)
    }

    /// Open a stored post. Legacy alignment markers in the body are
    /// converted before it is sanitized into the editor.
    pub fn open(record: BlogPostRecord, config: &HostConfig, clock: C) -> Self {
        let body = normalize_alignment_markers(&record.body_html);
        let mut page = Self::build(record.id, &body, config, clock);
        page.slug_edited = !record.slug.is_empty();
        page.slug = if record.slug.is_empty() {
            slugify(&record.title)
        } else {
            record.slug
        };
        page.title = record.title;
        page.tags_text = record.tags.join(", ");
        page.accent = clamp_accent(&record.color);
        page.theme = record.theme;
        page.created_at = Some(record.created_at);
        page
    }

    pub fn load(store: &dyn ContentStore, id: &str, config: &HostConfig, clock: C) -> Result<Self> {
        match store.get(RecordKind::BlogPost, id)? {
            Some(Record::BlogPost(record)) => Ok(Self::open(record, config, clock)),
            _ => Err(HostError::NotFound {
                kind: RecordKind::BlogPost,
                id: id.to_string(),
            }),
        }
    }

    fn build(id: Option<String>, body: &str, config: &HostConfig, clock: C) -> Self {
        let mut editor =
            EditorSession::with_clock(FormHost::default(), config.blog.clone(), clock.clone());
        editor.initialize(body);
        let key = draft_key(RecordKind::BlogPost, id.as_deref());
        Self {
            id,
            title: String::new(),
            slug: String::new(),
            slug_edited: false,
            tags_text: String::new(),
            accent: DEFAULT_ACCENT.to_string(),
            theme: ThemeSettings::default(),
            created_at: None,
            editor,
            autosave: DraftAutosave::new(key, config.autosave(), clock),
        }
    }

    /// Pick up a local draft left by an earlier visit. Returns true if one
    /// was applied.
    pub fn restore_draft(&mut self, drafts: &mut dyn DraftStore) -> bool {
        let Some(draft) = self.autosave.restore::<BlogPostRecord>(drafts) else {
            return false;
        };
        self.title = draft.title;
        self.slug = draft.slug;
        self.slug_edited = !self.slug.is_empty();
        self.tags_text = draft.tags.join(", ");
        self.accent = clamp_accent(&draft.color);
        self.theme = draft.theme;
        self.editor.on_host_content_replaced(&draft.body_html);
        tracing::debug!(target: "folio::host", key = self.autosave.key(), "restored blog draft");
        true
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        if !self.slug_edited {
            self.slug = slugify(&self.title);
        }
        self.autosave.schedule();
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Set the slug by hand. Clearing it makes it follow the title again.
    pub fn set_slug(&mut self, raw: &str) {
        self.slug = slugify(raw);
        self.slug_edited = !self.slug.is_empty();
        if !self.slug_edited {
            self.slug = slugify(&self.title);
        }
        self.autosave.schedule();
    }

    pub fn tags(&self) -> Vec<String> {
        split_list(&self.tags_text)
    }

    pub fn set_tags(&mut self, text: impl Into<String>) {
        self.tags_text = text.into();
        self.autosave.schedule();
    }

    pub fn accent(&self) -> &str {
        &self.accent
    }

    /// Returns false if the color was not a hex color and the default was
    /// used instead.
    pub fn set_accent(&mut self, raw: &str) -> bool {
        self.accent = clamp_accent(raw);
        self.autosave.schedule();
        self.accent == raw.trim()
    }

    pub fn theme(&self) -> &ThemeSettings {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: ThemeSettings) {
        self.theme = theme;
        self.autosave.schedule();
    }

    /// Push the accent and theme onto every block of the body.
    pub fn apply_theme(&mut self) -> CommandOutcome {
        let spec = ThemeSpec {
            accent: self.accent.clone(),
            font_family: Some(self.theme.font_family.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string),
            base_px: self.theme.base_px,
            heading_scale: self.theme.heading_scale,
        };
        self.editor.execute(&Command::ApplyTheme(spec))
    }

    pub fn excerpt(&self) -> String {
        excerpt(&self.editor.current_html())
    }

    fn record(&self) -> BlogPostRecord {
        let now = Utc::now();
        let title = match self.title.trim() {
            "" => "Untitled".to_string(),
            t => t.to_string(),
        };
        let slug = if self.slug.is_empty() {
            slugify(&title)
        } else {
            self.slug.clone()
        };
        let body_html = self.editor.current_html();
        BlogPostRecord {
            id: self.id.clone(),
            title,
            slug,
            excerpt: excerpt(&body_html),
            tags: self.tags(),
            body_html,
            color: clamp_accent(&self.accent),
            theme: self.theme.clone(),
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        }
    }
}

impl<C: Clock + Clone> HostPage<C> for BlogEditPage<C> {
    fn kind(&self) -> RecordKind {
        RecordKind::BlogPost
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
        Record::BlogPost(self.record())
    }

    fn save(&mut self, store: &mut dyn ContentStore) -> Result<String> {
        let mut record = self.record();
        record.body_html = sanitize(&record.body_html, &self.editor.config().load);
        record.excerpt = excerpt(&record.body_html);
        let created_at = record.created_at;
        let id = store.put(Record::BlogPost(record))?;
        tracing::info!(target: "folio::host", %id, "blog post saved");
        self.id = Some(id.clone());
        self.created_at = Some(created_at);
        Ok(id)
    }
}
