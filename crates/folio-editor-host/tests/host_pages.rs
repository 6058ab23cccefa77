// Host pages driving editing sessions through save, drafts and unmount.

use std::time::Duration;

use chrono::Utc;
use folio_editor_core::{
    ClipboardData, Command, CommandOutcome, InputEvent, ManualClock, SurfaceState,
};
use folio_editor_host::{
    BlogEditPage, BlogPostRecord, ContentStore, DraftStore, ExperiencePage, HostConfig, HostError,
    HostPage, MemoryDraftStore, MemoryStore, PageEditor, ProjectPage, Record, RecordKind, ThemeSettings,
};

fn type_text(editor: &mut PageEditor<&ManualClock>, text: &str) {
    editor.focus();
    for c in text.chars() {
        editor.on_input(&InputEvent::InsertText(c.to_string()));
    }
}

#[test]
fn blog_post_round_trip() {
    let clock = ManualClock::new();
    let config = HostConfig::default();
    let mut store = MemoryStore::new();

    let mut page = BlogEditPage::new(&config, &clock);
    page.set_title("Hello, World!");
    assert_eq!(page.slug(), "hello-world");
    page.set_tags("rust, editors, ");
    assert!(!page.set_accent("purple"));
    assert_eq!(page.accent(), "#4f46e5");
    type_text(page.editor_mut(), "First post");

    let id = page.save(&mut store).expect("save");
    assert_eq!(page.id(), Some(id.as_str()));

    let Some(Record::BlogPost(saved)) = store.get(RecordKind::BlogPost, &id).expect("get") else {
        panic!("post missing");
    };
    assert_eq!(saved.title, "Hello, World!");
    assert_eq!(saved.tags, vec!["rust", "editors"]);
    assert_eq!(saved.excerpt, "First post");
    insta::assert_snapshot!(saved.body_html, @"<p>First post</p>");

    let reopened = BlogEditPage::load(&store, &id, &config, &clock).expect("load");
    assert_eq!(reopened.title(), "Hello, World!");
    assert_eq!(reopened.slug(), "hello-world");
    assert_eq!(reopened.editor().current_html(), saved.body_html);
}

#[test]
fn blog_slug_stops_following_title_once_edited() {
    let clock = ManualClock::new();
    let mut page = BlogEditPage::new(&HostConfig::default(), &clock);
    page.set_title("One");
    page.set_slug("Custom Slug");
    page.set_title("Two");
    assert_eq!(page.slug(), "custom-slug");
    page.set_slug("");
    assert_eq!(page.slug(), "two");
}

#[test]
fn blog_load_converts_alignment_markers() {
    let clock = ManualClock::new();
    let now = Utc::now();
    let record = BlogPostRecord {
        id: Some("p1".into()),
        title: "T".into(),
        slug: String::new(),
        excerpt: String::new(),
        tags: vec![],
        body_html: ":::align-center Centered\n<p style=\"background: yellow\">x</p>".into(),
        color: "#123".into(),
        theme: ThemeSettings::default(),
        created_at: now,
        updated_at: now,
    };
    let page = BlogEditPage::open(record, &HostConfig::default(), &clock);
    let html = page.editor().current_html();
    assert!(html.contains("text-align: center"));
    assert!(!html.contains(":::"));
    assert!(!html.contains("background"));
    assert_eq!(page.slug(), "t");
    assert_eq!(page.accent(), "#123");
}

#[test]
fn blog_theme_is_applied_to_body() {
    let clock = ManualClock::new();
    let mut page = BlogEditPage::new(&HostConfig::default(), &clock);
    type_text(page.editor_mut(), "Body");
    page.set_accent("#112233");
    page.set_theme(ThemeSettings {
        font_family: "Georgia".into(),
        base_px: 18.0,
        heading_scale: 1.2,
    });
    assert_eq!(page.apply_theme(), CommandOutcome::Applied);
    let html = page.editor().current_html();
    assert!(html.contains("font-family: Georgia"));
    assert!(html.contains("color: #112233"));
}

#[test]
fn drafts_are_written_after_quiet_period() {
    let clock = ManualClock::new();
    let config = HostConfig::default();
    let mut drafts = MemoryDraftStore::new();
    let mut store = MemoryStore::new();

    let mut page = BlogEditPage::new(&config, &clock);
    page.set_title("Draft");
    type_text(page.editor_mut(), "abc");
    assert!(!page.tick(&mut drafts).expect("tick"));

    clock.advance(Duration::from_millis(config.autosave_ms));
    assert!(page.tick(&mut drafts).expect("tick"));
    let json = drafts.load("draft:blog_post:new").expect("draft written");
    assert!(json.contains("\"title\":\"Draft\""));
    assert!(json.contains("abc"));

    let mut resumed = BlogEditPage::new(&config, &clock);
    assert!(resumed.restore_draft(&mut drafts));
    assert_eq!(resumed.title(), "Draft");
    assert_eq!(resumed.editor().current_html(), page.editor().current_html());

    page.publish(&mut store, &mut drafts).expect("publish");
    assert_eq!(drafts.load("draft:blog_post:new"), None);
}

#[test]
fn experience_requires_company_and_start() {
    let clock = ManualClock::new();
    let mut store = MemoryStore::new();
    let mut page = ExperiencePage::new(&HostConfig::default(), &clock);
    assert!(matches!(
        page.save(&mut store),
        Err(HostError::MissingField { field: "company" })
    ));
    page.form_mut().company = "Acme".into();
    assert!(matches!(
        page.save(&mut store),
        Err(HostError::MissingField { field: "start_date" })
    ));
    {
        let form = page.form_mut();
        form.start_date = "2023-01".into();
        form.end_date = "2024-01".into();
        form.is_current = true;
        form.tags = "Rust, SQL".into();
    }
    type_text(page.editor_mut(), "Built things");
    let id = page.save(&mut store).expect("save");
    let Some(Record::Experience(saved)) = store.get(RecordKind::Experience, &id).expect("get")
    else {
        panic!("experience missing");
    };
    assert_eq!(saved.end_date, None);
    assert_eq!(saved.description, "Built things");
    assert_eq!(saved.tags, vec!["Rust", "SQL"]);
}

#[test]
fn experience_paste_strips_fonts_and_highlight() {
    let clock = ManualClock::new();
    let mut page = ExperiencePage::new(&HostConfig::default(), &clock);
    page.editor_mut().focus();
    let clipboard = ClipboardData::from_html(
        r#"<span style="font-family: Comic Sans; background: yellow; color: blue">Hi</span>"#,
    );
    assert!(page.editor_mut().on_paste(&clipboard));
    let html = page.editor().current_html();
    assert!(html.contains("color: blue"));
    assert!(!html.contains("font-family"));
    assert!(!html.contains("background"));
}

#[test]
fn project_paste_drops_white_text() {
    let clock = ManualClock::new();
    let mut page = ProjectPage::new(&HostConfig::default(), &clock);
    page.editor_mut().focus();
    let clipboard =
        ClipboardData::from_html(r#"<p><span style="color: #ffffff">ghost</span> text</p>"#);
    assert!(page.editor_mut().on_paste(&clipboard));
    let html = page.editor().current_html();
    assert!(html.contains("ghost"));
    assert!(!html.contains("#ffffff"));
}

#[test]
fn project_validation() {
    let clock = ManualClock::new();
    let mut store = MemoryStore::new();
    let mut page = ProjectPage::new(&HostConfig::default(), &clock);
    page.form_mut().name = "Folio".into();
    page.form_mut().project_url = "not a url".into();
    assert!(matches!(
        page.save(&mut store),
        Err(HostError::InvalidField { field: "project_url", .. })
    ));
    page.form_mut().project_url = "https://folio.example".into();
    page.form_mut().start = "2024-05".into();
    page.form_mut().end = "2024-02".into();
    assert!(matches!(
        page.save(&mut store),
        Err(HostError::InvalidField { field: "end", .. })
    ));
    page.form_mut().end = String::new();
    page.form_mut().tech_stack = "rust, wasm".into();
    let id = page.save(&mut store).expect("save");
    let Some(Record::Project(saved)) = store.get(RecordKind::Project, &id).expect("get") else {
        panic!("project missing");
    };
    assert_eq!(saved.links.map(|l| l.url).as_deref(), Some("https://folio.example"));
    assert_eq!(saved.end_date, None);
    assert_eq!(saved.tech_stack, vec!["rust", "wasm"]);
}

#[test]
fn unmount_saves_and_stops_editor() {
    let clock = ManualClock::new();
    let mut store = MemoryStore::new();
    let mut page = BlogEditPage::new(&HostConfig::default(), &clock);
    type_text(page.editor_mut(), "keep me");
    let id = page.unmount(&mut store).expect("unmount").expect("saved");
    assert_eq!(page.editor().state(), SurfaceState::Unmounted);
    assert!(!page.editor_mut().on_input(&InputEvent::InsertText("x".into())));
    assert_eq!(page.unmount(&mut store).expect("unmount"), None);
    let Some(Record::BlogPost(saved)) = store.get(RecordKind::BlogPost, &id).expect("get") else {
        panic!("post missing");
    };
    assert!(saved.body_html.contains("keep me"));
}

#[test]
fn rejected_commands_reach_page_notices() {
    let clock = ManualClock::new();
    let mut page = BlogEditPage::new(&HostConfig::default(), &clock);
    type_text(page.editor_mut(), "link");
    page.editor_mut().select_chars(0, 4);
    let outcome = page.editor_mut().execute(&Command::CreateLink("nope".into()));
    assert!(matches!(outcome, CommandOutcome::Rejected(_)));
    assert_eq!(page.editor().host().notices().len(), 1);
}
