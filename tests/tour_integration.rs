//! Integration tests for tour resolution and navigation
//!
//! These drive the public API end to end over JSON page fixtures:
//! - Markup scanning with ordering, grouping and hidden elements
//! - Programmatic tours with completion hooks that mutate the page
//! - Manifest-driven conditional steps
//! - The `tourguide` binary
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test tour_integration -- --nocapture
//! ```

use std::process::Command;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use tourguide::config::TourOptions;
use tourguide::dom::{Document, ElementId, ElementSpec, MemoryDocument, PageFixture};
use tourguide::tour::{
    CompleteHook, CompletionReason, ManualFrameClock, StepDefinition, StepManifest,
    TooltipPosition, TourListener, TourSession, TourState,
};

// ─── Fixtures ─────────────────────────────────────────────────────────────────

const DASHBOARD_PAGE: &str = r##"{
    "body": [
        { "tag": "header", "id": "top", "position": "sticky",
          "attributes": { "data-intro": "Navigation lives here", "data-step": "2", "data-title": "Nav" } },
        { "tag": "main", "id": "app", "children": [
            { "tag": "button", "id": "save", "classes": ["primary"],
              "attributes": { "data-intro": "Save your work", "data-step": "1", "data-position": "left" } },
            { "tag": "section", "id": "reports",
              "attributes": { "data-intro": "Reports", "data-intro-group": "analytics" } },
            { "tag": "aside", "id": "tips", "hidden": true,
              "attributes": { "data-intro": "Tips are hidden" } }
        ] }
    ]
}"##;

type Log = Arc<Mutex<Vec<String>>>;

/// Records displayed anchors (by id) and completion
struct Recorder {
    doc: Arc<MemoryDocument>,
    log: Log,
}

#[async_trait]
impl TourListener for Recorder {
    async fn on_after_change(&self, element: ElementId) -> anyhow::Result<()> {
        let label = self
            .doc
            .attribute(element, "id")
            .unwrap_or_else(|| "floating".to_string());
        self.log.lock().unwrap().push(label);
        Ok(())
    }

    async fn on_complete(&self, final_index: usize, reason: CompletionReason) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("complete {final_index} {reason}"));
        Ok(())
    }
}

fn session_for(doc: &Arc<MemoryDocument>, options: TourOptions) -> (TourSession, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let session = TourSession::new(options, doc.clone(), Arc::new(ManualFrameClock::new()))
        .with_listener(Arc::new(Recorder {
            doc: doc.clone(),
            log: log.clone(),
        }));
    (session, log)
}

fn dashboard() -> Arc<MemoryDocument> {
    let fixture = PageFixture::from_json(DASHBOARD_PAGE).unwrap();
    Arc::new(MemoryDocument::from_fixture(&fixture))
}

// ─── Markup tours ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_markup_tour_walks_in_declared_order() {
    let doc = dashboard();
    let (mut session, log) = session_for(&doc, TourOptions::default());

    assert!(session.start(&[]).await.unwrap());
    let steps: Vec<_> = session.steps().iter().map(|s| s.intro.clone()).collect();
    assert_eq!(steps, vec!["Save your work", "Navigation lives here", "Reports"]);
    assert_eq!(session.step(0).unwrap().position, TooltipPosition::Left);
    assert_eq!(session.step(1).unwrap().title, "Nav");

    while session.next_step().await.unwrap() {}

    assert_eq!(
        *log.lock().unwrap(),
        vec!["save", "top", "reports", "complete 2 end"]
    );
    assert_eq!(session.state(), TourState::Completed);
    assert!(doc
        .query_by_class("tourguide-show-element")
        .is_empty());
}

#[tokio::test]
async fn test_markup_tour_group_and_root_filters() {
    let doc = dashboard();
    let options = TourOptions {
        group: Some("analytics".to_string()),
        ..TourOptions::default()
    };
    let (mut session, _) = session_for(&doc, options);
    session.start(&[]).await.unwrap();
    assert_eq!(session.steps().len(), 1);
    assert_eq!(session.steps()[0].intro, "Reports");

    let options = TourOptions {
        root: Some("#app".to_string()),
        ..TourOptions::default()
    };
    let (mut session, _) = session_for(&doc, options);
    session.start(&[]).await.unwrap();
    let intros: Vec<_> = session.steps().iter().map(|s| s.intro.as_str()).collect();
    assert_eq!(intros, vec!["Save your work", "Reports"]);
}

#[tokio::test]
async fn test_sticky_anchor_is_not_forced_relative() {
    let doc = dashboard();
    let (mut session, _) = session_for(&doc, TourOptions::default());
    session.start(&[]).await.unwrap();
    session.next_step().await.unwrap();

    let header = doc.query("#top").unwrap().unwrap();
    assert!(doc.has_class(header, "tourguide-show-element"));
    assert!(!doc.has_class(header, "tourguide-relative-position"));
}

// ─── Programmatic tours ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_hook_inserted_element_is_picked_up_on_next_display() {
    let doc = Arc::new(MemoryDocument::new());
    doc.append(doc.body(), ElementSpec::new("button").id("open"));

    let inserter = doc.clone();
    let open_panel = CompleteHook::new(move || {
        let doc = inserter.clone();
        async move {
            doc.append(doc.body(), ElementSpec::new("div").id("panel"));
            Ok(())
        }
    });

    let definitions = vec![
        StepDefinition::new("Open the panel")
            .element("#open")
            .on_complete(open_panel),
        StepDefinition::new("This is the panel")
            .element("#panel")
            .position(TooltipPosition::Right),
    ];

    let (mut session, log) = session_for(&doc, TourOptions::default());
    session.start(&definitions).await.unwrap();
    assert!(session.step(1).unwrap().is_floating());

    assert!(session.next_step().await.unwrap());
    let panel = doc.query("#panel").unwrap();
    assert_eq!(session.current().unwrap().element, panel);
    // the declared position was dropped when nothing matched at resolution
    assert_eq!(session.current().unwrap().position, TooltipPosition::Bottom);
    assert_eq!(*log.lock().unwrap(), vec!["open", "panel"]);
}

#[tokio::test]
async fn test_restart_after_completion() {
    let doc = dashboard();
    let (mut session, log) = session_for(&doc, TourOptions::default());
    let definitions = vec![StepDefinition::new("only").element("#save")];

    session.start(&definitions).await.unwrap();
    assert!(!session.next_step().await.unwrap());
    assert_eq!(session.state(), TourState::Completed);

    assert!(session.start(&definitions).await.unwrap());
    assert_eq!(session.current_step(), Some(0));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["save", "complete 0 end", "save"]
    );
}

// ─── Manifests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_manifest_conditional_step_follows_page() {
    let manifest = StepManifest::from_json(
        r##"{ "steps": [
            { "intro": "Welcome" },
            { "intro": "Billing", "element": "#billing", "skip_unless_present": "#billing" },
            { "intro": "Save", "element": "#save" }
        ] }"##,
    )
    .unwrap();

    let doc = dashboard();
    let document: Arc<dyn Document> = doc.clone();
    let definitions = manifest.clone().into_definitions(&document);
    let (mut session, log) = session_for(&doc, TourOptions::default());
    session.start(&definitions).await.unwrap();
    while session.next_step().await.unwrap() {}
    assert_eq!(
        *log.lock().unwrap(),
        vec!["floating", "save", "complete 2 end"]
    );

    doc.append(doc.body(), ElementSpec::new("section").id("billing"));
    let definitions = manifest.into_definitions(&document);
    let (mut session, log) = session_for(&doc, TourOptions::default());
    session.start(&definitions).await.unwrap();
    while session.next_step().await.unwrap() {}
    assert_eq!(
        *log.lock().unwrap(),
        vec!["floating", "billing", "save", "complete 2 end"]
    );
}

// ─── Binary ───────────────────────────────────────────────────────────────────

fn tourguide(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tourguide"));
    cmd.current_dir(dir.path())
        .env("TOURGUIDE__FRAMES__INTERVAL_MS", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_steps_lists_resolved_sequence() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.json");
    std::fs::write(&page, DASHBOARD_PAGE).unwrap();

    let output = tourguide(&dir)
        .args(["steps", "--page"])
        .arg(&page)
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Tour (3 steps)"));
    assert!(stdout.contains("[1/3] (untitled) @ button#save (left)"));
    assert!(stdout.contains("[2/3] Nav @ header#top (bottom)"));
}

#[test]
fn test_cli_walk_reaches_completion() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.json");
    std::fs::write(&page, DASHBOARD_PAGE).unwrap();

    let output = tourguide(&dir)
        .args(["walk", "--back", "--page"])
        .arg(&page)
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let shown: Vec<&str> = stdout
        .lines()
        .filter(|line| line.starts_with('['))
        .map(|line| &line[..5])
        .collect();
    assert_eq!(
        shown,
        vec!["[1/3]", "[2/3]", "[3/3]", "[2/3]", "[1/3]", "[2/3]", "[3/3]"]
    );
    assert!(stdout.contains("Tour complete after step 3 (end)"));
}

#[test]
fn test_cli_reports_missing_page() {
    let dir = TempDir::new().unwrap();
    let output = tourguide(&dir)
        .args(["steps", "--page", "nope.json"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.json"));
}
