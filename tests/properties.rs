//! Cross-component behavior, driven through the public API

use std::time::{Duration, Instant};

use docent::clipboard::{ClipboardBackend, ClipboardError, ClipboardService};
use docent::document::{ContentRenderer, slugify};
use docent::navigation::{HeadingVisibility, NavigationPanel, SectionObserver};
use docent::notify::{Level, Notifications};
use docent::progress::ProgressTracker;
use docent::search::{EntryTarget, SearchHistory, SearchIndex};
use docent::storage::{FileStore, Persistence, keys};
use docent::templates::TemplateCatalog;
use pretty_assertions::assert_eq;

struct Backend {
    fail: bool,
}

impl ClipboardBackend for Backend {
    fn name(&self) -> &'static str {
        "test"
    }

    fn set_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
        if self.fail { Err(ClipboardError::Unavailable) } else { Ok(()) }
    }
}

fn clipboard(fail: bool) -> ClipboardService {
    ClipboardService::new(Box::new(Backend { fail }), Some(Box::new(Backend { fail })))
}

fn visible(id: &str, top: i64) -> HeadingVisibility {
    HeadingVisibility { id: id.to_string(), intersecting: true, top }
}

#[test]
fn generated_ids_are_stable_and_trimmed() {
    let long = "long words ".repeat(20);
    for text in ["  Getting Started!  ", "What's new in v2.0?", "---", long.as_str()] {
        let first = slugify(text);
        assert_eq!(first, slugify(text));
        assert!(!first.starts_with('-') && !first.ends_with('-'), "{first:?}");
        assert!(first.chars().count() <= 50);
    }
}

#[test]
fn explicit_navigation_mutes_passive_updates_until_the_window_closes() {
    let start = Instant::now();
    let mut observer = SectionObserver::new(Duration::from_millis(900));
    observer.observe(["intro", "setup", "usage"]);
    observer.on_visibility(&[visible("intro", 0)], start);
    assert_eq!(observer.current(), Some("intro"));

    observer.navigate_to("usage", start);
    assert_eq!(observer.current(), Some("usage"));

    // the animation passes over setup
    let during = start + Duration::from_millis(400);
    let batch = [
        HeadingVisibility { id: "intro".into(), intersecting: false, top: -12 },
        visible("setup", 0),
    ];
    assert_eq!(observer.on_visibility(&batch, during), None);
    assert_eq!(observer.current(), Some("usage"));

    // landed short of the target: geometry decides once the window closes
    let settled = observer.tick(start + Duration::from_millis(950));
    assert_eq!(settled.map(|a| a.current), Some("setup".to_string()));
    assert_eq!(observer.current(), Some("setup"));
}

#[test]
fn short_queries_return_nothing_and_leave_history_alone() {
    let rendered = ContentRenderer::default().render("# Guide\n\n## Setup\n\nInstall things.\n");
    let templates = TemplateCatalog::builtin();
    let persistence_seed = Persistence::in_memory();
    let mut nav = NavigationPanel::new();
    nav.rebuild(&rendered.document, &persistence_seed);

    let mut persistence = Persistence::in_memory();
    let mut history = SearchHistory::load(&persistence);
    let mut index = SearchIndex::build(&rendered.document, &nav, &templates);

    assert!(index.perform("s", &templates, &mut history, &mut persistence).is_empty());
    assert!(history.entries().is_empty());
    assert_eq!(persistence.get::<Vec<String>>(keys::SEARCHES), None);

    assert!(!index.perform("setup", &templates, &mut history, &mut persistence).is_empty());
    assert_eq!(history.entries(), ["setup"]);
}

#[test]
fn equal_scores_keep_index_order() {
    let markdown = "\
## Alpha

Configure the widget carefully.

## Bravo

Configure the widget carefully.
";
    let rendered = ContentRenderer::default().render(markdown);
    let templates = TemplateCatalog::builtin();
    let mut nav = NavigationPanel::new();
    nav.rebuild(&rendered.document, &Persistence::in_memory());
    let index = SearchIndex::build(&rendered.document, &nav, &templates);

    let results = index.search("widget", &templates);
    let targets: Vec<&EntryTarget> = results.iter().map(|r| &r.entry.target).collect();
    assert_eq!(
        targets,
        [&EntryTarget::Section("alpha".into()), &EntryTarget::Section("bravo".into())]
    );
    assert_eq!(results[0].score, results[1].score);
}

#[test]
fn copy_counts_only_successful_writes() {
    let mut persistence = Persistence::in_memory();
    let mut notifications = Notifications::default();

    let mut working = clipboard(false);
    let receipt = working.copy("npm test", "Bash", &mut persistence, &mut notifications).unwrap();
    assert_eq!(receipt.total, 1);
    assert_eq!(working.usage("Bash"), 1);
    assert_eq!(persistence.get::<u64>(keys::COPY_COUNT), Some(1));

    let mut broken = clipboard(true);
    broken.load(&persistence);
    assert!(broken.copy("npm test", "Bash", &mut persistence, &mut notifications).is_err());
    assert_eq!(broken.count(), 1);
    assert_eq!(broken.usage("Bash"), 1);
    assert_eq!(persistence.get::<u64>(keys::COPY_COUNT), Some(1));
    assert_eq!(notifications.count(Level::Error), 1);
}

#[test]
fn copy_milestone_fires_once() {
    let mut persistence = Persistence::in_memory();
    // copy toasts go elsewhere so the bounded queue keeps every achievement
    let mut toasts = Notifications::default();
    let mut notifications = Notifications::default();
    let mut clipboard = clipboard(false);
    let mut progress = ProgressTracker::load(&persistence, Duration::from_secs(60), Instant::now());

    let mut fired = Vec::new();
    for _ in 0..9 {
        let receipt = clipboard.copy("text", "Plain", &mut persistence, &mut toasts).unwrap();
        fired.extend(progress.on_copy_count(receipt.total, &mut persistence, &mut notifications));
    }

    assert_eq!(fired, [1, 5]);
    assert_eq!(notifications.count(Level::Achievement), 2);

    // a fresh tracker over the same storage remembers the milestone
    let mut reloaded = ProgressTracker::load(&persistence, Duration::from_secs(60), Instant::now());
    assert!(reloaded.on_copy_count(9, &mut persistence, &mut notifications).is_empty());
}

#[test]
fn collapse_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let markdown = "# Guide\n\n## Setup\n\n### Install\n\n### Configure\n\n## Usage\n";
    let rendered = ContentRenderer::default().render(markdown);

    {
        let mut persistence = Persistence::new(FileStore::open(&path));
        let mut nav = NavigationPanel::new();
        nav.rebuild(&rendered.document, &persistence);
        assert_eq!(nav.visible_entries().len(), 4);
        assert_eq!(nav.toggle("setup", &mut persistence), Some(false));
    }

    let persistence = Persistence::new(FileStore::open(&path));
    let mut nav = NavigationPanel::new();
    nav.rebuild(&rendered.document, &persistence);

    assert!(!nav.is_expanded("setup"));
    let entries = nav.visible_entries();
    let ids: Vec<&str> = entries.iter().map(|e| e.node.id.as_str()).collect();
    assert_eq!(ids, ["setup", "usage"]);
}
