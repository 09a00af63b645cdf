use std::sync::{Arc, Mutex};
use std::time::Duration;

use placenoter_notes::storage::keys;
use placenoter_notes::{
    Collection, MemoryStore, NoteStore, NotesError, StoreEvent, SyncConfig, Theme,
};
use serde_json::json;
use web_time::Instant;

/// A clock the test moves by hand.
#[derive(Clone)]
struct ManualClock(Arc<Mutex<Instant>>);

impl ManualClock {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    fn now(&self) -> Instant {
        *self.0.lock().unwrap()
    }

    fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

fn note_json(id: &str, title: &str, text: &str) -> serde_json::Value {
    let content = if text.is_empty() {
        String::new()
    } else {
        format!("<p>{text}</p>")
    };
    json!({
        "id": id,
        "title": title,
        "content": content,
        "textContent": text,
        "timestamp": "Thu Oct 16 2026 09:00:00 GMT+0000"
    })
}

async fn loaded(storage: MemoryStore, clock: &ManualClock) -> NoteStore<MemoryStore> {
    let clock = clock.clone();
    NoteStore::load(storage, SyncConfig::default())
        .await
        .unwrap()
        .with_clock(move || clock.now())
}

#[tokio::test]
async fn test_typing_a_title_updates_only_the_active_collection() {
    let storage = MemoryStore::new()
        .with_value(keys::NOTES, json!([note_json("n1", "", "")]))
        .with_value(keys::BIN_NOTES, json!([note_json("b1", "binned", "x")]));
    let clock = ManualClock::new();
    let mut store = loaded(storage.clone(), &clock).await;
    let bin_before = store.snapshot(Collection::Bin);

    store.set_active_note("n1").unwrap();
    assert!(store.update_active_title("Hello"));
    assert_eq!(store.notes()[0].title, "Hello");
    assert!(Arc::ptr_eq(&bin_before, &store.snapshot(Collection::Bin)));

    storage.clear_writes();
    clock.advance(Duration::from_millis(300));
    store.flush_due(clock.now()).await.unwrap();
    let writes = storage.writes();
    assert!(writes.contains(&keys::NOTES.to_string()));
    assert!(!writes.contains(&keys::BIN_NOTES.to_string()));
    assert_eq!(storage.peek(keys::NOTES).unwrap()[0]["title"], "Hello");
}

#[tokio::test]
async fn test_move_to_bin_prepends_and_clears_active() {
    let storage = MemoryStore::new()
        .with_value(
            keys::NOTES,
            json!([note_json("n1", "one", "a"), note_json("n2", "two", "b")]),
        )
        .with_value(keys::BIN_NOTES, json!([note_json("b1", "old", "c")]));
    let clock = ManualClock::new();
    let mut store = loaded(storage, &clock).await;
    store.set_active_note("n1").unwrap();

    store.move_to_bin("n1").unwrap();
    let active: Vec<_> = store.notes().iter().map(|n| n.id.as_str()).collect();
    let bin: Vec<_> = store.bin_notes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(active, vec!["n2"]);
    assert_eq!(bin, vec!["n1", "b1"]);
    assert!(store.active_note().is_none());

    assert!(matches!(
        store.move_to_bin("n1"),
        Err(NotesError::NoteNotFound { .. })
    ));
}

#[tokio::test]
async fn test_create_note_twice_reuses_the_empty_note() {
    let clock = ManualClock::new();
    let mut store = loaded(MemoryStore::new(), &clock).await;
    let first = store.create_note();
    let second = store.create_note();
    assert_eq!(first, second);
    assert_eq!(store.notes().len(), 1);

    store.update_active_content("<p>now it has text</p>");
    let third = store.create_note();
    assert_ne!(third, first);
    assert_eq!(store.notes().len(), 2);
    assert_eq!(store.notes()[0].id, third);
}

#[tokio::test]
async fn test_bad_import_names_notes_and_writes_nothing() {
    let storage = MemoryStore::new().with_value(keys::NOTES, json!([note_json("n1", "keep", "k")]));
    let clock = ManualClock::new();
    let mut store = loaded(storage.clone(), &clock).await;
    storage.clear_writes();

    let err = store
        .import(
            r#"{"dbnotes": "not-an-array", "binNotes": [], "quicklinks": {}, "quicklinksorder": []}"#,
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("notes"));
    assert!(storage.writes().is_empty());
    assert_eq!(store.notes()[0].id, "n1");
    assert_eq!(storage.peek(keys::NOTES).unwrap()[0]["id"], "n1");
}

#[tokio::test]
async fn test_import_replaces_everything_at_once() {
    let storage = MemoryStore::new().with_value(keys::NOTES, json!([note_json("n1", "old", "o")]));
    let clock = ManualClock::new();
    let mut store = loaded(storage.clone(), &clock).await;
    store.set_active_note("n1").unwrap();
    store.update_active_title("pending");
    storage.clear_writes();

    let export = json!({
        "dbnotes": [note_json("i1", "imported", "text")],
        "binNotes": [],
        "quicklinks": {
            "q1": {"id": "q1", "name": "Rust", "url": "https://rust-lang.org", "iconUrl": "https://icon.horse/icon/rust-lang.org"}
        },
        "quicklinksorder": ["q1"],
        "pinnedNoteIds": ["i1"]
    });
    store.import(&export.to_string()).await.unwrap();

    let writes = storage.writes();
    assert_eq!(writes.len(), 5);
    assert!(store.active_note().is_none());
    assert_eq!(store.pinned_notes()[0].title, "imported");
    assert_eq!(store.quick_links()[0].name, "Rust");

    // The superseded write of "pending" must not clobber the import.
    store.flush_all().await.unwrap();
    assert_eq!(storage.peek(keys::NOTES).unwrap()[0]["id"], "i1");

    let round_trip = store.export();
    assert_eq!(round_trip.dbnotes[0].id, "i1");
    assert_eq!(round_trip.pinned_note_ids, vec!["i1".to_string()]);
}

#[tokio::test]
async fn test_keystroke_burst_is_written_once() {
    let storage = MemoryStore::new();
    let clock = ManualClock::new();
    let mut store = loaded(storage.clone(), &clock).await;
    store.create_note();
    store.flush_all().await.unwrap();
    storage.clear_writes();

    for text in ["<p>h</p>", "<p>he</p>", "<p>hel</p>", "<p>hello</p>"] {
        store.update_active_content(text);
        clock.advance(Duration::from_millis(100));
    }
    assert_eq!(store.flush_due(clock.now()).await.unwrap(), 0);

    clock.advance(Duration::from_millis(250));
    assert_eq!(store.flush_due(clock.now()).await.unwrap(), 1);
    assert_eq!(storage.writes(), vec![keys::NOTES.to_string()]);
    assert_eq!(storage.peek(keys::NOTES).unwrap()[0]["textContent"], "hello");
    assert!(!store.has_pending_writes());
}

#[tokio::test]
async fn test_switching_notes_drops_the_title_draft_but_not_content() {
    let storage = MemoryStore::new().with_value(
        keys::NOTES,
        json!([note_json("n1", "first", "a"), note_json("n2", "second", "b")]),
    );
    let clock = ManualClock::new();
    let mut store = loaded(storage.clone(), &clock).await;
    store.set_active_note("n1").unwrap();
    store.update_active_content("<p>committed</p>");
    assert!(store.set_title_draft("half-typed"));

    store.set_active_note("n2").unwrap();
    clock.advance(Duration::from_secs(1));
    store.flush_due(clock.now()).await.unwrap();

    let stored = storage.peek(keys::NOTES).unwrap();
    assert_eq!(stored[0]["title"], "first");
    assert_eq!(stored[0]["textContent"], "committed");
    assert_eq!(storage.peek(keys::LAST_ACTIVE_NOTE_ID).unwrap(), json!("n2"));
}

#[tokio::test]
async fn test_title_draft_commits_after_the_window() {
    let clock = ManualClock::new();
    let mut store = loaded(MemoryStore::new(), &clock).await;
    store.create_note();
    store.set_title_draft("Dra");
    clock.advance(Duration::from_millis(200));
    store.set_title_draft("Draft");
    assert!(store.next_deadline().is_some());

    clock.advance(Duration::from_millis(200));
    store.flush_due(clock.now()).await.unwrap();
    assert_eq!(store.notes()[0].title, "");

    clock.advance(Duration::from_millis(100));
    store.flush_due(clock.now()).await.unwrap();
    assert_eq!(store.notes()[0].title, "Draft");
}

#[tokio::test]
async fn test_load_initializes_and_restores() {
    let storage = MemoryStore::new()
        .with_value(
            keys::QUICK_LINKS,
            json!({"q1": {"id": "q1", "name": "a", "url": "https://a.com", "iconUrl": "x"}}),
        )
        .with_value(keys::BIN_NOTES, json!([note_json("b1", "binned", "")]))
        .with_value(keys::LAST_ACTIVE_NOTE_ID, json!("b1"))
        .with_value(keys::THEME, json!("dark"));
    let clock = ManualClock::new();
    let store = loaded(storage.clone(), &clock).await;

    assert_eq!(storage.peek(keys::NOTES), Some(json!([])));
    assert_eq!(storage.peek(keys::QUICK_LINKS_ORDER), Some(json!(["q1"])));
    assert_eq!(store.active_note_id(), Some("b1"));
    assert_eq!(store.preferences().theme, Theme::Dark);
    assert!(store.preferences().spellcheck);
}

#[tokio::test]
async fn test_preferences_persist_immediately() {
    let storage = MemoryStore::new();
    let clock = ManualClock::new();
    let mut store = loaded(storage.clone(), &clock).await;
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

    store.set_theme(Theme::Dark).await.unwrap();
    store.set_spellcheck(false).await.unwrap();
    store.set_sidebar_open(true).await.unwrap();
    assert_eq!(storage.peek(keys::THEME), Some(json!("dark")));
    assert_eq!(storage.peek(keys::SPELLCHECK), Some(json!(false)));
    assert_eq!(storage.peek(keys::SIDEBAR), Some(json!(true)));
    assert_eq!(
        events.lock().unwrap().as_slice(),
        &[
            StoreEvent::PreferencesChanged,
            StoreEvent::PreferencesChanged,
            StoreEvent::PreferencesChanged,
        ]
    );
}
