use egui::{Key, Modifiers, PointerButton, pos2};
use futures::executor::block_on;
use layer_paint::color::Rgba;
use layer_paint::config::EditorConfig;
use layer_paint::document::DrawingMetadata;
use layer_paint::editor::{Editor, HistoryMode};
use layer_paint::event::{DocumentEvent, EditorEvent, EventBus, EventKind, Notice};
use layer_paint::flood_fill::sample;
use layer_paint::input::PointerEvent;
use layer_paint::interaction::{FillOutcome, NoPointerSource, PointerSource, Tool};
use layer_paint::persistence::{DrawingData, DrawingStore, MemoryStore, PersistenceError};
use parking_lot::Mutex;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn small_config() -> EditorConfig {
    EditorConfig {
        canvas_width: 100,
        canvas_height: 100,
        ..EditorConfig::default()
    }
}

/// Counts capture and release calls.
#[derive(Default)]
struct RecordingPointerSource {
    calls: Mutex<Vec<&'static str>>,
}

impl PointerSource for RecordingPointerSource {
    fn capture(&self) {
        self.calls.lock().push("capture");
    }

    fn release(&self) {
        self.calls.lock().push("release");
    }
}

fn recording_bus() -> (EventBus, Arc<Mutex<Vec<EditorEvent>>>) {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(Box::new(move |event: &EditorEvent| sink.lock().push(event.clone())));
    (bus, seen)
}

fn open_editor(store: Arc<MemoryStore>) -> Editor {
    Editor::open("session", small_config(), store, Arc::new(NoPointerSource), EventBus::new()).unwrap()
}

fn down(x: f32, y: f32) -> PointerEvent {
    PointerEvent::Down { pos: pos2(x, y), button: PointerButton::Primary }
}

fn up(x: f32, y: f32) -> PointerEvent {
    PointerEvent::Up { pos: pos2(x, y), button: PointerButton::Primary }
}

#[test]
fn test_one_stroke_and_one_history_entry_per_gesture() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    let history_before = editor.history().len();

    assert!(editor.handle_pointer(down(10.0, 10.0)).is_none());
    for i in 0..50 {
        editor.handle_pointer(PointerEvent::Move { pos: pos2(10.0 + i as f32, 20.0) });
    }
    assert_eq!(editor.history().len(), history_before);
    assert!(editor.document().layers()[0].strokes.is_empty());
    editor.handle_pointer(up(60.0, 20.0));

    assert_eq!(editor.document().layers()[0].strokes.len(), 1);
    assert_eq!(editor.history().len(), history_before + 1);
}

#[test]
fn test_flatten_shows_only_visible_layers_with_opacity() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    let first = editor.document().layers()[0].id;
    let second = editor.add_layer();
    assert_eq!(editor.document().active_layer_id(), Some(second));
    assert!(editor.set_layer_opacity(second, 0.5, HistoryMode::Record));

    editor.tool_settings_mut().stroke_color = Rgba::opaque(255, 0, 0);
    editor.handle_pointer(down(10.0, 10.0));
    editor.handle_pointer(PointerEvent::Move { pos: pos2(50.0, 10.0) });
    editor.handle_pointer(up(90.0, 10.0));
    assert!(editor.toggle_visibility(first));

    let flat = editor.flatten().unwrap();
    let on_stroke = sample(&flat, 50, 10).unwrap();
    assert!(on_stroke.r >= 250 && on_stroke.g == 0 && on_stroke.b == 0, "{on_stroke}");
    assert!((120..=135).contains(&on_stroke.a), "{on_stroke}");
    // The hidden white background contributes nothing.
    assert_eq!(sample(&flat, 50, 80).map(|c| c.a), Some(0));

    let png = editor.flatten_png().unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

#[test]
fn test_bucket_fill_replaces_raster_once() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    let layer = editor.document().layers()[0].id;
    let blue = Rgba::opaque(0, 0, 255);
    editor.tool_settings_mut().fill_color = blue;
    editor.set_tool(Tool::Bucket);

    let job = editor.handle_pointer(down(40.0, 40.0)).expect("bucket click starts a fill");
    assert_eq!(job.layer_id(), layer);
    assert!(editor.interaction().state().is_filling());

    let history_before = editor.history().len();
    assert!(block_on(editor.run_fill(job)));
    assert!(editor.interaction().state().is_idle());
    assert_eq!(editor.history().len(), history_before + 1);

    let flat = editor.flatten().unwrap();
    assert_eq!(sample(&flat, 0, 0), Some(blue));
    assert_eq!(sample(&flat, 99, 99), Some(blue));

    // Clicking the now-blue region with blue again does nothing.
    let job = editor.handle_pointer(down(5.0, 5.0)).unwrap();
    let result = block_on(job.run());
    assert!(matches!(result, Ok(FillOutcome::AlreadyFilled { .. })));
    assert!(!editor.complete_fill(result));
    assert_eq!(editor.history().len(), history_before + 1);
}

#[test]
fn test_fill_on_deleted_layer_is_ignored() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    let doomed = editor.add_layer();
    editor.set_tool(Tool::Bucket);
    let job = editor.handle_pointer(down(1.0, 1.0)).unwrap();

    assert!(editor.delete_layer(doomed));
    let history_before = editor.history().len();
    assert!(!block_on(editor.run_fill(job)));
    assert_eq!(editor.history().len(), history_before);
    assert!(editor.interaction().state().is_idle());
}

#[test]
fn test_dropped_fill_job_does_not_lock_the_canvas() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    editor.set_tool(Tool::Bucket);
    let job = editor.handle_pointer(down(1.0, 1.0)).unwrap();
    drop(job);

    editor.set_tool(Tool::Pen);
    assert!(!editor.interaction().state().is_filling());
    editor.handle_pointer(down(10.0, 10.0));
    editor.handle_pointer(up(20.0, 10.0));
    assert_eq!(editor.document().layers()[0].strokes.len(), 1);
}

#[test]
fn test_dropped_fill_job_unblocks_next_bucket_click() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    editor.set_tool(Tool::Bucket);
    let _ = editor.handle_pointer(down(1.0, 1.0));

    let job = editor.handle_pointer(down(2.0, 2.0)).expect("abandoned fill no longer blocks");
    assert!(block_on(editor.run_fill(job)));
    assert!(editor.interaction().state().is_idle());
}

#[test]
fn test_abort_fill_then_late_result_still_applies() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    editor.set_tool(Tool::Bucket);
    let job = editor.handle_pointer(down(1.0, 1.0)).unwrap();
    assert!(editor.abort_fill());
    assert!(editor.interaction().state().is_idle());
    assert!(!editor.abort_fill());

    assert!(block_on(editor.run_fill(job)));
}

#[test]
fn test_painting_hidden_layer_raises_notice() {
    init_logging();
    let (bus, seen) = recording_bus();
    let store = Arc::new(MemoryStore::new("k"));
    let mut editor = Editor::open("hidden", small_config(), store, Arc::new(NoPointerSource), bus).unwrap();
    let layer = editor.document().layers()[0].id;
    editor.toggle_visibility(layer);
    seen.lock().clear();

    assert!(editor.handle_pointer(down(5.0, 5.0)).is_none());
    assert!(editor.interaction().state().is_idle());
    assert_eq!(*seen.lock(), vec![EditorEvent::Notice(Notice::LayerHidden)]);
}

#[test]
fn test_notice_subscriber_ignores_edits_until_unsubscribed() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notices);
    let id = editor.events().subscribe_to(
        &[EventKind::Notice],
        Box::new(move |event: &EditorEvent| sink.lock().push(event.clone())),
    );

    editor.set_tool(Tool::Bucket);
    let job = editor.handle_pointer(down(1.0, 1.0)).unwrap();
    assert!(editor.handle_pointer(down(2.0, 2.0)).is_none());
    assert!(block_on(editor.run_fill(job)));
    assert_eq!(*notices.lock(), vec![EditorEvent::Notice(Notice::FillPending)]);

    assert!(editor.events().unsubscribe(id));
    let layer = editor.document().layers()[0].id;
    editor.toggle_visibility(layer);
    editor.handle_pointer(down(5.0, 5.0));
    assert_eq!(notices.lock().len(), 1);
}

#[test]
fn test_pointer_capture_released_on_every_exit() {
    init_logging();
    let source = Arc::new(RecordingPointerSource::default());
    let store = Arc::new(MemoryStore::new("k"));
    let mut editor = Editor::open("capture", small_config(), store, source.clone(), EventBus::new()).unwrap();

    editor.handle_pointer(down(1.0, 1.0));
    editor.handle_pointer(PointerEvent::Move { pos: pos2(500.0, 1.0) });
    editor.handle_pointer(up(600.0, 1.0));

    editor.handle_pointer(down(1.0, 1.0));
    editor.handle_pointer(PointerEvent::Cancel);

    editor.handle_pointer(down(1.0, 1.0));
    editor.set_tool(Tool::Eraser);

    editor.handle_pointer(down(1.0, 1.0));
    editor.handle_pointer(PointerEvent::Leave { last_known: pos2(-3.0, 1.0) });

    let calls = source.calls.lock().clone();
    assert_eq!(calls, ["capture", "release"].repeat(4));
    // Up, tool switch and leave commit; cancel does not.
    assert_eq!(editor.document().layers()[0].strokes.len(), 3);
}

#[test]
fn test_keyboard_undo_and_redo() {
    init_logging();
    let mut editor = open_editor(Arc::new(MemoryStore::new("k")));
    let added = editor.add_layer();

    assert!(editor.handle_key(Key::Z, Modifiers::CTRL));
    assert!(editor.document().layer(added).is_none());
    assert!(editor.handle_key(Key::Z, Modifiers::CTRL));
    assert!(editor.handle_key(Key::Z, Modifiers::CTRL | Modifiers::SHIFT));
    assert!(editor.document().layer(added).is_some());
    assert!(!editor.handle_key(Key::Z, Modifiers::NONE));
}

#[test]
fn test_stored_empty_canvas_refuses_to_open() {
    init_logging();
    let store = Arc::new(MemoryStore::new("k"));
    let editor = open_editor(store.clone());
    let mut stored = serde_json::to_value(DrawingData::from_document(editor.document())).unwrap();
    drop(editor);
    stored["size"] = serde_json::json!({ "width": 0, "height": 0 });
    store.set_raw(&serde_json::json!({ "session": stored }).to_string());

    let opened = Editor::open("session", small_config(), store, Arc::new(NoPointerSource), EventBus::new());
    assert!(matches!(opened, Err(PersistenceError::Corrupt { .. })));
}

#[test]
fn test_session_survives_reopen() {
    init_logging();
    let store = Arc::new(MemoryStore::new("drawings-storage"));
    let (bus, seen) = recording_bus();
    let mut editor = Editor::create(
        DrawingMetadata::pixel(10),
        small_config(),
        store.clone(),
        Arc::new(NoPointerSource),
        bus,
    )
    .unwrap();
    let id = editor.id().to_string();
    assert!(matches!(
        seen.lock().first(),
        Some(EditorEvent::DocumentChanged(DocumentEvent::Created { .. }))
    ));

    editor.handle_pointer(down(15.0, 15.0));
    editor.handle_pointer(up(25.0, 15.0));
    let top = editor.add_layer();
    drop(editor);

    let saved = store.load(&id).unwrap().unwrap();
    assert_eq!(saved.metadata, DrawingMetadata::pixel(10));

    let reopened = Editor::open(&id, small_config(), store, Arc::new(NoPointerSource), EventBus::new()).unwrap();
    assert_eq!(reopened.document().layers().len(), 2);
    assert_eq!(reopened.document().active_layer_id(), Some(top));
    assert_eq!(reopened.document().layers()[0].strokes[0].cells().len(), 2);
    assert!(!reopened.can_undo());
    assert!(reopened.interaction().grid().is_some());
}
