//! The editor session: one mounted host, one status, one annotation set
//!
//! `FluxEditor` ties the pieces together. The embedding application feeds it
//! notifications (script text, validation status, visibility, cursor moves,
//! key releases) and it drives the host: error markers rebuilt on every
//! status change, inline widgets toggled on gutter clicks, hint lists shown
//! for completion triggers. Everything runs on the thread that owns the
//! session; background producers reply through the async bridge and are
//! drained here.

use std::time::{Duration, Instant};

use crossterm::event::KeyEvent;

use crate::async_bridge::{AsyncBridge, AsyncMessage};
use crate::completion::{CompletionTrigger, TriggerAction};
use crate::config::Config;
use crate::diagnostics::{parse_status_text, ScriptStatus, StatusKind};
use crate::gutter::GutterAnnotations;
use crate::host::{EditorHost, HintOptions};
use crate::line_widgets::InlineWidgets;
use crate::suggest::{
    CursorPosition, Suggestion, SuggestionContext, SuggestionRequest, SuggestionSource,
};

/// Whether the editor is currently visible in the embedding layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// An annotated Flux script editing session.
///
/// The host is handed over at [`mount`](Self::mount) and owned by the
/// session until [`unmount`](Self::unmount) gives it back. Before mount and
/// after unmount every host-facing operation degrades to a no-op.
pub struct FluxEditor<H> {
    trigger: CompletionTrigger,
    refresh_settle: Duration,

    host: Option<H>,
    script: String,
    status: ScriptStatus,
    visibility: Visibility,
    cursor: CursorPosition,

    gutter: GutterAnnotations,
    widgets: InlineWidgets,

    suggestions: Option<Box<dyn SuggestionSource>>,
    bridge: AsyncBridge,
    next_request_id: u64,
    pending_suggestion_request: Option<u64>,

    deferred_refresh: Option<Instant>,

    on_script_change: Option<Box<dyn FnMut(&str)>>,
    on_submit: Option<Box<dyn FnMut()>>,
    on_cursor_move: Option<Box<dyn FnMut(CursorPosition)>>,
}

impl<H: EditorHost> FluxEditor<H> {
    pub fn new(config: &Config) -> Self {
        Self {
            trigger: CompletionTrigger::from_key_names(
                config.completion.excluded_keys.iter().map(String::as_str),
            ),
            refresh_settle: Duration::from_millis(config.editor.refresh_settle_ms),
            host: None,
            script: String::new(),
            status: ScriptStatus::default(),
            visibility: Visibility::Visible,
            cursor: CursorPosition::default(),
            gutter: GutterAnnotations::new(),
            widgets: InlineWidgets::new(),
            suggestions: None,
            bridge: AsyncBridge::new(),
            next_request_id: 0,
            pending_suggestion_request: None,
            deferred_refresh: None,
            on_script_change: None,
            on_submit: None,
            on_cursor_move: None,
        }
    }

    /// Install the source completion candidates come from.
    pub fn set_suggestion_source(&mut self, source: impl SuggestionSource + 'static) {
        self.suggestions = Some(Box::new(source));
    }

    /// Called back with the new text after every script edit.
    pub fn set_on_script_change(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_script_change = Some(Box::new(callback));
    }

    /// Called back when the submit chord (Ctrl+Enter) fires. Registering
    /// this is what arms the chord; without it Ctrl+Enter does nothing.
    pub fn set_on_submit(&mut self, callback: impl FnMut() + 'static) {
        self.on_submit = Some(Box::new(callback));
    }

    /// Called back on every cursor move.
    pub fn set_on_cursor_move(&mut self, callback: impl FnMut(CursorPosition) + 'static) {
        self.on_cursor_move = Some(Box::new(callback));
    }

    /// Take ownership of the host and bring it up to date with the stored
    /// status. The initial refresh settles line-height measurement in hosts
    /// that size lazily.
    pub fn mount(&mut self, mut host: H) {
        // Annotations tracked against a previous host mean nothing here.
        self.gutter = GutterAnnotations::new();
        self.widgets = InlineWidgets::new();

        host.refresh();
        self.host = Some(host);
        self.apply_status();
        tracing::info!("Editor mounted");
    }

    /// Clear every annotation off the host and hand it back.
    pub fn unmount(&mut self) -> Option<H> {
        if let Some(host) = self.host.as_mut() {
            self.gutter.clear(&mut self.widgets, host);
            tracing::info!("Editor unmounted");
        }
        self.pending_suggestion_request = None;
        self.deferred_refresh = None;
        self.host.take()
    }

    pub fn is_mounted(&self) -> bool {
        self.host.is_some()
    }

    pub fn host(&self) -> Option<&H> {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> Option<&mut H> {
        self.host.as_mut()
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn status(&self) -> &ScriptStatus {
        &self.status
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn gutter(&self) -> &GutterAnnotations {
        &self.gutter
    }

    pub fn widgets(&self) -> &InlineWidgets {
        &self.widgets
    }

    /// Sender for background producers (validators, suggestion workers).
    pub fn async_sender(&self) -> std::sync::mpsc::Sender<AsyncMessage> {
        self.bridge.sender()
    }

    /// A new validation status arrived. It fully supersedes the previous
    /// one: error batches rebuild the markers, anything else clears markers
    /// and widgets both.
    pub fn status_changed(&mut self, status: ScriptStatus) {
        tracing::debug!("Status changed: {:?}", status.kind);
        self.status = status;
        self.apply_status();
    }

    /// The script text changed. Fires the script-change callback and
    /// repaints the stored status: while an error is showing, markers are
    /// rebuilt on every content update rather than diffed against it.
    pub fn script_changed(&mut self, text: &str) {
        self.script = text.to_string();
        if let Some(callback) = self.on_script_change.as_mut() {
            callback(&self.script);
        }
        self.apply_status();
    }

    /// The cursor moved. Position is tracked for suggestion context and
    /// forwarded to the cursor callback.
    pub fn cursor_moved(&mut self, cursor: CursorPosition) {
        self.cursor = cursor;
        if let Some(callback) = self.on_cursor_move.as_mut() {
            callback(cursor);
        }
    }

    /// Visibility flipped in the embedding layout. Becoming visible
    /// schedules one deferred refresh: layout immediately after an unhide
    /// is unreliable, so the redraw waits for the settle interval.
    pub fn visibility_changed(&mut self, visibility: Visibility) {
        if self.visibility != visibility && visibility == Visibility::Visible {
            self.deferred_refresh = Some(Instant::now() + self.refresh_settle);
            tracing::debug!("Scheduled deferred refresh in {:?}", self.refresh_settle);
        }
        self.visibility = visibility;
    }

    /// Drive time-based work. Call once per event-loop turn with the
    /// current instant; fires the deferred refresh once its settle deadline
    /// passes.
    pub fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.deferred_refresh {
            if now >= deadline {
                self.deferred_refresh = None;
                if let Some(host) = self.host.as_mut() {
                    host.refresh();
                }
            }
        }
    }

    /// Classify a key release and act on it: fire the submit callback or
    /// request completion candidates for the cursor context.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        match self.trigger.classify(event, self.on_submit.is_some()) {
            TriggerAction::Submit => {
                tracing::debug!("Submit chord");
                if let Some(callback) = self.on_submit.as_mut() {
                    callback();
                }
            }
            TriggerAction::ShowCompletions => self.request_completions(),
            TriggerAction::None => {}
        }
    }

    /// A click landed on the gutter at `line_index`. Toggles the inline
    /// widget for the marker on that line, if any.
    pub fn click_gutter(&mut self, line_index: usize) {
        if let Some(host) = self.host.as_mut() {
            self.gutter.click(line_index, &mut self.widgets, host);
        }
    }

    /// Drain the bridge and apply everything background work produced since
    /// the last turn.
    pub fn process_async_messages(&mut self) {
        for message in self.bridge.try_recv_all() {
            match message {
                AsyncMessage::Suggestions { request_id, items } => {
                    self.handle_suggestions(request_id, items);
                }
                AsyncMessage::StatusChanged(status) => self.status_changed(status),
            }
        }
    }

    fn request_completions(&mut self) {
        let source = match self.suggestions.as_mut() {
            Some(source) => source,
            None => return,
        };

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.pending_suggestion_request = Some(request_id);

        let context = SuggestionContext {
            cursor: self.cursor,
            script: self.script.clone(),
        };
        tracing::debug!("Requesting suggestions (request {})", request_id);
        source.request(
            SuggestionRequest {
                request_id,
                context,
            },
            self.bridge.sender(),
        );
    }

    fn handle_suggestions(&mut self, request_id: u64, items: Vec<Suggestion>) {
        if self.pending_suggestion_request != Some(request_id) {
            tracing::debug!(
                "Ignoring suggestion response for outdated request {}",
                request_id
            );
            return;
        }
        self.pending_suggestion_request = None;

        if let Some(host) = self.host.as_mut() {
            // complete_single stays false: a sole candidate is shown, never
            // silently inserted.
            host.show_hint_list(&items, &HintOptions::default());
        }
    }

    /// Repaint the stored status onto the host. Error statuses parse their
    /// text into one entry per segment and rebuild the markers; every other
    /// kind clears markers and widgets.
    fn apply_status(&mut self) {
        let host = match self.host.as_mut() {
            Some(host) => host,
            None => return,
        };

        let entries = match self.status.kind {
            StatusKind::Error => parse_status_text(&self.status.text),
            _ => Vec::new(),
        };
        self.gutter
            .apply_status(self.status.kind, &entries, &mut self.widgets, host);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crossterm::event::{KeyCode, KeyModifiers};

    use super::*;
    use crate::host::test_support::RecordingHost;
    use crate::host::ERROR_GUTTER;
    use crate::suggest::StaticSource;

    fn editor() -> FluxEditor<RecordingHost> {
        FluxEditor::new(&Config::default())
    }

    fn mounted_editor() -> FluxEditor<RecordingHost> {
        let mut editor = editor();
        editor.mount(RecordingHost::new());
        editor
    }

    fn catalog() -> StaticSource {
        StaticSource::new(vec![
            Suggestion::new("filter"),
            Suggestion::new("first"),
            Suggestion::new("range"),
        ])
    }

    #[test]
    fn test_mount_forces_initial_refresh() {
        let mut editor = editor();
        editor.mount(RecordingHost::new());

        assert_eq!(editor.host().unwrap().refreshes, 1);
    }

    #[test]
    fn test_error_status_paints_markers() {
        let mut editor = mounted_editor();

        editor.status_changed(ScriptStatus::error("2:4 undefined identifier\n5:1 bad call"));

        let host = editor.host().unwrap();
        assert_eq!(host.marker_lines(ERROR_GUTTER), vec![1, 4]);
        assert_eq!(editor.gutter().len(), 2);
    }

    #[test]
    fn test_success_status_clears_markers_and_widgets() {
        let mut editor = mounted_editor();

        editor.status_changed(ScriptStatus::error("2:4 boom"));
        editor.click_gutter(1);
        assert_eq!(editor.widgets().len(), 1);

        editor.status_changed(ScriptStatus::success());

        let host = editor.host().unwrap();
        assert!(host.marker_lines(ERROR_GUTTER).is_empty());
        assert!(host.widgets.is_empty());
        assert!(editor.gutter().is_empty());
        assert!(editor.widgets().is_empty());
    }

    #[test]
    fn test_status_before_mount_is_noop_then_applied_on_mount() {
        let mut editor = editor();

        // No host yet: nothing to paint on, nothing panics.
        editor.status_changed(ScriptStatus::error("3:1 boom"));
        assert!(editor.gutter().is_empty());

        // Mount catches the host up with the stored status.
        editor.mount(RecordingHost::new());

        let host = editor.host().unwrap();
        assert_eq!(host.marker_lines(ERROR_GUTTER), vec![2]);
    }

    #[test]
    fn test_script_change_fires_callback_and_repaints() {
        let mut editor = mounted_editor();
        let seen = Rc::new(Cell::new(0));
        let seen_in_callback = Rc::clone(&seen);
        editor.set_on_script_change(move |_| seen_in_callback.set(seen_in_callback.get() + 1));

        editor.status_changed(ScriptStatus::error("2:4 boom"));
        let clears_before = editor.host().unwrap().gutter_clears;

        editor.script_changed("from(bucket: \"telegraf\")");

        assert_eq!(seen.get(), 1);
        assert_eq!(editor.script(), "from(bucket: \"telegraf\")");
        // Markers rebuilt on the content update, not diffed.
        let host = editor.host().unwrap();
        assert_eq!(host.gutter_clears, clears_before + 1);
        assert_eq!(host.marker_lines(ERROR_GUTTER), vec![1]);
    }

    #[test]
    fn test_submit_chord_fires_callback() {
        let mut editor = mounted_editor();
        let submits = Rc::new(Cell::new(0));
        let submits_in_callback = Rc::clone(&submits);
        editor.set_on_submit(move || submits_in_callback.set(submits_in_callback.get() + 1));

        editor.handle_key_event(&KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL));

        assert_eq!(submits.get(), 1);
        // No hint list alongside the submit.
        assert!(editor.host().unwrap().hints.is_empty());
    }

    #[test]
    fn test_submit_chord_without_callback_does_nothing() {
        let mut editor = mounted_editor();
        editor.set_suggestion_source(catalog());

        editor.handle_key_event(&KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL));
        editor.process_async_messages();

        assert!(editor.host().unwrap().hints.is_empty());
    }

    #[test]
    fn test_typing_requests_and_shows_completions() {
        let mut editor = mounted_editor();
        editor.set_suggestion_source(catalog());
        editor.script_changed("fi");
        editor.cursor_moved(CursorPosition::new(0, 2));

        editor.handle_key_event(&KeyEvent::new(KeyCode::Char('i'), KeyModifiers::NONE));
        editor.process_async_messages();

        let host = editor.host().unwrap();
        assert_eq!(host.hints.len(), 1);
        let (candidates, options) = &host.hints[0];
        let texts: Vec<&str> = candidates.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["filter", "first"]);
        assert!(!options.complete_single);
    }

    #[test]
    fn test_stale_suggestion_response_is_discarded() {
        let mut editor = mounted_editor();
        let sender = editor.async_sender();
        editor.set_suggestion_source(catalog());

        // Issue a real request so a newer id is pending, then let an older
        // response arrive late.
        editor.handle_key_event(&KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE));
        sender
            .send(AsyncMessage::Suggestions {
                request_id: 0,
                items: vec![Suggestion::new("stale")],
            })
            .unwrap();

        editor.process_async_messages();

        let host = editor.host().unwrap();
        // Only the live request's candidates made it to the host.
        assert_eq!(host.hints.len(), 1);
        assert!(host.hints[0].0.iter().all(|s| s.text != "stale"));
    }

    #[test]
    fn test_each_request_supersedes_the_previous() {
        let mut editor = mounted_editor();
        editor.set_suggestion_source(catalog());

        editor.handle_key_event(&KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE));
        editor.handle_key_event(&KeyEvent::new(KeyCode::Char('i'), KeyModifiers::NONE));

        // Both replies are queued; only the second request's reply shows.
        editor.process_async_messages();

        assert_eq!(editor.host().unwrap().hints.len(), 1);
    }

    #[test]
    fn test_excluded_key_requests_nothing() {
        let mut editor = mounted_editor();
        editor.set_suggestion_source(catalog());

        editor.handle_key_event(&KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        editor.process_async_messages();

        assert!(editor.host().unwrap().hints.is_empty());
    }

    #[test]
    fn test_becoming_visible_defers_refresh_until_settle() {
        let mut editor = mounted_editor();
        let refreshes_after_mount = editor.host().unwrap().refreshes;

        editor.visibility_changed(Visibility::Hidden);
        editor.visibility_changed(Visibility::Visible);

        // Nothing yet: the settle interval has not passed.
        editor.tick(Instant::now());
        assert_eq!(editor.host().unwrap().refreshes, refreshes_after_mount);

        editor.tick(Instant::now() + Duration::from_millis(100));
        assert_eq!(
            editor.host().unwrap().refreshes,
            refreshes_after_mount + 1
        );

        // The deadline fires once.
        editor.tick(Instant::now() + Duration::from_millis(200));
        assert_eq!(
            editor.host().unwrap().refreshes,
            refreshes_after_mount + 1
        );
    }

    #[test]
    fn test_visible_to_visible_schedules_nothing() {
        let mut editor = mounted_editor();
        let refreshes_after_mount = editor.host().unwrap().refreshes;

        editor.visibility_changed(Visibility::Visible);
        editor.tick(Instant::now() + Duration::from_millis(100));

        assert_eq!(editor.host().unwrap().refreshes, refreshes_after_mount);
    }

    #[test]
    fn test_click_gutter_toggles_widget() {
        let mut editor = mounted_editor();
        editor.status_changed(ScriptStatus::error("4:2 bad range"));

        editor.click_gutter(3);
        assert!(editor.widgets().contains("4:2 bad range"));

        editor.click_gutter(3);
        assert!(editor.widgets().is_empty());
    }

    #[test]
    fn test_unmount_strips_annotations_and_returns_host() {
        let mut editor = mounted_editor();
        editor.status_changed(ScriptStatus::error("2:4 boom"));
        editor.click_gutter(1);

        let host = editor.unmount().unwrap();

        assert!(!editor.is_mounted());
        assert!(host.marker_lines(ERROR_GUTTER).is_empty());
        assert!(host.widgets.is_empty());

        // Host gone: annotation operations degrade to no-ops.
        editor.status_changed(ScriptStatus::error("5:1 later"));
        editor.click_gutter(4);
        assert!(editor.widgets().is_empty());
    }

    #[test]
    fn test_status_pushed_through_bridge_is_applied() {
        let mut editor = mounted_editor();
        let sender = editor.async_sender();

        sender
            .send(AsyncMessage::StatusChanged(ScriptStatus::error(
                "6:1 pushed from validator",
            )))
            .unwrap();
        editor.process_async_messages();

        assert_eq!(
            editor.host().unwrap().marker_lines(ERROR_GUTTER),
            vec![5]
        );
    }

    #[test]
    fn test_cursor_move_reaches_callback() {
        let mut editor = mounted_editor();
        let last_column = Rc::new(Cell::new(0usize));
        let last_column_in_callback = Rc::clone(&last_column);
        editor.set_on_cursor_move(move |cursor| last_column_in_callback.set(cursor.column));

        editor.cursor_moved(CursorPosition::new(2, 17));

        assert_eq!(editor.cursor(), CursorPosition::new(2, 17));
        assert_eq!(last_column.get(), 17);
    }
}
