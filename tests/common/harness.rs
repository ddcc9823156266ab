// AnnotationTestHarness - drives a full editor session against an in-memory host

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use flux_editor::config::Config;
use flux_editor::diagnostics::ScriptStatus;
use flux_editor::editor::FluxEditor;
use flux_editor::host::{EditorHost, HintOptions, MarkerElement, WidgetHandle, ERROR_GUTTER};
use flux_editor::suggest::{CursorPosition, StaticSource, Suggestion};

/// In-memory host standing in for the text widget: one marker slot per
/// (channel, line), open widgets in insertion order, every hint list shown.
#[derive(Debug, Default)]
pub struct ProbeHost {
    pub markers: HashMap<(String, usize), MarkerElement>,
    pub widgets: Vec<(WidgetHandle, usize, String)>,
    pub hints: Vec<(Vec<Suggestion>, HintOptions)>,
    pub refreshes: usize,
}

impl EditorHost for ProbeHost {
    fn refresh(&mut self) {
        self.refreshes += 1;
    }

    fn clear_gutter(&mut self, channel: &str) {
        self.markers.retain(|(ch, _), _| ch != channel);
    }

    fn set_gutter_marker(&mut self, line_index: usize, channel: &str, element: MarkerElement) {
        self.markers.insert((channel.to_string(), line_index), element);
    }

    fn add_line_widget(&mut self, line_index: usize, text: &str) -> WidgetHandle {
        let handle = WidgetHandle::new();
        self.widgets.push((handle.clone(), line_index, text.to_string()));
        handle
    }

    fn clear_line_widget(&mut self, handle: &WidgetHandle) {
        self.widgets.retain(|(h, _, _)| h != handle);
    }

    fn show_hint_list(&mut self, candidates: &[Suggestion], options: &HintOptions) {
        self.hints.push((candidates.to_vec(), *options));
    }
}

/// A mounted session plus the script buffer an embedding application would
/// own, so tests can drive the same notification sequence the real embedder
/// produces.
pub struct AnnotationTestHarness {
    pub editor: FluxEditor<ProbeHost>,
    script: String,
    cursor: CursorPosition,
}

impl AnnotationTestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut editor = FluxEditor::new(&config);
        editor.set_suggestion_source(StaticSource::new(vec![
            Suggestion::with_description("from", "query data from a bucket"),
            Suggestion::new("filter"),
            Suggestion::new("first"),
            Suggestion::new("range"),
        ]));
        editor.mount(ProbeHost::default());

        Self {
            editor,
            script: String::new(),
            cursor: CursorPosition::default(),
        }
    }

    /// Type characters one keystroke at a time, the way an embedder feeds
    /// the session: buffer update, cursor move, then the key release.
    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            let code = if c == '\n' {
                self.script.push('\n');
                self.cursor.line += 1;
                self.cursor.column = 0;
                KeyCode::Enter
            } else {
                self.script.push(c);
                self.cursor.column += 1;
                KeyCode::Char(c)
            };
            self.editor.script_changed(&self.script);
            self.editor.cursor_moved(self.cursor);
            self.send_key(code, KeyModifiers::NONE);
        }
        self.pump();
    }

    pub fn send_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let event = KeyEvent::new(code, modifiers);
        self.editor.handle_key_event(&event);
    }

    /// Drain the async bridge, applying queued suggestion and status replies.
    pub fn pump(&mut self) {
        self.editor.process_async_messages();
    }

    pub fn report_error(&mut self, text: &str) {
        self.editor.status_changed(ScriptStatus::error(text));
    }

    pub fn report_success(&mut self) {
        self.editor.status_changed(ScriptStatus::success());
    }

    pub fn click_gutter(&mut self, line_index: usize) {
        self.editor.click_gutter(line_index);
    }

    pub fn host(&self) -> &ProbeHost {
        self.editor.host().expect("session is mounted")
    }

    /// Error-gutter marker line indexes, sorted.
    pub fn marker_lines(&self) -> Vec<usize> {
        let mut lines: Vec<usize> = self
            .host()
            .markers
            .keys()
            .filter(|(channel, _)| channel == ERROR_GUTTER)
            .map(|(_, line)| *line)
            .collect();
        lines.sort_unstable();
        lines
    }

    pub fn widget_texts(&self) -> Vec<String> {
        self.host()
            .widgets
            .iter()
            .map(|(_, _, text)| text.clone())
            .collect()
    }

    /// Candidate texts of the most recent hint list, if any was shown.
    pub fn last_hint_texts(&self) -> Option<Vec<String>> {
        self.host()
            .hints
            .last()
            .map(|(candidates, _)| candidates.iter().map(|s| s.text.clone()).collect())
    }
}
