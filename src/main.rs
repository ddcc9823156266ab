use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::{Position, Rect, Size};
use ratatui::widgets::Clear;
use ratatui::{DefaultTerminal, Frame};
use tracing_subscriber::EnvFilter;

use flux_editor::async_bridge::AsyncMessage;
use flux_editor::config::Config;
use flux_editor::diagnostics::{ScriptStatus, StatusKind};
use flux_editor::editor::{FluxEditor, Visibility};
use flux_editor::host::ERROR_GUTTER;
use flux_editor::suggest::{CursorPosition, StaticSource, Suggestion};
use flux_editor::tui::{TuiHost, TEXT_LEFT_MARGIN};

const DEMO_SCRIPT: &str = "from(bucket: \"telegraf\")\n  |> range(start: -1h)\n  |> filter(fn: (r) => r._measurement == \"cpu\")";

/// Flux script editor with inline diagnostics
#[derive(Parser, Debug)]
#[command(name = "flux-editor", about = "Flux script editor with inline diagnostics", version)]
struct Args {
    /// Flux script to open (a demo script is loaded when omitted)
    script: Option<PathBuf>,

    /// Path to configuration file (default: platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to log file for editor diagnostics (default: system temp dir)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

struct State {
    editor: FluxEditor<TuiHost>,
    lines: Vec<String>,
    cursor: CursorPosition,

    /// First document line shown in the text area
    window_top: usize,

    status_text: String,
    submits: Rc<Cell<u64>>,
    script_path: Option<PathBuf>,
    validator_tx: mpsc::Sender<String>,
    terminal_size: Size,
}

impl State {
    fn run(&mut self, mut terminal: DefaultTerminal) -> io::Result<()> {
        loop {
            self.terminal_size = terminal.size()?;
            self.editor.process_async_messages();
            self.editor.tick(Instant::now());
            self.scroll_to_cursor();
            self.sync_status_line();

            terminal.draw(|frame| self.draw_frame(frame))?;

            if event::poll(Duration::from_millis(50))? {
                let event = event::read()?;
                if !self.handle_event(event) {
                    break Ok(());
                }
            }
        }
    }

    fn draw_frame(&self, frame: &mut Frame) {
        let window_area = frame.area();
        if window_area.height == 0 {
            return;
        }
        let text_area = Rect::new(0, 0, window_area.width, window_area.height - 1);
        let status_area = Rect::new(0, window_area.height - 1, window_area.width, 1);

        let host = match self.editor.host() {
            Some(host) => host,
            None => return,
        };

        let cursor_position =
            host.render_document(frame, text_area, &self.lines, self.cursor, self.window_top);

        frame.render_widget(self.status_text.clone(), status_area);

        if let Some(position) = cursor_position {
            if let Some(size) = host.hint_popup_size() {
                let popup = hint_popup_area(window_area, position, size);
                frame.render_widget(Clear, popup);
                host.render_hints(frame, popup);
            }
            frame.set_cursor_position(position);
        }
    }

    fn sync_status_line(&mut self) {
        let kind = match self.editor.status().kind {
            StatusKind::Idle => "idle",
            StatusKind::Success => "ok",
            StatusKind::Error => "errors",
        };
        let mut status = format!(
            "[{}] Line {}, Column {}",
            kind,
            self.cursor.line + 1,
            self.cursor.column + 1
        );
        if self.submits.get() > 0 {
            status.push_str(&format!("  submits: {}", self.submits.get()));
        }
        if let Some(host) = self.editor.host() {
            if let Some(marker) = host.marker_at(ERROR_GUTTER, self.cursor.line) {
                status.push_str("  ");
                status.push_str(&marker.tooltip);
            }
        }
        self.status_text = status;
    }

    fn scroll_to_cursor(&mut self) {
        let page = self.lines_per_page();
        if page == 0 {
            return;
        }
        if self.cursor.line < self.window_top {
            self.window_top = self.cursor.line;
        } else if self.cursor.line >= self.window_top + page {
            self.window_top = self.cursor.line + 1 - page;
        }
    }

    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key_event) => return self.handle_key_event(key_event),
            Event::Mouse(mouse_event) => self.handle_mouse_event(mouse_event),
            Event::FocusGained => self.editor.visibility_changed(Visibility::Visible),
            Event::FocusLost => self.editor.visibility_changed(Visibility::Hidden),
            _ => {}
        }

        true
    }

    fn handle_key_event(&mut self, key_event: KeyEvent) -> bool {
        if self.handle_hint_key(&key_event) {
            return true;
        }

        match key_event {
            KeyEvent {
                code: KeyCode::Char('q'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => return false,

            KeyEvent {
                code: KeyCode::Char('s'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.save(),

            KeyEvent {
                code: KeyCode::Char(c),
                modifiers,
                ..
            } if modifiers == KeyModifiers::NONE || modifiers == KeyModifiers::SHIFT => {
                self.insert_char(c)
            }

            KeyEvent {
                code: KeyCode::Backspace,
                modifiers: KeyModifiers::NONE,
                ..
            } => self.delete_prev_char(),

            KeyEvent {
                code: KeyCode::Delete,
                modifiers: KeyModifiers::NONE,
                ..
            } => self.delete_next_char(),

            KeyEvent {
                code: KeyCode::Enter,
                modifiers: KeyModifiers::NONE,
                ..
            } => self.insert_line(),

            KeyEvent {
                code: KeyCode::Home,
                ..
            } => self.move_to_line_start(),

            KeyEvent {
                code: KeyCode::End, ..
            } => self.move_to_line_end(),

            KeyEvent {
                code: KeyCode::Left,
                modifiers: KeyModifiers::NONE,
                ..
            } => self.move_left(),

            KeyEvent {
                code: KeyCode::Right,
                modifiers: KeyModifiers::NONE,
                ..
            } => self.move_right(),

            KeyEvent {
                code: KeyCode::Up,
                modifiers: KeyModifiers::NONE,
                ..
            } => self.move_up(),

            KeyEvent {
                code: KeyCode::Down,
                modifiers: KeyModifiers::NONE,
                ..
            } => self.move_down(),

            KeyEvent {
                code: KeyCode::PageUp,
                ..
            } => self.move_page_up(),

            KeyEvent {
                code: KeyCode::PageDown,
                ..
            } => self.move_page_down(),

            _ => {}
        }

        // The annotation engine classifies the key on its own: completion
        // triggers, the submit chord, excluded keys.
        self.editor.handle_key_event(&key_event);
        true
    }

    /// Keys consumed by an open hint popup. Returns false when the event
    /// should continue through normal handling.
    fn handle_hint_key(&mut self, key_event: &KeyEvent) -> bool {
        let host = match self.editor.host_mut() {
            Some(host) if host.hints_visible() => host,
            _ => return false,
        };

        match key_event.code {
            KeyCode::Down => host.select_next_hint(),
            KeyCode::Up => host.select_prev_hint(),
            KeyCode::Esc => host.dismiss_hints(),
            KeyCode::Enter | KeyCode::Tab => {
                if let Some(candidate) = host.accept_hint() {
                    self.insert_completion(&candidate.text);
                }
            }
            _ => {
                host.dismiss_hints();
                return false;
            }
        }

        true
    }

    fn handle_mouse_event(&mut self, mouse_event: MouseEvent) {
        if mouse_event.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let row = mouse_event.row as usize;
        let column = mouse_event.column as usize;
        if row >= self.lines_per_page() {
            return;
        }

        let line_index = {
            let host = match self.editor.host() {
                Some(host) => host,
                None => return,
            };
            match host.line_at_screen_row(self.window_top, self.lines.len(), row) {
                Some(line_index) => line_index,
                None => return,
            }
        };

        if column == 0 {
            self.editor.click_gutter(line_index);
            return;
        }

        if column >= TEXT_LEFT_MARGIN {
            self.cursor.line = line_index;
            self.cursor.column = (column - TEXT_LEFT_MARGIN).min(self.line_len(line_index));
            self.after_move();
        }
    }

    /// Replace the word fragment left of the cursor with the accepted
    /// candidate.
    fn insert_completion(&mut self, text: &str) {
        let line = match self.lines.get_mut(self.cursor.line) {
            Some(line) => line,
            None => return,
        };

        let chars: Vec<char> = line.chars().collect();
        let column = self.cursor.column.min(chars.len());
        let mut start = column;
        while start > 0 && (chars[start - 1].is_alphanumeric() || chars[start - 1] == '_') {
            start -= 1;
        }

        let mut rebuilt: String = chars[..start].iter().collect();
        rebuilt.push_str(text);
        let cursor_column = rebuilt.chars().count();
        rebuilt.extend(chars[column..].iter());

        *line = rebuilt;
        self.cursor.column = cursor_column;
        self.after_edit();
    }

    fn insert_char(&mut self, c: char) {
        let cursor = self.cursor;
        let line = match self.lines.get_mut(cursor.line) {
            Some(line) => line,
            None => return,
        };
        line.insert(char_to_byte(line, cursor.column), c);
        self.cursor.column += 1;
        self.after_edit();
    }

    fn delete_prev_char(&mut self) {
        if self.cursor.column > 0 {
            self.cursor.column -= 1;
            let cursor = self.cursor;
            if let Some(line) = self.lines.get_mut(cursor.line) {
                line.remove(char_to_byte(line, cursor.column));
            }
            self.after_edit();
        } else if self.cursor.line > 0 {
            let tail = self.lines.remove(self.cursor.line);
            self.cursor.line -= 1;
            let line = &mut self.lines[self.cursor.line];
            self.cursor.column = line.chars().count();
            line.push_str(&tail);
            self.after_edit();
        }
    }

    fn delete_next_char(&mut self) {
        let cursor = self.cursor;
        if cursor.column < self.line_len(cursor.line) {
            if let Some(line) = self.lines.get_mut(cursor.line) {
                line.remove(char_to_byte(line, cursor.column));
            }
            self.after_edit();
        } else if cursor.line + 1 < self.lines.len() {
            let tail = self.lines.remove(cursor.line + 1);
            self.lines[cursor.line].push_str(&tail);
            self.after_edit();
        }
    }

    fn insert_line(&mut self) {
        let cursor = self.cursor;
        let line = match self.lines.get_mut(cursor.line) {
            Some(line) => line,
            None => return,
        };
        let tail = line.split_off(char_to_byte(line, cursor.column));
        self.cursor.line += 1;
        self.cursor.column = 0;
        self.lines.insert(self.cursor.line, tail);
        self.after_edit();
    }

    fn move_left(&mut self) {
        if self.cursor.column > 0 {
            self.cursor.column -= 1;
        } else if self.cursor.line > 0 {
            self.cursor.line -= 1;
            self.cursor.column = self.line_len(self.cursor.line);
        }
        self.after_move();
    }

    fn move_right(&mut self) {
        if self.cursor.column < self.line_len(self.cursor.line) {
            self.cursor.column += 1;
        } else if self.cursor.line + 1 < self.lines.len() {
            self.cursor.line += 1;
            self.cursor.column = 0;
        }
        self.after_move();
    }

    fn move_up(&mut self) {
        if self.cursor.line == 0 {
            return;
        }
        self.cursor.line -= 1;
        self.cursor.column = self.cursor.column.min(self.line_len(self.cursor.line));
        self.after_move();
    }

    fn move_down(&mut self) {
        if self.cursor.line + 1 >= self.lines.len() {
            return;
        }
        self.cursor.line += 1;
        self.cursor.column = self.cursor.column.min(self.line_len(self.cursor.line));
        self.after_move();
    }

    fn move_page_up(&mut self) {
        for _ in 0..self.lines_per_page() {
            self.move_up();
        }
    }

    fn move_page_down(&mut self) {
        for _ in 0..self.lines_per_page() {
            self.move_down();
        }
    }

    fn move_to_line_start(&mut self) {
        self.cursor.column = 0;
        self.after_move();
    }

    fn move_to_line_end(&mut self) {
        self.cursor.column = self.line_len(self.cursor.line);
        self.after_move();
    }

    fn save(&mut self) {
        let path = match &self.script_path {
            Some(path) => path,
            None => return,
        };
        match fs::write(path, self.lines.join("\n")) {
            Ok(()) => tracing::info!("Saved {}", path.display()),
            Err(e) => tracing::error!("Save failed: {}", e),
        }
    }

    /// Push the current buffer into the annotation engine and queue it for
    /// validation.
    fn push_script(&mut self) {
        let script = self.lines.join("\n");
        self.editor.script_changed(&script);
        let _ = self.validator_tx.send(script);
    }

    fn after_edit(&mut self) {
        self.push_script();
        self.editor.cursor_moved(self.cursor);
    }

    fn after_move(&mut self) {
        self.editor.cursor_moved(self.cursor);
    }

    fn line_len(&self, line_index: usize) -> usize {
        self.lines
            .get(line_index)
            .map(|line| line.chars().count())
            .unwrap_or(0)
    }

    fn lines_per_page(&self) -> usize {
        self.terminal_size.height.saturating_sub(1) as usize
    }
}

fn char_to_byte(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

fn hint_popup_area(window: Rect, cursor: Position, size: (u16, u16)) -> Rect {
    let width = size.0.min(window.width);
    let height = size.1.min(8);
    let x = cursor.x.min(window.width.saturating_sub(width));
    let y = if cursor.y + 1 + height <= window.height {
        cursor.y + 1
    } else {
        cursor.y.saturating_sub(height)
    };
    let height = height.min(window.height.saturating_sub(y));
    Rect::new(x, y, width, height)
}

/// Structural check standing in for a full Flux parse: unbalanced brackets
/// and unterminated strings, reported as `line:column message` lines.
fn check_script(script: &str) -> ScriptStatus {
    let mut problems: Vec<String> = Vec::new();
    let mut open: Vec<(char, usize, usize)> = Vec::new();

    for (line_index, line) in script.split('\n').enumerate() {
        let mut in_string = false;
        let mut string_col = 0;
        for (column, c) in line.chars().enumerate() {
            if in_string {
                if c == '"' {
                    in_string = false;
                }
                continue;
            }
            match c {
                '"' => {
                    in_string = true;
                    string_col = column;
                }
                '(' | '[' | '{' => open.push((c, line_index, column)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match open.pop() {
                        Some((opener, _, _)) if opener == expected => {}
                        _ => problems.push(format!(
                            "{}:{} unmatched {}",
                            line_index + 1,
                            column + 1,
                            c
                        )),
                    }
                }
                _ => {}
            }
        }
        // Strings do not continue across lines in Flux.
        if in_string {
            problems.push(format!(
                "{}:{} unterminated string",
                line_index + 1,
                string_col + 1
            ));
        }
    }

    for (opener, line_index, column) in open {
        problems.push(format!(
            "{}:{} unclosed {}",
            line_index + 1,
            column + 1,
            opener
        ));
    }

    if problems.is_empty() {
        ScriptStatus::success()
    } else {
        ScriptStatus::error(problems.join("\n"))
    }
}

/// Validator worker: latest script snapshot in, status out through the
/// editor's bridge.
fn spawn_validator(reply: mpsc::Sender<AsyncMessage>) -> mpsc::Sender<String> {
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        while let Ok(mut script) = rx.recv() {
            // Coalesce typing bursts down to the latest snapshot.
            while let Ok(newer) = rx.try_recv() {
                script = newer;
            }
            let status = check_script(&script);
            if reply.send(AsyncMessage::StatusChanged(status)).is_err() {
                break;
            }
        }
    });
    tx
}

fn flux_catalog() -> Vec<Suggestion> {
    vec![
        Suggestion::with_description("from", "query data from a bucket"),
        Suggestion::with_description("range", "filter rows by time bounds"),
        Suggestion::with_description("filter", "filter rows by predicate"),
        Suggestion::with_description("map", "apply a function to each row"),
        Suggestion::with_description("mean", "average the _value column"),
        Suggestion::with_description("median", "median of the _value column"),
        Suggestion::with_description("max", "largest _value per table"),
        Suggestion::with_description("min", "smallest _value per table"),
        Suggestion::with_description("sum", "sum the _value column"),
        Suggestion::with_description("count", "count rows per table"),
        Suggestion::with_description("group", "regroup tables by columns"),
        Suggestion::with_description("keep", "keep only the named columns"),
        Suggestion::with_description("drop", "remove the named columns"),
        Suggestion::with_description("limit", "first n rows per table"),
        Suggestion::with_description("sort", "order rows by columns"),
        Suggestion::with_description("pivot", "rotate values into columns"),
        Suggestion::with_description("window", "partition rows by time"),
        Suggestion::with_description("aggregateWindow", "windowed aggregation"),
        Suggestion::with_description("derivative", "rate of change per unit"),
        Suggestion::with_description("yield", "name and deliver a result"),
    ]
}

fn init_tracing(path: &Path) -> io::Result<()> {
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flux_editor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    // The terminal belongs to the UI; logs go to a file.
    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("flux-editor.log"));
    init_tracing(&log_file)?;

    let config = match args.config.as_ref() {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::load_or_default(),
    };

    let lines: Vec<String> = match &args.script {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text.split('\n').map(str::to_string).collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => vec![String::new()],
            Err(e) => return Err(e),
        },
        None => DEMO_SCRIPT.split('\n').map(str::to_string).collect(),
    };

    let mut editor = FluxEditor::new(&config);
    editor.set_suggestion_source(StaticSource::new(flux_catalog()));

    let submits = Rc::new(Cell::new(0u64));
    {
        let submits = Rc::clone(&submits);
        editor.set_on_submit(move || submits.set(submits.get() + 1));
    }

    editor.mount(TuiHost::new());
    let validator_tx = spawn_validator(editor.async_sender());

    let terminal = ratatui::init();
    let _ = execute!(io::stdout(), event::EnableMouseCapture, event::EnableFocusChange);

    let mut state = State {
        editor,
        lines,
        cursor: CursorPosition::default(),
        window_top: 0,
        status_text: String::new(),
        submits,
        script_path: args.script,
        validator_tx,
        terminal_size: terminal.size()?,
    };
    state.push_script();

    let result = state.run(terminal);

    let _ = execute!(io::stdout(), event::DisableMouseCapture, event::DisableFocusChange);
    ratatui::restore();
    result
}
