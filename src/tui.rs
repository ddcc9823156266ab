//! Terminal host backed by ratatui.
//!
//! [`TuiHost`] keeps the annotation surface in memory: one marker slot per
//! line on each gutter channel, open line widgets anchored under their
//! lines, and the most recent hint list. Rendering walks the script through
//! these annotations each frame; the error gutter sits left of the line
//! numbers and widget rows are interleaved under their anchor lines.

use std::collections::HashMap;

use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::host::{EditorHost, HintOptions, MarkerElement, WidgetHandle, ERROR_GUTTER};
use crate::suggest::{CursorPosition, Suggestion};

const LINE_NUMBER_WIDTH: usize = 4;

/// Columns left of the script text: gutter glyph, line number, one space.
pub const TEXT_LEFT_MARGIN: usize = 1 + LINE_NUMBER_WIDTH + 1;

#[derive(Debug)]
struct LineWidget {
    handle: WidgetHandle,
    line_index: usize,
    text: String,
}

#[derive(Debug)]
struct HintState {
    candidates: Vec<Suggestion>,
    selected: usize,
}

/// Annotation surface for a ratatui terminal.
#[derive(Debug, Default)]
pub struct TuiHost {
    /// One marker slot per line, keyed by gutter channel
    markers: HashMap<String, HashMap<usize, MarkerElement>>,
    widgets: Vec<LineWidget>,
    hints: Option<HintState>,
    refreshes: u64,
}

impl TuiHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker currently occupying `line_index` on `channel`, if any.
    pub fn marker_at(&self, channel: &str, line_index: usize) -> Option<&MarkerElement> {
        self.markers.get(channel)?.get(&line_index)
    }

    pub fn open_widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// How many redraws were requested through the host interface.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn hints_visible(&self) -> bool {
        self.hints.is_some()
    }

    pub fn select_next_hint(&mut self) {
        if let Some(hints) = self.hints.as_mut() {
            hints.selected = (hints.selected + 1) % hints.candidates.len();
        }
    }

    pub fn select_prev_hint(&mut self) {
        if let Some(hints) = self.hints.as_mut() {
            let len = hints.candidates.len();
            hints.selected = (hints.selected + len - 1) % len;
        }
    }

    pub fn dismiss_hints(&mut self) {
        self.hints = None;
    }

    /// Close the hint list and hand back the selected candidate.
    pub fn accept_hint(&mut self) -> Option<Suggestion> {
        let hints = self.hints.take()?;
        hints.candidates.into_iter().nth(hints.selected)
    }

    /// Popup size needed to show every candidate, (width, height).
    pub fn hint_popup_size(&self) -> Option<(u16, u16)> {
        let hints = self.hints.as_ref()?;
        let width = hints
            .candidates
            .iter()
            .map(|candidate| UnicodeWidthStr::width(hint_row(candidate).as_str()))
            .max()
            .unwrap_or(0);
        Some((width as u16 + 2, hints.candidates.len() as u16))
    }

    fn widgets_under(&self, line_index: usize) -> impl Iterator<Item = &LineWidget> {
        self.widgets.iter().filter(move |w| w.line_index == line_index)
    }

    /// Map a screen row back to the document line rendered there. Rows
    /// occupied by widget lines map to `None`.
    pub fn line_at_screen_row(
        &self,
        window_top: usize,
        line_count: usize,
        row: usize,
    ) -> Option<usize> {
        let mut next_row = 0;
        for line_index in window_top..line_count {
            if next_row == row {
                return Some(line_index);
            }
            next_row += 1 + self.widgets_under(line_index).count();
            if next_row > row {
                return None;
            }
        }
        None
    }

    /// Render the script with gutter markers and widget rows. Returns the
    /// screen position of the cursor when its line is on screen.
    pub fn render_document(
        &self,
        frame: &mut Frame,
        area: Rect,
        lines: &[String],
        cursor: CursorPosition,
        window_top: usize,
    ) -> Option<Position> {
        let mut rows: Vec<Line> = Vec::new();
        let mut cursor_position = None;

        for (line_index, text) in lines.iter().enumerate().skip(window_top) {
            if rows.len() >= area.height as usize {
                break;
            }

            let glyph = self
                .marker_at(ERROR_GUTTER, line_index)
                .map(|marker| marker.glyph)
                .unwrap_or(' ');
            let number_style = if line_index == cursor.line {
                Style::new().white()
            } else {
                Style::new().dark_gray()
            };

            if line_index == cursor.line {
                cursor_position = Some(Position::new(
                    area.x + (TEXT_LEFT_MARGIN + cursor.column) as u16,
                    area.y + rows.len() as u16,
                ));
            }

            rows.push(Line::from(vec![
                Span::styled(glyph.to_string(), Style::new().red()),
                Span::styled(
                    format!("{:>width$}", line_index + 1, width = LINE_NUMBER_WIDTH),
                    number_style,
                ),
                Span::raw(" "),
                Span::raw(text.clone()),
            ]));

            for widget in self.widgets_under(line_index) {
                if rows.len() >= area.height as usize {
                    break;
                }
                rows.push(Line::from(vec![
                    Span::raw(format!("{:width$}", "", width = TEXT_LEFT_MARGIN)),
                    Span::styled(widget.text.clone(), Style::new().red()),
                ]));
            }
        }

        frame.render_widget(Text::from(rows), area);
        cursor_position
    }

    /// Render the hint popup into `area`. No-op when no hint list is open.
    pub fn render_hints(&self, frame: &mut Frame, area: Rect) {
        let hints = match &self.hints {
            Some(hints) => hints,
            None => return,
        };

        let mut rows = Vec::new();
        let visible = (area.height as usize).min(hints.candidates.len());
        for (index, candidate) in hints.candidates[..visible].iter().enumerate() {
            let style = if index == hints.selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            };
            rows.push(Line::from(Span::styled(hint_row(candidate), style)));
        }

        frame.render_widget(Paragraph::new(rows), area);
    }
}

fn hint_row(candidate: &Suggestion) -> String {
    match &candidate.description {
        Some(description) => format!("  {}  -  {}", candidate.text, description),
        None => format!("  {}", candidate.text),
    }
}

impl EditorHost for TuiHost {
    fn refresh(&mut self) {
        self.refreshes += 1;
    }

    fn clear_gutter(&mut self, channel: &str) {
        self.markers.remove(channel);
    }

    fn set_gutter_marker(&mut self, line_index: usize, channel: &str, element: MarkerElement) {
        self.markers
            .entry(channel.to_string())
            .or_default()
            .insert(line_index, element);
    }

    fn add_line_widget(&mut self, line_index: usize, text: &str) -> WidgetHandle {
        let handle = WidgetHandle::new();
        self.widgets.push(LineWidget {
            handle: handle.clone(),
            line_index,
            text: text.to_string(),
        });
        handle
    }

    fn clear_line_widget(&mut self, handle: &WidgetHandle) {
        self.widgets.retain(|w| &w.handle != handle);
    }

    fn show_hint_list(&mut self, candidates: &[Suggestion], options: &HintOptions) {
        if candidates.is_empty() {
            self.hints = None;
            return;
        }
        tracing::debug!(
            "Showing {} completion candidates (complete_single: {})",
            candidates.len(),
            options.complete_single
        );
        self.hints = Some(HintState {
            candidates: candidates.to_vec(),
            selected: 0,
        });
    }
}
