//! Inline error widgets
//!
//! Clicking a gutter marker expands the full diagnostic message as a plain
//! text widget under the offending line. Widgets are keyed by message text:
//! at most one widget is open per distinct message, and a second click on
//! any marker carrying the same message closes it again, wherever it was
//! opened.

use crate::host::{EditorHost, WidgetHandle};

/// One open inline widget. The line index is captured when the widget opens
/// and does not follow later diagnostic batches.
#[derive(Debug, Clone)]
pub struct InlineWidget {
    pub message: String,
    pub line_index: usize,
    pub handle: WidgetHandle,
}

/// Owns every open inline widget. The host never tracks them independently;
/// handles returned by the host live here and nowhere else.
#[derive(Debug, Default)]
pub struct InlineWidgets {
    open: Vec<InlineWidget>,
}

impl InlineWidgets {
    pub fn new() -> Self {
        Self { open: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Whether a widget keyed by `message` is open
    pub fn contains(&self, message: &str) -> bool {
        self.open.iter().any(|w| w.message == message)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InlineWidget> {
        self.open.iter()
    }

    /// Open the widget keyed by `message` if absent, close it if present.
    /// One toggle affects exactly one widget; widgets for other messages are
    /// never touched.
    pub fn toggle(&mut self, message: &str, line_index: usize, host: &mut dyn EditorHost) {
        if let Some(pos) = self.open.iter().position(|w| w.message == message) {
            let widget = self.open.remove(pos);
            host.clear_line_widget(&widget.handle);
            tracing::debug!("Closed inline widget at line {}", widget.line_index);
            return;
        }

        let handle = host.add_line_widget(line_index, message);
        tracing::debug!("Opened inline widget at line {}", line_index);
        self.open.push(InlineWidget {
            message: message.to_string(),
            line_index,
            handle,
        });
    }

    /// Close every open widget and release its host handle. Safe to call on
    /// an empty set.
    pub fn clear_all(&mut self, host: &mut dyn EditorHost) {
        for widget in self.open.drain(..) {
            host.clear_line_widget(&widget.handle);
        }
    }
}
