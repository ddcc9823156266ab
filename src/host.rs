//! The narrow interface this subsystem uses against the text-editing widget.
//!
//! The annotation engine never reaches into the editing widget beyond this
//! trait: gutter mutation, line-widget insertion, hint display and redraw
//! requests. The widget itself (line storage, cursor placement, undo) lives
//! on the other side of the seam and is the authority on valid line ranges;
//! out-of-range indexes passed through here are the host's to clamp or drop.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::suggest::Suggestion;

/// Gutter channel carrying error annotations.
pub const ERROR_GUTTER: &str = "error-gutter";

/// Glyph used for error markers in hosts that render text gutters.
pub const ERROR_GLYPH: char = '●';

/// Opaque handle for a line widget, returned by the host on insertion and
/// presented back to it for removal. Internally a String but callers treat
/// it as opaque; it stays valid until cleared regardless of text edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct WidgetHandle(pub String);

impl WidgetHandle {
    /// Generate a new unique handle
    pub fn new() -> Self {
        static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);
        Self(format!(
            "wdg_{}",
            NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
        ))
    }

    /// Create a handle from a string (for hosts with their own id scheme)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Get the internal string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WidgetHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderable description of a gutter marker. The host decides how to draw
/// it; the tooltip carries the full diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerElement {
    pub glyph: char,
    pub tooltip: String,
}

impl MarkerElement {
    /// Marker for an error diagnostic with the message as tooltip.
    pub fn error(tooltip: impl Into<String>) -> Self {
        Self {
            glyph: ERROR_GLYPH,
            tooltip: tooltip.into(),
        }
    }
}

/// Options passed along with a hint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HintOptions {
    /// When true the host may auto-accept a sole candidate. The trigger
    /// always passes false: a single suggestion is never silently inserted.
    pub complete_single: bool,
}

/// Surface consumed from the text-editing widget.
///
/// One implementation is bound to exactly one editor session at mount time
/// and owned there; sessions never share a host and never hold one through
/// global state.
pub trait EditorHost {
    /// Redraw the widget. Also issued once right after mount to settle
    /// initial line-height measurement in lazily-measured widgets.
    fn refresh(&mut self);

    /// Remove every marker on the named gutter channel.
    fn clear_gutter(&mut self, channel: &str);

    /// Place `element` as the marker for `line_index` on `channel`,
    /// replacing whatever marker that line previously carried.
    fn set_gutter_marker(&mut self, line_index: usize, channel: &str, element: MarkerElement);

    /// Insert a plain-text widget under `line_index`. The returned handle
    /// is the only way to remove it again.
    fn add_line_widget(&mut self, line_index: usize, text: &str) -> WidgetHandle;

    /// Remove the widget identified by `handle`. Unknown handles are
    /// ignored.
    fn clear_line_widget(&mut self, handle: &WidgetHandle);

    /// Display a candidate list at the current cursor position.
    fn show_hint_list(&mut self, candidates: &[Suggestion], options: &HintOptions);
}
