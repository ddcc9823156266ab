//! Error gutter annotations
//!
//! Diagnostics of kind Error paint one clickable marker per placeable entry.
//! Every batch fully replaces the previous one: the channel is cleared and
//! rebuilt, never diffed. A batch of any other kind clears the markers and
//! the inline widgets with them.

use crate::diagnostics::{DiagnosticEntry, StatusKind};
use crate::host::{EditorHost, MarkerElement, ERROR_GUTTER};
use crate::line_widgets::InlineWidgets;

/// One placed marker, remembered for click resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GutterMarker {
    pub line_index: usize,
    pub message: String,
}

/// Owns the set of currently-displayed error markers.
#[derive(Debug, Default)]
pub struct GutterAnnotations {
    markers: Vec<GutterMarker>,
}

impl GutterAnnotations {
    pub fn new() -> Self {
        Self {
            markers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GutterMarker> {
        self.markers.iter()
    }

    /// The marker at `line_index`, if that line carries one.
    pub fn marker_at(&self, line_index: usize) -> Option<&GutterMarker> {
        self.markers.iter().find(|m| m.line_index == line_index)
    }

    /// Apply one status batch: Error rebuilds the markers from `entries`,
    /// anything else clears markers and widgets both.
    pub fn apply_status(
        &mut self,
        kind: StatusKind,
        entries: &[DiagnosticEntry],
        widgets: &mut InlineWidgets,
        host: &mut dyn EditorHost,
    ) {
        if kind == StatusKind::Error {
            self.rebuild(entries, host);
        } else {
            self.clear(widgets, host);
        }
    }

    /// Clear the channel and rebuild one marker per entry with a placeable
    /// line, then ask the host to redraw. Lines beyond the document are
    /// forwarded as-is; the host is the authority on bounds.
    fn rebuild(&mut self, entries: &[DiagnosticEntry], host: &mut dyn EditorHost) {
        host.clear_gutter(ERROR_GUTTER);
        self.markers.clear();

        for entry in entries {
            // Entries without a placeable line (malformed locator, line 0)
            // are the parser's permissive output; they stop here.
            let line_index = match entry.line.and_then(|line| line.checked_sub(1)) {
                Some(index) => index,
                None => continue,
            };

            host.set_gutter_marker(
                line_index,
                ERROR_GUTTER,
                MarkerElement::error(entry.message.as_str()),
            );

            // A gutter has one marker slot per line; the later entry wins.
            self.markers.retain(|m| m.line_index != line_index);
            self.markers.push(GutterMarker {
                line_index,
                message: entry.message.clone(),
            });
        }

        tracing::info!("Placed {} error markers", self.markers.len());
        host.refresh();
    }

    /// Drop every marker from the host and the set, and close all inline
    /// widgets with them.
    pub fn clear(&mut self, widgets: &mut InlineWidgets, host: &mut dyn EditorHost) {
        host.clear_gutter(ERROR_GUTTER);
        self.markers.clear();
        widgets.clear_all(host);
    }

    /// A gutter click at `line_index` toggles the inline widget keyed by the
    /// marker's message. Clicks on lines without a marker do nothing.
    pub fn click(
        &self,
        line_index: usize,
        widgets: &mut InlineWidgets,
        host: &mut dyn EditorHost,
    ) {
        if let Some(marker) = self.marker_at(line_index) {
            widgets.toggle(&marker.message, marker.line_index, host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::parse_status_text;
    use crate::host::test_support::RecordingHost;

    fn apply_error(
        gutter: &mut GutterAnnotations,
        text: &str,
        widgets: &mut InlineWidgets,
        host: &mut RecordingHost,
    ) {
        let entries = parse_status_text(text);
        gutter.apply_status(StatusKind::Error, &entries, widgets, host);
    }

    #[test]
    fn test_error_batch_places_marker_per_placeable_entry() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(
            &mut gutter,
            "1:5 bad call\nnot a locator\n7:2 bad range",
            &mut widgets,
            &mut host,
        );

        // Lines 1 and 7 place at indexes 0 and 6; the malformed entry stops
        // at the manager.
        assert_eq!(gutter.len(), 2);
        assert_eq!(host.marker_lines(ERROR_GUTTER), vec![0, 6]);
        assert_eq!(host.refreshes, 1);

        let element = &host.markers[&(ERROR_GUTTER.to_string(), 0)];
        assert_eq!(element.tooltip, "1:5 bad call");
    }

    #[test]
    fn test_reapplying_same_batch_is_idempotent() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "2:1 a\n5:3 b", &mut widgets, &mut host);
        let after_first = host.marker_lines(ERROR_GUTTER);

        apply_error(&mut gutter, "2:1 a\n5:3 b", &mut widgets, &mut host);

        assert_eq!(gutter.len(), 2);
        assert_eq!(host.marker_lines(ERROR_GUTTER), after_first);
    }

    #[test]
    fn test_new_batch_fully_replaces_previous() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "2:1 first\n3:1 second", &mut widgets, &mut host);
        apply_error(&mut gutter, "9:4 third", &mut widgets, &mut host);

        assert_eq!(gutter.len(), 1);
        assert_eq!(host.marker_lines(ERROR_GUTTER), vec![8]);
    }

    #[test]
    fn test_non_error_kind_clears_markers_and_widgets() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "4:1 boom", &mut widgets, &mut host);
        gutter.click(3, &mut widgets, &mut host);
        assert_eq!(widgets.len(), 1);

        gutter.apply_status(StatusKind::Success, &[], &mut widgets, &mut host);

        assert!(gutter.is_empty());
        assert!(widgets.is_empty());
        assert!(host.marker_lines(ERROR_GUTTER).is_empty());
        assert!(host.widgets.is_empty());
    }

    #[test]
    fn test_line_zero_has_no_marker() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "0:1 before the file", &mut widgets, &mut host);

        assert!(gutter.is_empty());
        assert!(host.marker_lines(ERROR_GUTTER).is_empty());
    }

    #[test]
    fn test_same_line_keeps_last_entry() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "3:1 older\n3:9 newer", &mut widgets, &mut host);

        assert_eq!(gutter.len(), 1);
        assert_eq!(gutter.marker_at(2).unwrap().message, "3:9 newer");
        assert_eq!(
            host.markers[&(ERROR_GUTTER.to_string(), 2)].tooltip,
            "3:9 newer"
        );
    }

    #[test]
    fn test_out_of_range_lines_are_forwarded() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "5000:1 way past the end", &mut widgets, &mut host);

        // The manager does not know the document length; placement happens
        // and the host decides what to do with it.
        assert_eq!(host.marker_lines(ERROR_GUTTER), vec![4999]);
    }

    #[test]
    fn test_click_on_marker_toggles_its_widget() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "2:4 bad thing", &mut widgets, &mut host);

        gutter.click(1, &mut widgets, &mut host);
        assert!(widgets.contains("2:4 bad thing"));
        assert_eq!(host.widgets[0].1, 1);

        gutter.click(1, &mut widgets, &mut host);
        assert!(widgets.is_empty());
    }

    #[test]
    fn test_click_on_unmarked_line_is_noop() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "2:4 bad thing", &mut widgets, &mut host);
        gutter.click(10, &mut widgets, &mut host);

        assert!(widgets.is_empty());
    }

    #[test]
    fn test_widgets_stay_open_across_error_rebuilds() {
        let mut gutter = GutterAnnotations::new();
        let mut widgets = InlineWidgets::new();
        let mut host = RecordingHost::new();

        apply_error(&mut gutter, "2:4 bad thing", &mut widgets, &mut host);
        gutter.click(1, &mut widgets, &mut host);

        // A later batch moves the diagnostic; the open widget keeps its
        // original anchor line.
        apply_error(&mut gutter, "6:4 bad thing", &mut widgets, &mut host);

        assert_eq!(widgets.len(), 1);
        assert_eq!(host.widgets[0].1, 1);

        // Clicking the moved marker closes the same widget by message key.
        gutter.click(5, &mut widgets, &mut host);
        assert!(widgets.is_empty());
    }
}
