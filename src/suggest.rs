//! Suggestion candidates and the source they come from
//!
//! Ranking candidates is an external concern. The editor session issues a
//! fire-and-forget request carrying the current cursor/document context and
//! a request id, and displays whatever list comes back through the bridge,
//! provided the id still matches the latest request.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::async_bridge::AsyncMessage;

/// Cursor location in the document, 0-based line and column. Column counts
/// characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

impl CursorPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A completion candidate as shown in the hint list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Text inserted when the candidate is accepted
    pub text: String,
    /// Optional description shown alongside the text
    pub description: Option<String>,
}

impl Suggestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description: None,
        }
    }

    pub fn with_description(text: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description: Some(description.into()),
        }
    }
}

/// Snapshot handed to the suggestion source with each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionContext {
    pub cursor: CursorPosition,
    pub script: String,
}

impl SuggestionContext {
    /// The identifier fragment immediately left of the cursor: `"fil"` for a
    /// cursor sitting after `|> fil`. Empty when the cursor does not touch a
    /// word. Word characters are alphanumerics and underscores.
    pub fn word_prefix(&self) -> &str {
        let line = self.script.split('\n').nth(self.cursor.line).unwrap_or("");
        let end = line
            .char_indices()
            .nth(self.cursor.column)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        let head = &line[..end];
        let start = head
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
            .last()
            .map(|(i, _)| i)
            .unwrap_or(end);
        &line[start..end]
    }
}

/// One suggestion request. The id is assigned by the editor session from a
/// monotonically increasing counter; the reply must carry it back.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub request_id: u64,
    pub context: SuggestionContext,
}

/// Where completion candidates come from.
///
/// Implementations may compute on the calling thread or hand the work to a
/// worker; either way the reply travels through the bridge sender as
/// [`AsyncMessage::Suggestions`] with the request's id, and the session
/// applies it on its own thread.
pub trait SuggestionSource {
    fn request(&mut self, request: SuggestionRequest, reply: mpsc::Sender<AsyncMessage>);
}

/// Source backed by a fixed candidate catalog, filtered by the word prefix
/// at the cursor. Replies immediately on the calling thread.
pub struct StaticSource {
    catalog: Vec<Suggestion>,
}

impl StaticSource {
    pub fn new(catalog: Vec<Suggestion>) -> Self {
        Self { catalog }
    }
}

impl SuggestionSource for StaticSource {
    fn request(&mut self, request: SuggestionRequest, reply: mpsc::Sender<AsyncMessage>) {
        let prefix = request.context.word_prefix();
        let items: Vec<Suggestion> = self
            .catalog
            .iter()
            .filter(|s| prefix.is_empty() || s.text.starts_with(prefix))
            .cloned()
            .collect();

        tracing::debug!(
            "Static source resolved {} candidates for request {}",
            items.len(),
            request.request_id
        );

        // The session may be gone; a dead channel is not an error here.
        let _ = reply.send(AsyncMessage::Suggestions {
            request_id: request.request_id,
            items,
        });
    }
}
