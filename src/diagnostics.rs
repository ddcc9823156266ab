//! Flux validation status and diagnostic locator parsing
//!
//! The host application reports script health as a status object: a kind
//! plus a raw text blob with one message per line, each usually prefixed
//! with a "line:column" locator token. This module turns that blob into
//! positioned entries for the gutter to place.

use serde::{Deserialize, Serialize};

/// Validation outcome reported for the current script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// Nothing validated yet.
    #[default]
    Idle,
    /// The script compiled cleanly.
    Success,
    /// Validation produced diagnostics; the status text carries them.
    Error,
}

/// Status object delivered on every validate cycle. A new status always
/// fully supersedes the previous one; batches are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptStatus {
    pub kind: StatusKind,
    pub text: String,
}

impl ScriptStatus {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn success() -> Self {
        Self {
            kind: StatusKind::Success,
            text: String::new(),
        }
    }
}

/// One message out of a diagnostic batch. Produced fresh on every status
/// update and discarded wholesale on the next; carries no identity beyond
/// its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    /// 1-based source line from the locator token, `None` when the token
    /// does not parse as a number. Entries are emitted either way; skipping
    /// unplaceable ones is the consumer's call, not the parser's.
    pub line: Option<usize>,
    /// The complete raw message, locator token included.
    pub message: String,
}

/// Split a raw diagnostic blob into one entry per line of text.
///
/// Each line is expected to look like `3:17 undefined identifier`: the token
/// before the first space is a `line:column` locator and the part before the
/// first colon inside it is the line number. Lines that do not follow that
/// shape still produce an entry, just without a line number.
///
/// Splitting is on the newline character itself, not on logical lines, so an
/// empty blob yields a single degenerate entry and a trailing newline yields
/// a trailing empty entry: exactly one entry per segment, order preserved.
pub fn parse_status_text(text: &str) -> Vec<DiagnosticEntry> {
    text.split('\n')
        .map(|message| {
            let locator = message.split(' ').next().unwrap_or("");
            let line_token = locator.split(':').next().unwrap_or("");
            DiagnosticEntry {
                line: line_token.parse::<usize>().ok(),
                message: message.to_string(),
            }
        })
        .collect()
}
