//! Completion trigger classification
//!
//! Key releases drive implicit autocompletion. An ordered rule set decides
//! per key whether to submit the script, open the hint list, or do nothing.
//! Plain character entry surfaces completions as you type; modified and
//! navigational keystrokes stay quiet so the popup never reopens spuriously.

use std::collections::HashSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key release asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Fire the submit callback.
    Submit,
    /// Request completion candidates for the current cursor context.
    ShowCompletions,
    /// Nothing.
    None,
}

/// Key names excluded from implicit completion when the configuration does
/// not list its own set. Lowercase, as [`parse_trigger_key`] accepts them.
pub const DEFAULT_EXCLUDED_KEYS: &[&str] = &[
    "enter",
    "tab",
    "backtab",
    "esc",
    "backspace",
    "delete",
    "insert",
    "left",
    "right",
    "up",
    "down",
    "home",
    "end",
    "pageup",
    "pagedown",
];

/// Classifies key releases into [`TriggerAction`]s.
///
/// The rules run in order:
/// 1. Ctrl+Enter submits, when a submit callback is wired.
/// 2. Ctrl+Space explicitly requests completions.
/// 3. Any other Ctrl or Meta chord does nothing.
/// 4. Keys in the exclusion set do nothing.
/// 5. Everything else requests completions.
#[derive(Debug, Clone)]
pub struct CompletionTrigger {
    excluded: HashSet<KeyCode>,
}

impl CompletionTrigger {
    pub fn new() -> Self {
        Self::from_key_names(DEFAULT_EXCLUDED_KEYS.iter().copied())
    }

    /// Build the exclusion set from configured key names. Names that do not
    /// parse are logged and skipped rather than failing the whole set.
    pub fn from_key_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut excluded = HashSet::new();
        for name in names {
            match parse_trigger_key(name) {
                Some(code) => {
                    excluded.insert(code);
                }
                None => tracing::warn!("Unknown excluded key name: {:?}", name),
            }
        }
        Self { excluded }
    }

    pub fn classify(&self, event: &KeyEvent, submit_enabled: bool) -> TriggerAction {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let meta = event
            .modifiers
            .intersects(KeyModifiers::SUPER | KeyModifiers::META);

        if ctrl && event.code == KeyCode::Enter && submit_enabled {
            return TriggerAction::Submit;
        }

        if ctrl && event.code == KeyCode::Char(' ') {
            return TriggerAction::ShowCompletions;
        }

        if ctrl || meta {
            return TriggerAction::None;
        }

        if self.is_excluded(event.code) {
            return TriggerAction::None;
        }

        TriggerAction::ShowCompletions
    }

    fn is_excluded(&self, code: KeyCode) -> bool {
        match code {
            // Whole key families that never carry text input.
            KeyCode::F(_)
            | KeyCode::Media(_)
            | KeyCode::Modifier(_)
            | KeyCode::CapsLock
            | KeyCode::NumLock
            | KeyCode::ScrollLock
            | KeyCode::PrintScreen
            | KeyCode::Pause
            | KeyCode::Menu
            | KeyCode::KeypadBegin
            | KeyCode::Null => true,
            code => self.excluded.contains(&code),
        }
    }
}

impl Default for CompletionTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a configured key name to a key code.
pub fn parse_trigger_key(key: &str) -> Option<KeyCode> {
    match key.to_lowercase().as_str() {
        "enter" => Some(KeyCode::Enter),
        "backspace" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        "insert" => Some(KeyCode::Insert),
        "tab" => Some(KeyCode::Tab),
        "backtab" => Some(KeyCode::BackTab),
        "esc" | "escape" => Some(KeyCode::Esc),
        "space" => Some(KeyCode::Char(' ')),

        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),

        s if s.len() == 1 => s.chars().next().map(KeyCode::Char),
        _ => None,
    }
}
