// Flux editor annotation library - exposes all core modules for testing

// Core types and config are always available (needed for schema generation)
pub mod config;

pub mod async_bridge;
pub mod completion;
pub mod diagnostics;
pub mod editor;
pub mod gutter;
pub mod host;
pub mod line_widgets;
pub mod suggest;

// Runtime-only modules (require the "runtime" feature)
#[cfg(feature = "runtime")]
pub mod tui;
