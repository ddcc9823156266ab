//! Async bridge: communication between background work and the sync event loop
//!
//! The annotation engine is single threaded: marker and widget sets are only
//! mutated on the loop that owns the editor session. Anything computed
//! elsewhere (a suggestion source running on a worker, a validator producing
//! status updates) replies through this bridge, and the session drains it
//! from its own thread once per turn.
//!
//! std::sync::mpsc is enough here: senders are cheap to clone and hand out,
//! and the receiving side is polled non-blocking every frame.

use std::sync::mpsc;

use crate::diagnostics::ScriptStatus;
use crate::suggest::Suggestion;

/// Messages sent from background work to the synchronous event loop
#[derive(Debug)]
pub enum AsyncMessage {
    /// Suggestion response for an earlier `ShowCompletions` request. The id
    /// echoes the request; responses that no longer match the latest issued
    /// id are dropped by the session.
    Suggestions {
        request_id: u64,
        items: Vec<Suggestion>,
    },

    /// Validation finished; the new status fully supersedes the previous one
    StatusChanged(ScriptStatus),
}

/// Bridge between background work and the sync event loop
///
/// Design:
/// - Lightweight, cloneable sender that can be passed to workers
/// - Non-blocking receiver checked each frame in the event loop
/// - No locks needed on the receiving side beyond the channel itself
#[derive(Clone)]
pub struct AsyncBridge {
    sender: mpsc::Sender<AsyncMessage>,
    // Receiver wrapped in Arc<Mutex<>> to allow cloning
    receiver: std::sync::Arc<std::sync::Mutex<mpsc::Receiver<AsyncMessage>>>,
}

impl AsyncBridge {
    /// Create a new bridge with an unbounded channel. The loop drains it
    /// every frame and message rates are tiny (one per keystroke at worst),
    /// so the queue stays short.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: std::sync::Arc::new(std::sync::Mutex::new(receiver)),
        }
    }

    /// Get a cloneable sender for background work
    pub fn sender(&self) -> mpsc::Sender<AsyncMessage> {
        self.sender.clone()
    }

    /// Try to receive pending messages (non-blocking)
    ///
    /// Called each frame in the event loop. Returns all pending messages
    /// without blocking, in send order.
    pub fn try_recv_all(&self) -> Vec<AsyncMessage> {
        let mut messages = Vec::new();

        if let Ok(receiver) = self.receiver.lock() {
            while let Ok(msg) = receiver.try_recv() {
                messages.push(msg);
            }
        }

        messages
    }
}

impl Default for AsyncBridge {
    fn default() -> Self {
        Self::new()
    }
}
