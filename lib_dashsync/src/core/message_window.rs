//! # Message Window Store
//!
//! Holds the short, ordered list of transient messages currently on screen.
//!
//! Two things remove a message from the window:
//!
//! 1.  **Capacity pressure**: inserting beyond `capacity` drops the oldest entries
//!     immediately, whatever is left on their timers.
//! 2.  **Expiry**: every message owns a timer task. When it fires, the task sends
//!     the message id back to the pipeline, which calls `expire(id)`.
//!
//! Both paths remove by id, never by position, so they are idempotent and can
//! interleave in any order. Evicting a message also cancels its timer so no
//! stale expiry reaches the pipeline.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::core::decoder::MessageEvent;

/// Number of messages visible at once in the reference dashboard.
pub const DEFAULT_CAPACITY: usize = 2;

/// # Transient Message
///
/// A message as displayed by the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct TransientMessage {
    /// Process-unique, monotonically increasing id.
    pub id: u64,
    pub content: String,
    /// Severity tag copied from the event's `name`.
    pub severity: String,
    /// Handle on the pending expiry timer.
    #[serde(skip)]
    pub(crate) expiry: CancellationToken,
}

/// # Message Window
///
/// Owns the visible messages and their expiry timers.
pub struct MessageWindow {
    capacity: usize,
    next_id: u64,
    visible: VecDeque<TransientMessage>,
    /// Timer tasks report the id of the message they expire on this channel.
    expiry_tx: mpsc::UnboundedSender<u64>,
}

impl MessageWindow {
    /// Creates an empty window. Fired timers send the expired message id on
    /// `expiry_tx`; the owner is expected to feed it back into `expire`.
    ///
    /// A `capacity` of zero is raised to one.
    pub fn new(capacity: usize, expiry_tx: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: 0,
            visible: VecDeque::new(),
            expiry_tx,
        }
    }

    /// # Ingest
    ///
    /// Appends a message and schedules its expiry.
    ///
    /// Must be called from within a tokio runtime: the expiry timer is a
    /// spawned task.
    ///
    /// # Returns
    /// The id allocated to the new message.
    pub fn ingest(&mut self, event: MessageEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let expiry = CancellationToken::new();
        let message = TransientMessage {
            id,
            content: event.content,
            severity: event.name,
            expiry: expiry.clone(),
        };
        self.visible.push_back(message);

        while self.visible.len() > self.capacity {
            if let Some(evicted) = self.visible.pop_front() {
                log::debug!("Message {} evicted by capacity ({}).", evicted.id, self.capacity);
                evicted.expiry.cancel();
            }
        }

        // Timeouts too large for a Duration never expire in practice.
        let delay = Duration::try_from_secs_f64(event.timeout_seconds).unwrap_or(Duration::MAX);
        let expiry_tx = self.expiry_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = expiry.cancelled() => {
                    log::trace!("Expiry timer for message {} cancelled.", id);
                }
                _ = sleep(delay) => {
                    // The receiver is gone once the pipeline has shut down.
                    let _ = expiry_tx.send(id);
                }
            }
        });

        id
    }

    /// Removes the message with `id` if it is still visible.
    ///
    /// # Returns
    /// `true` if a message was removed.
    pub fn expire(&mut self, id: u64) -> bool {
        match self.visible.iter().position(|m| m.id == id) {
            Some(index) => {
                if let Some(message) = self.visible.remove(index) {
                    message.expiry.cancel();
                }
                log::debug!("Message {} expired.", id);
                true
            }
            None => false,
        }
    }

    /// Cancels every outstanding expiry timer. The visible messages stay as they are.
    pub fn dispose(&mut self) {
        for message in &self.visible {
            message.expiry.cancel();
        }
        log::debug!("Message window disposed with {} message(s) visible.", self.visible.len());
    }

    /// The visible messages, oldest first.
    pub fn visible(&self) -> Vec<TransientMessage> {
        self.visible.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
