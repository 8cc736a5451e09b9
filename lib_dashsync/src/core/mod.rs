//! # Core Engine Module
//!
//! The state of the dashboard lives here. Components, leaves first:
//!
//! - **`decoder`**: classifies a raw payload as a message or an alert.
//! - **`message_window`**: the bounded, self-expiring list of transient messages.
//! - **`alert_store`**: reconciles alerts by content and exposes the triggered ones.
//! - **`dispatcher`**: owns the pipeline lifecycle and routes decoded events to
//!   the stores.

/// Payload classification into typed events.
pub mod decoder;
/// Bounded window of transient messages with per-message expiry.
pub mod message_window;
/// Reconciliation store for alerts keyed by content.
pub mod alert_store;
/// Pipeline lifecycle and event routing.
pub mod dispatcher;

// --- Public API Re-exports ---
pub use alert_store::{Alert, AlertStore};
pub use decoder::{decode, AlertEvent, AlertLevel, MessageEvent, RawPayload, SyncEvent};
pub use dispatcher::{Dispatcher, DispatcherState, StreamStatus, SyncViews};
pub use message_window::{MessageWindow, TransientMessage};
