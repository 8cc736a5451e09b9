//! # Engine Error Types
//!
//! Every failure the engine can observe falls into one of three buckets:
//!
//! - **`DecodeError`**: a single payload could not be turned into an event. The
//!   pipeline logs it, drops the payload and moves on.
//! - **`TransportError`**: the connection to the backend misbehaved. The poll
//!   adapter retries these internally; the push adapter surfaces them as the
//!   terminal condition of its subscription.
//! - **`SyncError`**: the caller drove the `Dispatcher` incorrectly, or the
//!   pipeline task itself failed.
//! - **`ConfigError`**: a transport could not be built from `SyncConfig`.

use thiserror::Error;

use crate::core::dispatcher::DispatcherState;

#[derive(Debug, Error)]
/// # Decode Error
///
/// Raised by the event decoder when a payload cannot be classified.
pub enum DecodeError {
    /// The payload body is not valid JSON, or an alert-shaped payload does not
    /// match the alert schema (missing `content`/`name`, bad `value`, ...).
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but is not a JSON object.
    #[error("payload is not a JSON object (got {0})")]
    NotAnObject(&'static str),
}

#[derive(Debug, Error)]
/// # Transport Error
///
/// Failures at the boundary with the push or poll endpoint.
pub enum TransportError {
    /// The HTTP request failed before a response was received.
    #[cfg(feature = "transports")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The WebSocket connection failed or produced a protocol error.
    #[cfg(feature = "transports")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The endpoint answered with a status code the engine does not accept.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The push stream ended.
    #[error("stream closed by remote host")]
    Closed,

    /// A feed-specific failure reported by a custom source.
    #[error("{0}")]
    Source(String),
}

#[derive(Debug, Error)]
/// # Sync Error
///
/// Errors returned by `Dispatcher` lifecycle operations.
pub enum SyncError {
    /// `start()` was called on a dispatcher that is not idle.
    #[error("cannot move dispatcher from {from:?} to {to:?}")]
    InvalidTransition {
        /// The state the dispatcher was in.
        from: DispatcherState,
        /// The state the caller asked for.
        to: DispatcherState,
    },

    /// The pipeline task panicked or was aborted.
    #[error("pipeline task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
/// # Configuration Error
///
/// Raised when a `SyncConfig` cannot be turned into a working transport.
pub enum ConfigError {
    /// The selected transport needs an endpoint that was not configured.
    #[error("transport '{transport}' requires '{field}' to be set")]
    MissingEndpoint {
        /// The transport that was selected.
        transport: &'static str,
        /// The configuration key that is missing.
        field: &'static str,
    },

    /// The HTTP client for the transport could not be constructed.
    #[error("failed to build transport client: {0}")]
    Client(#[from] TransportError),
}
