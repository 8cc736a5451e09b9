//! # Engine Configuration
//!
//! `SyncConfig` carries everything the engine needs to pick and build a
//! transport and size its stores. Every field has a default, so a partial JSON
//! document (or `SyncConfig::default()`) is always usable.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::message_window::DEFAULT_CAPACITY;

/// Which transport the dispatcher is started with. Chosen once, at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportKind {
    /// Server-sent events over a long-lived HTTP response.
    #[default]
    EventStream,
    /// A WebSocket feed.
    WebSocket,
    /// Sequential HTTP long-poll requests.
    Poll,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::EventStream => "eventStream",
            TransportKind::WebSocket => "webSocket",
            TransportKind::Poll => "poll",
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    /// Accepts the camelCase names used in configuration files, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eventstream" | "sse" => Ok(TransportKind::EventStream),
            "websocket" | "ws" => Ok(TransportKind::WebSocket),
            "poll" => Ok(TransportKind::Poll),
            other => Err(format!("unknown transport '{}' (expected eventStream, webSocket or poll)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// # Sync Configuration
pub struct SyncConfig {
    /// The transport to start with.
    pub transport: TransportKind,
    /// Endpoint for the push transports (`http(s)://` for event streams, `ws(s)://` for WebSockets).
    pub push_url: Option<Url>,
    /// Endpoint for the long-poll transport.
    pub poll_url: Option<Url>,
    /// How many transient messages are visible at once.
    pub message_capacity: usize,
    /// Fixed delay before the poll adapter retries after a failed request.
    pub poll_retry_delay_ms: u64,
    /// Upper bound on a single long-poll request.
    pub request_timeout_secs: u64,
    /// Optional bearer token sent by the HTTP transports.
    pub auth_token: Option<String>,
    /// User agent sent by the HTTP transports.
    pub user_agent: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            push_url: None,
            poll_url: None,
            message_capacity: DEFAULT_CAPACITY,
            poll_retry_delay_ms: 1000,
            request_timeout_secs: 60,
            auth_token: None,
            user_agent: "DashSync/1.0".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn poll_retry_delay(&self) -> Duration {
        Duration::from_millis(self.poll_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
