//! # Event Decoder
//!
//! Turns a `RawPayload` handed up by a transport into one of the two event kinds
//! the dashboard understands.
//!
//! ## Classification
//! - A body carrying a `triggered` field (even `false`) is an **alert**. Alert
//!   bodies must match the alert schema exactly, otherwise the payload is a
//!   `DecodeError`.
//! - Anything else is a **message**. Message bodies without a string `content`
//!   or `name` are silently ignored (`Ok(None)`): the upstream stream is
//!   best-effort and at-least-once, so stray frames are expected.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DecodeError;

/// # Raw Payload
///
/// One unit of data received from a transport, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawPayload {
    /// The event tag attached by the transport (the SSE `event:` field), if any.
    pub event: Option<String>,
    /// The body text exactly as received.
    pub data: String,
    /// The `Instant` the transport handed this payload over. Used to measure
    /// ingest-to-store latency.
    pub received_at: Instant,
}

impl RawPayload {
    /// Wraps a body received just now, without an event tag.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
            received_at: Instant::now(),
        }
    }

    /// Wraps a body received just now under the given event tag.
    pub fn tagged(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            ..Self::new(data)
        }
    }
}

/// A transient notification to show for `timeout_seconds`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Severity tag (`info`, `warning`, ...). Free-form.
    pub name: String,
    pub content: String,
    /// Display time in seconds, never negative.
    pub timeout_seconds: f64,
}

/// Severity of an alert condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Alert,
}

/// The current state of one named alert condition, as computed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Identity of the alert. Two events with equal `content` describe the same alert.
    pub content: String,
    pub name: AlertLevel,
    pub value: f64,
    pub triggered: bool,
}

/// A successfully classified payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Message(MessageEvent),
    Alert(AlertEvent),
}

/// # Decode
///
/// Classifies a raw payload.
///
/// # Returns
/// - `Ok(Some(event))` for a well-formed message or alert.
/// - `Ok(None)` for a message-shaped body without `content` or `name`.
///
/// # Errors
/// Returns a `DecodeError` if the body is not a JSON object or if an
/// alert-shaped body does not match the alert schema.
pub fn decode(payload: &RawPayload) -> Result<Option<SyncEvent>, DecodeError> {
    let fields = match serde_json::from_str::<Value>(&payload.data)? {
        Value::Object(fields) => fields,
        other => return Err(DecodeError::NotAnObject(json_kind(&other))),
    };

    if fields.contains_key("triggered") {
        let alert: AlertEvent = serde_json::from_value(Value::Object(fields))?;
        return Ok(Some(SyncEvent::Alert(alert)));
    }

    Ok(decode_message(&fields).map(SyncEvent::Message))
}

fn decode_message(fields: &Map<String, Value>) -> Option<MessageEvent> {
    let name = fields.get("name")?.as_str()?;
    let content = fields.get("content")?.as_str()?;

    // Missing or non-numeric timeouts expire on the next tick.
    let timeout_seconds = fields
        .get("timeout")
        .and_then(Value::as_f64)
        .map_or(0.0, |t| t.max(0.0));

    Some(MessageEvent {
        name: name.to_string(),
        content: content.to_string(),
        timeout_seconds,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
