//! # Transport Adapters Module
//!
//! The "front door" of the engine. An adapter owns the connection to the
//! backend and hands every payload it receives, untouched and in order, to the
//! pipeline through a `PayloadSink`.
//!
//! ## Contained Modules:
//! - **`push`**: the push adapter over a live subscription, plus the
//!   `PushSource` seam.
//! - **`poll`**: the poll adapter over sequential requests, plus the
//!   `PollSource` seam.
//! - **`event_stream`**, **`websocket`**, **`http_poll`**: concrete network
//!   sources (feature `transports`).
//!
//! `TransportAdapter` is the closed choice between the two strategies. It is
//! picked once when the dispatcher starts and never swapped at runtime.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::decoder::RawPayload;
use crate::errors::TransportError;

/// Live-subscription adapter.
pub mod push;
/// Sequential request/response adapter.
pub mod poll;

/// Server-sent events over HTTP.
#[cfg(feature = "transports")]
pub mod event_stream;
/// HTTP long-poll requests.
#[cfg(feature = "transports")]
pub mod http_poll;
/// WebSocket feed.
#[cfg(feature = "transports")]
pub mod websocket;

pub use poll::{PollAdapter, PollOutcome, PollSource};
pub use push::{FrameStream, PushAdapter, PushSource};

#[cfg(feature = "transports")]
use crate::configs::{SyncConfig, TransportKind};
#[cfg(feature = "transports")]
use crate::errors::ConfigError;

/// Where adapters deliver payloads. Sends fail only once the pipeline is gone.
pub type PayloadSink = mpsc::UnboundedSender<RawPayload>;

/// # Transport Adapter
pub enum TransportAdapter {
    Push(PushAdapter),
    Poll(PollAdapter),
}

impl TransportAdapter {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportAdapter::Push(_) => "push",
            TransportAdapter::Poll(_) => "poll",
        }
    }

    /// Runs the adapter until it fails or `shutdown` is cancelled.
    ///
    /// # Errors
    /// Only the push adapter returns errors; they are terminal for this adapter.
    pub async fn run(self, sink: PayloadSink, shutdown: CancellationToken) -> Result<(), TransportError> {
        match self {
            TransportAdapter::Push(adapter) => adapter.run(sink, shutdown).await,
            TransportAdapter::Poll(adapter) => adapter.run(sink, shutdown).await,
        }
    }

    /// # From Config
    ///
    /// Builds the adapter selected by `config.transport`.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEndpoint` if the matching URL is not set, or
    /// `ConfigError::Client` if the HTTP client cannot be built.
    #[cfg(feature = "transports")]
    pub fn from_config(config: &SyncConfig) -> Result<Self, ConfigError> {
        let missing = |field| ConfigError::MissingEndpoint {
            transport: config.transport.as_str(),
            field,
        };

        let adapter = match config.transport {
            TransportKind::EventStream => {
                let url = config.push_url.clone().ok_or_else(|| missing("pushUrl"))?;
                let source = event_stream::EventStreamSource::new(
                    url,
                    config.auth_token.clone(),
                    &config.user_agent,
                )?;
                TransportAdapter::Push(PushAdapter::new(source))
            }
            TransportKind::WebSocket => {
                let url = config.push_url.clone().ok_or_else(|| missing("pushUrl"))?;
                TransportAdapter::Push(PushAdapter::new(websocket::WebSocketSource::new(url)))
            }
            TransportKind::Poll => {
                let url = config.poll_url.clone().ok_or_else(|| missing("pollUrl"))?;
                let source = http_poll::HttpPollSource::new(
                    url,
                    config.auth_token.clone(),
                    &config.user_agent,
                    config.request_timeout(),
                )?;
                TransportAdapter::Poll(PollAdapter::new(source, config.poll_retry_delay()))
            }
        };

        log::info!("Configured {} transport ({}).", adapter.kind(), config.transport.as_str());
        Ok(adapter)
    }
}
