//! # lib_dashsync
//!
//! Client-side synchronization engine for the vehicle telemetry dashboard.
//!
//! A `Dispatcher` consumes a live stream of status messages and threshold
//! alerts through one transport adapter (push, or poll as a fallback chosen at
//! startup), decodes each payload, and keeps two observable views up to date:
//! the short window of transient messages and the set of triggered alerts.
//!
//! ```no_run
//! use lib_dashsync::{Dispatcher, SyncConfig, TransportAdapter};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config: SyncConfig = serde_json::from_str(r#"{"pushUrl":"http://car.local:8000/events"}"#)?;
//! let mut dispatcher = Dispatcher::from_config(&config);
//! let mut views = dispatcher.views();
//!
//! dispatcher.start(TransportAdapter::from_config(&config)?)?;
//! let status = views.terminated().await;
//! println!("stream ended: {:?}", status);
//! dispatcher.stop().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod configs;
pub mod core;
pub mod errors;
pub mod ingestors;

// Re-export the types most callers need.
pub use crate::configs::{SyncConfig, TransportKind};
pub use crate::core::{Alert, AlertLevel, Dispatcher, DispatcherState, StreamStatus, SyncViews, TransientMessage};
pub use crate::errors::{ConfigError, DecodeError, SyncError, TransportError};
pub use crate::ingestors::{PollAdapter, PollOutcome, PollSource, PushAdapter, PushSource, TransportAdapter};
