//! # Poll Adapter
//!
//! Simulates a stream on top of a request/response endpoint by issuing one
//! blocking request after another. Requests never overlap, so deliveries come
//! out in the order the endpoint produced them.
//!
//! ## Cycle outcomes:
//! - **No data** (e.g. HTTP 204): the next request goes out as soon as the
//!   task is scheduled again.
//! - **Payload**: it is forwarded, then the next request goes out the same way.
//! - **Transport error**: logged, then the adapter sleeps for the fixed
//!   `retry_delay` before the next request. Errors are never surfaced.
//!
//! The adapter never terminates on its own; only `shutdown` (or the pipeline
//! dropping its sink) ends the loop.

use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::task::yield_now;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::core::decoder::RawPayload;
use crate::errors::TransportError;
use crate::ingestors::PayloadSink;

/// Delay before retrying a failed request when none is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// # Poll Outcome
///
/// The successful result of a single request.
#[derive(Debug)]
pub enum PollOutcome {
    /// The endpoint had nothing to deliver.
    NoData,
    /// The endpoint delivered one payload.
    Payload(RawPayload),
}

/// # Poll Source
///
/// A request/response endpoint. Each call issues exactly one request.
pub trait PollSource: Send {
    fn poll_once(&mut self) -> BoxFuture<'_, Result<PollOutcome, TransportError>>;
}

pub struct PollAdapter {
    source: Box<dyn PollSource>,
    retry_delay: Duration,
}

impl PollAdapter {
    pub fn new(source: impl PollSource + 'static, retry_delay: Duration) -> Self {
        Self {
            source: Box::new(source),
            retry_delay,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// # Run
    ///
    /// Polls until `shutdown` is cancelled or `sink` is dropped. Always returns
    /// `Ok(())`; the `Result` keeps the signature in line with `PushAdapter::run`.
    pub async fn run(self, sink: PayloadSink, shutdown: CancellationToken) -> Result<(), TransportError> {
        log::info!("Poll adapter started (retry delay {}ms).", self.retry_delay.as_millis());

        tokio::select! {
            _ = shutdown.cancelled() => {
                log::info!("Poll adapter stopped.");
            }
            _ = self.poll_loop(sink) => {}
        }

        Ok(())
    }

    async fn poll_loop(mut self, sink: PayloadSink) {
        loop {
            match self.source.poll_once().await {
                Ok(PollOutcome::NoData) => {
                    log::trace!("Poll returned no data.");
                    // A source that answers instantly would otherwise starve the shutdown branch.
                    yield_now().await;
                }
                Ok(PollOutcome::Payload(payload)) => {
                    if sink.send(payload).is_err() {
                        log::debug!("Payload sink dropped. Ending poll loop.");
                        return;
                    }
                    yield_now().await;
                }
                Err(e) => {
                    log::warn!(
                        "Poll request failed: {}. Retrying in {}ms...",
                        e,
                        self.retry_delay.as_millis()
                    );
                    sleep(self.retry_delay).await;
                }
            }
        }
    }
}
