//! # Push Adapter
//!
//! Holds a single live subscription and forwards every frame to the pipeline in
//! the order it arrived.
//!
//! The push adapter never resubscribes. A transport error, or the remote end
//! closing the stream, ends the adapter with a `TransportError`; whoever started
//! the pipeline decides what happens next.

use futures_util::future::{self, BoxFuture};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use tokio::task::yield_now;
use tokio_util::sync::CancellationToken;

use crate::core::decoder::RawPayload;
use crate::errors::TransportError;
use crate::ingestors::PayloadSink;

/// An established subscription: one item per inbound frame.
pub type FrameStream = BoxStream<'static, Result<RawPayload, TransportError>>;

/// # Push Source
///
/// Something the push adapter can subscribe to. Subscribing consumes the
/// source; the returned stream owns the connection.
pub trait PushSource: Send {
    fn subscribe(self: Box<Self>) -> BoxFuture<'static, Result<FrameStream, TransportError>>;
}

/// An in-process feed is already a subscription.
impl PushSource for FrameStream {
    fn subscribe(self: Box<Self>) -> BoxFuture<'static, Result<FrameStream, TransportError>> {
        Box::pin(future::ready(Ok(*self)))
    }
}

pub struct PushAdapter {
    source: Box<dyn PushSource>,
}

impl PushAdapter {
    pub fn new(source: impl PushSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Builds an adapter over an in-process stream of frames.
    pub fn from_stream<S>(frames: S) -> Self
    where
        S: Stream<Item = Result<RawPayload, TransportError>> + Send + 'static,
    {
        let frames: FrameStream = frames.boxed();
        Self::new(frames)
    }

    /// # Run
    ///
    /// Subscribes and forwards frames to `sink` until the stream fails, the
    /// stream ends, or `shutdown` is cancelled.
    ///
    /// # Returns
    /// `Ok(())` when stopped via `shutdown` or when the sink has been dropped.
    ///
    /// # Errors
    /// The transport error that ended the subscription; `TransportError::Closed`
    /// if the remote end simply stopped sending.
    pub async fn run(self, sink: PayloadSink, shutdown: CancellationToken) -> Result<(), TransportError> {
        tokio::select! {
            _ = shutdown.cancelled() => {
                log::info!("Push adapter stopped.");
                Ok(())
            }
            result = self.forward(sink) => result,
        }
    }

    async fn forward(self, sink: PayloadSink) -> Result<(), TransportError> {
        let mut frames = self.source.subscribe().await?;
        log::info!("Push subscription established.");

        while let Some(frame) = frames.next().await {
            let payload = frame?;
            if sink.send(payload).is_err() {
                log::debug!("Payload sink dropped. Ending push subscription.");
                return Ok(());
            }
            // In-process feeds can be always ready; let the shutdown branch run.
            yield_now().await;
        }

        Err(TransportError::Closed)
    }
}
