//! # WebSocket Source
//!
//! Push source over a WebSocket feed. Every text frame, and every binary frame
//! holding UTF-8, becomes one payload.

use futures_util::future::{self, BoxFuture};
use futures_util::stream::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::core::decoder::RawPayload;
use crate::errors::TransportError;
use crate::ingestors::push::{FrameStream, PushSource};

pub struct WebSocketSource {
    url: Url,
}

impl WebSocketSource {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

impl PushSource for WebSocketSource {
    fn subscribe(self: Box<Self>) -> BoxFuture<'static, Result<FrameStream, TransportError>> {
        Box::pin(async move {
            log::info!("Connecting to WebSocket feed: {}", self.url);
            let (ws_stream, _) = connect_async(self.url.as_str()).await?;
            log::info!("Successfully connected to WebSocket feed.");

            let frames = ws_stream.filter_map(|msg| future::ready(frame_to_payload(msg)));
            Ok(frames.boxed())
        })
    }
}

fn frame_to_payload(
    msg: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<RawPayload, TransportError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(RawPayload::new(text.as_str()))),
        Ok(Message::Binary(bin)) => match String::from_utf8(bin.to_vec()) {
            Ok(text) => Some(Ok(RawPayload::new(text))),
            Err(_) => {
                log::warn!("Skipping non UTF-8 binary frame ({} bytes).", bin.len());
                None
            }
        },
        Ok(Message::Close(frame)) => {
            log::warn!("WebSocket closed by remote host: {:?}", frame);
            None
        }
        // Heartbeats
        Ok(_) => None,
        Err(e) => Some(Err(TransportError::from(e))),
    }
}
