//! # Event Stream Source
//!
//! Push source for server-sent events. One GET request is held open and the
//! response body is parsed into frames as chunks arrive.
//!
//! ## Framing rules:
//! - Frames end at a blank line. `\r\n` line endings are accepted.
//! - `event:` sets the frame's event tag.
//! - `data:` lines are joined with `\n` to form the payload body.
//! - Comment lines (leading `:`) and other fields (`id`, `retry`) are ignored.
//! - A frame without any `data:` line is skipped.

use std::collections::VecDeque;

use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use url::Url;

use crate::core::decoder::RawPayload;
use crate::errors::TransportError;
use crate::ingestors::push::{FrameStream, PushSource};

pub struct EventStreamSource {
    client: reqwest::Client,
    url: Url,
    auth_token: Option<String>,
}

impl EventStreamSource {
    /// Builds the source. The client has no overall request timeout: the
    /// response body is expected to stay open indefinitely.
    pub fn new(url: Url, auth_token: Option<String>, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            url,
            auth_token,
        })
    }
}

impl PushSource for EventStreamSource {
    fn subscribe(self: Box<Self>) -> BoxFuture<'static, Result<FrameStream, TransportError>> {
        Box::pin(async move {
            log::info!("Subscribing to event stream: {}", self.url);

            let mut request = self
                .client
                .get(self.url.clone())
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache");
            if let Some(token) = &self.auth_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }

            Ok(frames(response))
        })
    }
}

fn frames(response: reqwest::Response) -> FrameStream {
    let chunks = Box::pin(response.bytes_stream());

    stream::unfold((chunks, SseDecoder::default()), |(mut chunks, mut decoder)| async move {
        loop {
            if let Some(frame) = decoder.next_frame() {
                return Some((Ok(frame), (chunks, decoder)));
            }
            match chunks.next().await {
                Some(Ok(chunk)) => decoder.push(&chunk),
                Some(Err(e)) => return Some((Err(TransportError::from(e)), (chunks, decoder))),
                None => return None,
            }
        }
    })
    .boxed()
}

/// Incremental parser for the `text/event-stream` format.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    /// Bytes of the current, incomplete line.
    line: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    ready: VecDeque<RawPayload>,
}

impl SseDecoder {
    /// Feeds a chunk of the response body. Chunks may split lines anywhere,
    /// including inside a multi-byte character.
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            if byte == b'\n' {
                let mut line = std::mem::take(&mut self.line);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                self.process_line(&String::from_utf8_lossy(&line));
            } else {
                self.line.push(byte);
            }
        }
    }

    pub(crate) fn next_frame(&mut self) -> Option<RawPayload> {
        self.ready.pop_front()
    }

    fn process_line(&mut self, line: &str) {
        if line.is_empty() {
            self.dispatch();
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self) {
        let event = self.event.take();
        if self.data.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.data).join("\n");

        self.ready.push_back(match event {
            Some(tag) => RawPayload::tagged(tag, data),
            None => RawPayload::new(data),
        });
    }
}
