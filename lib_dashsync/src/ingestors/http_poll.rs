//! # HTTP Long-Poll Source
//!
//! Poll source built on `reqwest`. Each `poll_once` issues one GET against the
//! configured endpoint and maps the response onto a `PollOutcome`:
//!
//! - `204 No Content` → `PollOutcome::NoData`
//! - any other 2xx → `PollOutcome::Payload` carrying the body text
//! - any other status → `TransportError::Status`
//! - request failure or timeout → `TransportError::Http`

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use url::Url;

use crate::core::decoder::RawPayload;
use crate::errors::TransportError;
use crate::ingestors::poll::{PollOutcome, PollSource};

/// Optional response header carrying the event tag, mirroring the SSE `event:` field.
pub const EVENT_HEADER: &str = "x-event";

pub struct HttpPollSource {
    /// Reused across requests for connection pooling.
    client: reqwest::Client,
    url: Url,
    auth_token: Option<String>,
}

impl HttpPollSource {
    /// Creates a new `HttpPollSource`.
    ///
    /// # Arguments
    /// * `url` - The absolute URL of the long-poll endpoint.
    /// * `auth_token` - An optional Bearer token for the Authorization header.
    /// * `user_agent` - Sent with every request.
    /// * `request_timeout` - Upper bound on a single request, including the
    ///   time the server holds it open waiting for data.
    pub fn new(
        url: Url,
        auth_token: Option<String>,
        user_agent: &str,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            url,
            auth_token,
        })
    }

    async fn request(&self) -> Result<PollOutcome, TransportError> {
        let mut request = self.client.get(self.url.clone());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(PollOutcome::NoData);
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let event = response
            .headers()
            .get(EVENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        let payload = match event {
            Some(tag) => RawPayload::tagged(tag, body),
            None => RawPayload::new(body),
        };
        Ok(PollOutcome::Payload(payload))
    }
}

impl PollSource for HttpPollSource {
    fn poll_once(&mut self) -> BoxFuture<'_, Result<PollOutcome, TransportError>> {
        Box::pin(self.request())
    }
}
