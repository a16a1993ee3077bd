// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

//! Stream transport seam.
//!
//! The manager never talks HTTP directly; it opens streams through the
//! [`StreamConnector`] trait so tests can substitute scripted transports.
//! [`HttpConnector`] is the production implementation: a long-lived GET whose
//! body is consumed as a text/event-stream.

use crate::error::{MonitorError, Result};
use crate::sse::SseDecoder;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

// =============================================================================
// Transport Traits
// =============================================================================

/// An open event stream yielding raw frame payloads.
///
/// `Ok(Some(payload))` is the data payload of one frame, `Ok(None)` an
/// orderly end of stream, `Err` a transport failure. Dropping the stream
/// closes the underlying connection.
pub trait EventStream: Send {
    /// Read the next frame payload.
    fn next_frame(&mut self)
        -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;
}

/// Opens event streams to servers.
///
/// Implementations must be cheap to share; the manager holds one connector
/// behind an `Arc` and opens every stream through it.
pub trait StreamConnector: Send + Sync {
    /// Open a stream to `url`. Resolves to an error when the server is
    /// unreachable or rejects the request.
    fn open<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn EventStream>>> + Send + 'a>>;
}

// =============================================================================
// HTTP Connector
// =============================================================================

/// Production connector speaking SSE over HTTP.
pub struct HttpConnector {
    client: reqwest::Client,
}

impl HttpConnector {
    /// Create a connector with a connect timeout but no overall request
    /// timeout; the stream is expected to stay open indefinitely.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    /// Create a connector reusing an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl StreamConnector for HttpConnector {
    fn open<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn EventStream>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .header("Accept", "text/event-stream")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(MonitorError::HttpStatus(status.as_u16()));
            }

            tracing::debug!(url, "event stream opened");
            Ok(Box::new(HttpEventStream {
                body: Box::pin(response.bytes_stream()),
                decoder: SseDecoder::new(),
            }) as Box<dyn EventStream>)
        })
    }
}

struct HttpEventStream {
    body: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    decoder: SseDecoder,
}

impl EventStream for HttpEventStream {
    fn next_frame(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            loop {
                if let Some(payload) = self.decoder.next_event() {
                    return Ok(Some(payload));
                }
                match self.body.next().await {
                    Some(Ok(chunk)) => self.decoder.push(&chunk),
                    Some(Err(e)) => return Err(MonitorError::Http(e)),
                    None => return Ok(None),
                }
            }
        })
    }
}
