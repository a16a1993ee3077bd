// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

//! Error types for the sessionwatch SDK.

use thiserror::Error;

/// Main error type for sessionwatch operations.
///
/// Transport-level failures are never surfaced to callers of the
/// [`ConnectionManager`](crate::manager::ConnectionManager) API; they are
/// recorded in the per-server [`ConnectionState`](crate::state::ConnectionState)
/// and drive the reconnect machinery instead.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Transport/IO error
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// HTTP request or streaming-body error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered the stream request with a non-success status
    #[error("Server rejected stream request: HTTP {0}")]
    HttpStatus(u16),

    /// Stream was closed by the remote end
    #[error("Connection closed")]
    ConnectionClosed,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server URL could not be parsed or requested
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Event channel closed (internal)
    #[error("Internal channel error")]
    ChannelClosed,
}

/// Result type alias for sessionwatch operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
