// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

//! # sessionwatch
//!
//! Client SDK for observing remote agent sessions over server-sent event
//! streams. A [`ConnectionManager`] maintains one auto-reconnecting stream
//! per server, classifies inbound frames into the typed [`SessionEvent`]
//! schema, and exposes queryable per-server [`ConnectionState`] snapshots.
//!
//! Server discovery and presentation are out of scope: candidate URLs come
//! from elsewhere (e.g. a LAN discovery beacon) and a host application polls
//! the snapshots or subscribes to the event feed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sessionwatch::{ConnectionManager, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> sessionwatch::Result<()> {
//!     let manager = ConnectionManager::new()?;
//!     let mut events = manager.subscribe();
//!
//!     manager.connect("http://10.0.0.17:4517/events").await;
//!
//!     while let Ok(incoming) = events.recv().await {
//!         if let SessionEvent::PermissionRequest(req) = &incoming.event {
//!             println!("{} wants to run {}", req.session_id, req.tool_name);
//!         }
//!     }
//!
//!     manager.disconnect_all().await;
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod error;
pub mod events;
pub mod manager;
pub mod sse;
pub mod state;
pub mod transport;

// Re-export main types at crate root for convenience
pub use backoff::BackoffPolicy;
pub use error::{MonitorError, Result};
pub use events::{
    is_valid_session_event, MessageEvent, MessageType, PermissionRequestEvent, SessionEvent,
    SessionMessage, SessionStatus, SessionUpdateEvent,
};
pub use manager::{
    ConnectionManager, ConnectionManagerBuilder, EventSubscription, ServerEvent,
    ServerSubscription,
};
pub use sse::{parse_sse_data, SseDecoder};
pub use state::{ConnectionState, ConnectionStatus, FailureOutcome};
pub use transport::{EventStream, HttpConnector, StreamConnector};
