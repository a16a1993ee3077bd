// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

//! Connection manager: one auto-reconnecting event stream per server.
//!
//! The manager owns the connection-state map and a per-server tokio task that
//! opens the stream, pumps frames, and schedules retries through the backoff
//! policy. Callers observe progress through cloned [`ConnectionState`]
//! snapshots or a broadcast [`EventSubscription`]; transport failures never
//! surface as errors from the public API.

use crate::backoff::BackoffPolicy;
use crate::error::Result;
use crate::events::SessionEvent;
use crate::sse::parse_sse_data;
use crate::state::{ConnectionState, ConnectionStatus, FailureOutcome};
use crate::transport::{EventStream, HttpConnector, StreamConnector};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

// =============================================================================
// Event Subscription
// =============================================================================

/// A validated event together with the server it arrived from.
#[derive(Debug, Clone)]
pub struct ServerEvent {
    pub server_url: String,
    pub event: SessionEvent,
}

/// A subscription to events from all managed servers.
///
/// Events from one server arrive in the order the server sent them; no
/// ordering holds across servers. Dropping the subscription unsubscribes.
pub struct EventSubscription {
    receiver: broadcast::Receiver<ServerEvent>,
}

impl EventSubscription {
    /// Receive the next event.
    pub async fn recv(
        &mut self,
    ) -> std::result::Result<ServerEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Receive the next event without waiting.
    pub fn try_recv(
        &mut self,
    ) -> std::result::Result<ServerEvent, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// A subscription filtered to a single server's stream.
pub struct ServerSubscription {
    server_url: String,
    receiver: broadcast::Receiver<ServerEvent>,
}

impl ServerSubscription {
    /// Receive the next event from this server, skipping other servers'
    /// traffic.
    pub async fn recv(
        &mut self,
    ) -> std::result::Result<SessionEvent, broadcast::error::RecvError> {
        loop {
            let incoming = self.receiver.recv().await?;
            if incoming.server_url == self.server_url {
                return Ok(incoming.event);
            }
        }
    }
}

// =============================================================================
// Connection Manager
// =============================================================================

struct ConnectionEntry {
    state: ConnectionState,
    /// Bumped on every `connect`/`disconnect`. A task whose generation no
    /// longer matches must not touch the entry.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    connector: Arc<dyn StreamConnector>,
    backoff: BackoffPolicy,
    max_reconnect_attempts: u32,
    connections: Mutex<HashMap<String, ConnectionEntry>>,
    event_tx: broadcast::Sender<ServerEvent>,
}

impl Inner {
    /// Apply `f` to the entry's state iff the generation still matches.
    /// Returns false when the task has been superseded and should exit.
    async fn transition(
        &self,
        url: &str,
        generation: u64,
        f: impl FnOnce(&mut ConnectionState),
    ) -> bool {
        let mut connections = self.connections.lock().await;
        match connections.get_mut(url) {
            Some(entry) if entry.generation == generation => {
                f(&mut entry.state);
                true
            }
            _ => false,
        }
    }
}

/// Maintains long-lived event streams to a set of servers.
///
/// Each instance owns its own state map and timers, so multiple managers
/// never interfere. The manager is cheap to clone; clones share state. Call
/// [`disconnect_all`](Self::disconnect_all) before dropping the last clone;
/// per-connection tasks are not tied to the manager's lifetime.
///
/// # Example
///
/// ```no_run
/// use sessionwatch::{ConnectionManager, SessionEvent};
///
/// #[tokio::main]
/// async fn main() -> sessionwatch::Result<()> {
///     let manager = ConnectionManager::new()?;
///     let mut events = manager.subscribe();
///
///     manager.connect("http://10.0.0.17:4517/events").await;
///
///     while let Ok(incoming) = events.recv().await {
///         match incoming.event {
///             SessionEvent::SessionUpdate(update) => {
///                 println!("{}: {:?}", update.session_id, update.status)
///             }
///             _ => {}
///         }
///     }
///
///     manager.disconnect_all().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Create a manager with default options and the HTTP connector.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for customizing the manager.
    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new()
    }

    /// Request a stream to `server_url`.
    ///
    /// Creates the connection entry on first call. A `disconnected` or
    /// `failed` entry is restarted with a fresh retry budget; `failed` never
    /// recovers without this explicit call. When the entry is already
    /// `connecting`, `connected`, or `reconnecting`, this is a no-op: a
    /// transport or retry timer for it is already in flight. Returns as soon
    /// as the attempt is scheduled.
    pub async fn connect(&self, server_url: &str) {
        let mut connections = self.inner.connections.lock().await;
        let entry = connections
            .entry(server_url.to_string())
            .or_insert_with(|| ConnectionEntry {
                state: ConnectionState::new(server_url, self.inner.max_reconnect_attempts),
                generation: 0,
                task: None,
            });

        match entry.state.status {
            ConnectionStatus::Connecting
            | ConnectionStatus::Connected
            | ConnectionStatus::Reconnecting => return,
            ConnectionStatus::Disconnected | ConnectionStatus::Failed => {}
        }

        // A finished task from an exhausted run may still hold the slot.
        if let Some(task) = entry.task.take() {
            task.abort();
        }

        entry.generation += 1;
        entry.state.begin_connect();
        tracing::debug!(server_url, "connecting");
        entry.task = Some(tokio::spawn(run_connection(
            Arc::clone(&self.inner),
            server_url.to_string(),
            entry.generation,
        )));
    }

    /// Tear down the stream to `server_url`, if any.
    ///
    /// Cancels a pending reconnect timer before the transport goes down, so a
    /// retry can never re-open a connection this call just closed. Returns
    /// after the per-connection task has fully stopped. Unknown or already
    /// disconnected URLs are a no-op.
    pub async fn disconnect(&self, server_url: &str) {
        let task = {
            let mut connections = self.inner.connections.lock().await;
            let Some(entry) = connections.get_mut(server_url) else {
                return;
            };
            entry.generation += 1;
            let task = entry.task.take();
            if let Some(task) = &task {
                task.abort();
            }
            entry.state.mark_disconnected();
            task
        };
        if let Some(task) = task {
            let _ = task.await;
        }
        tracing::debug!(server_url, "disconnected");
    }

    /// Disconnect every tracked server.
    ///
    /// Returns only after every transport is closed and every pending retry
    /// timer is cancelled; no reconnect fires after this call returns.
    pub async fn disconnect_all(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut connections = self.inner.connections.lock().await;
            connections
                .values_mut()
                .filter_map(|entry| {
                    entry.generation += 1;
                    let task = entry.task.take();
                    if let Some(task) = &task {
                        task.abort();
                    }
                    entry.state.mark_disconnected();
                    task
                })
                .collect()
        };
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Snapshot of one server's connection, `None` if `connect` was never
    /// called for this URL.
    pub async fn connection_state(&self, server_url: &str) -> Option<ConnectionState> {
        let connections = self.inner.connections.lock().await;
        connections.get(server_url).map(|entry| entry.state.clone())
    }

    /// Snapshot of every tracked connection. Empty right after construction.
    pub async fn all_connection_states(&self) -> HashMap<String, ConnectionState> {
        let connections = self.inner.connections.lock().await;
        connections
            .iter()
            .map(|(url, entry)| (url.clone(), entry.state.clone()))
            .collect()
    }

    /// Whether the stream to `server_url` is currently established.
    pub async fn is_connected(&self, server_url: &str) -> bool {
        let connections = self.inner.connections.lock().await;
        connections
            .get(server_url)
            .is_some_and(|entry| entry.state.is_connected())
    }

    /// Subscribe to validated events from all managed servers.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.inner.event_tx.subscribe(),
        }
    }

    /// Subscribe to validated events from one server only.
    pub fn subscribe_server(&self, server_url: &str) -> ServerSubscription {
        ServerSubscription {
            server_url: server_url.to_string(),
            receiver: self.inner.event_tx.subscribe(),
        }
    }
}

// =============================================================================
// Per-Connection Task
// =============================================================================

/// Drive one logical stream: open, pump, back off, repeat. Exits when retries
/// are exhausted or the entry's generation moves on.
async fn run_connection(inner: Arc<Inner>, url: String, generation: u64) {
    loop {
        let failure = match inner.connector.open(&url).await {
            Ok(stream) => {
                if !inner
                    .transition(&url, generation, ConnectionState::mark_connected)
                    .await
                {
                    return;
                }
                tracing::debug!(%url, "stream established");
                pump_stream(&inner, &url, stream).await
            }
            Err(e) => e.to_string(),
        };

        let delay = {
            let mut connections = inner.connections.lock().await;
            let Some(entry) = connections.get_mut(&url) else {
                return;
            };
            if entry.generation != generation {
                return;
            }
            match entry.state.record_failure(failure.as_str()) {
                FailureOutcome::Retry { attempt } => inner.backoff.next_delay(attempt),
                FailureOutcome::Exhausted => {
                    tracing::warn!(%url, error = %failure, "retries exhausted");
                    return;
                }
            }
        };

        tracing::debug!(%url, ?delay, error = %failure, "reconnecting after delay");
        tokio::time::sleep(delay).await;

        if !inner
            .transition(&url, generation, ConnectionState::retry_now)
            .await
        {
            return;
        }
    }
}

/// Pump frames until the stream ends; returns the failure description.
/// Malformed frames are dropped without touching the connection.
async fn pump_stream(inner: &Inner, url: &str, mut stream: Box<dyn EventStream>) -> String {
    loop {
        match stream.next_frame().await {
            Ok(Some(payload)) => match parse_sse_data(&payload) {
                Some(event) => {
                    // Send fails only when nobody is subscribed.
                    let _ = inner.event_tx.send(ServerEvent {
                        server_url: url.to_string(),
                        event,
                    });
                }
                None => tracing::debug!(%url, %payload, "dropping malformed frame"),
            },
            Ok(None) => return "stream closed by server".to_string(),
            Err(e) => return e.to_string(),
        }
    }
}

// =============================================================================
// Manager Builder
// =============================================================================

/// Builder for creating a [`ConnectionManager`].
pub struct ConnectionManagerBuilder {
    connector: Option<Arc<dyn StreamConnector>>,
    max_reconnect_attempts: u32,
    backoff: BackoffPolicy,
    event_capacity: usize,
}

impl Default for ConnectionManagerBuilder {
    fn default() -> Self {
        Self {
            connector: None,
            max_reconnect_attempts: 5,
            backoff: BackoffPolicy::default(),
            event_capacity: 256,
        }
    }
}

impl ConnectionManagerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom stream connector instead of the HTTP one.
    pub fn connector(mut self, connector: impl StreamConnector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Set how many consecutive failures move a connection to `failed`.
    /// Values below one are raised to one.
    pub fn max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = max.max(1);
        self
    }

    /// Set the reconnect backoff policy.
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the event broadcast capacity. Slow subscribers that fall more than
    /// this many events behind observe `RecvError::Lagged`.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Build the manager.
    pub fn build(self) -> Result<ConnectionManager> {
        let connector: Arc<dyn StreamConnector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(HttpConnector::new()?),
        };
        let (event_tx, _) = broadcast::channel(self.event_capacity);
        Ok(ConnectionManager {
            inner: Arc::new(Inner {
                connector,
                backoff: self.backoff,
                max_reconnect_attempts: self.max_reconnect_attempts,
                connections: Mutex::new(HashMap::new()),
                event_tx,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_clamps_options() {
        let builder = ConnectionManagerBuilder::new()
            .max_reconnect_attempts(0)
            .event_capacity(0);
        assert_eq!(builder.max_reconnect_attempts, 1);
        assert_eq!(builder.event_capacity, 1);
    }

    #[tokio::test]
    async fn test_fresh_manager_is_empty() {
        let manager = ConnectionManager::new().unwrap();
        assert!(manager.all_connection_states().await.is_empty());
        assert!(!manager.is_connected("http://nowhere").await);
        assert_eq!(manager.connection_state("http://nowhere").await, None);
    }

    #[tokio::test]
    async fn test_disconnect_unknown_url_is_noop() {
        let manager = ConnectionManager::new().unwrap();
        manager.disconnect("http://never-connected").await;
        assert!(manager.all_connection_states().await.is_empty());
    }
}
