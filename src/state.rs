// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

//! Per-server connection state and its transition rules.
//!
//! The [`ConnectionManager`](crate::manager::ConnectionManager) owns every
//! `ConnectionState` and hands callers cloned snapshots; all mutation goes
//! through the transition methods here so the state machine lives in one
//! place.

use serde::Serialize;

/// Status of the stream to one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Retries exhausted. Terminal until an explicit `connect` call.
    Failed,
}

/// Outcome of recording a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Schedule another attempt; `attempt` is the zero-based consecutive
    /// failure index to feed the backoff policy.
    Retry { attempt: u32 },
    /// `max_reconnect_attempts` reached; the connection is now `Failed`.
    Exhausted,
}

/// Snapshot of one server's connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub server_url: String,
    pub status: ConnectionStatus,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ConnectionState {
    /// Fresh disconnected state for `server_url`.
    ///
    /// `max_reconnect_attempts` of zero would make every connection fail on
    /// its first transport error with no retry, so it is raised to one.
    pub fn new(server_url: impl Into<String>, max_reconnect_attempts: u32) -> Self {
        Self {
            server_url: server_url.into(),
            status: ConnectionStatus::Disconnected,
            reconnect_attempts: 0,
            max_reconnect_attempts: max_reconnect_attempts.max(1),
            last_error: None,
        }
    }

    /// Whether the stream is currently established.
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// `disconnected`/`failed` → `connecting`, with attempts and error reset.
    /// This is the explicit-recovery path: a `failed` connection never leaves
    /// that state without this call.
    pub fn begin_connect(&mut self) {
        self.status = ConnectionStatus::Connecting;
        self.reconnect_attempts = 0;
        self.last_error = None;
    }

    /// `connecting` → `connected`; a success resets the consecutive-failure
    /// count.
    pub fn mark_connected(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.reconnect_attempts = 0;
        self.last_error = None;
    }

    /// Record a transport failure (open failure or stream error/close).
    ///
    /// Increments `reconnect_attempts`; moves to `reconnecting` while retries
    /// remain, `failed` once they are exhausted.
    pub fn record_failure(&mut self, error: impl Into<String>) -> FailureOutcome {
        self.reconnect_attempts += 1;
        self.last_error = Some(error.into());
        if self.reconnect_attempts >= self.max_reconnect_attempts {
            self.status = ConnectionStatus::Failed;
            FailureOutcome::Exhausted
        } else {
            self.status = ConnectionStatus::Reconnecting;
            FailureOutcome::Retry {
                attempt: self.reconnect_attempts - 1,
            }
        }
    }

    /// `reconnecting` → `connecting` once the backoff delay has elapsed.
    pub fn retry_now(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// Any state → `disconnected`; attempts reset, the entry stays around.
    pub fn mark_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.reconnect_attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_disconnected() {
        let state = ConnectionState::new("http://localhost:8080", 5);
        assert_eq!(state.status, ConnectionStatus::Disconnected);
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.max_reconnect_attempts, 5);
        assert_eq!(state.last_error, None);
        assert!(!state.is_connected());
    }

    #[test]
    fn test_zero_max_attempts_is_raised() {
        let state = ConnectionState::new("http://a", 0);
        assert_eq!(state.max_reconnect_attempts, 1);
    }

    #[test]
    fn test_connect_success_path() {
        let mut state = ConnectionState::new("http://a", 3);
        state.begin_connect();
        assert_eq!(state.status, ConnectionStatus::Connecting);
        state.mark_connected();
        assert!(state.is_connected());
        assert_eq!(state.reconnect_attempts, 0);
    }

    #[test]
    fn test_failures_accumulate_until_exhausted() {
        let mut state = ConnectionState::new("http://a", 3);
        state.begin_connect();

        assert_eq!(
            state.record_failure("refused"),
            FailureOutcome::Retry { attempt: 0 }
        );
        assert_eq!(state.status, ConnectionStatus::Reconnecting);
        state.retry_now();

        assert_eq!(
            state.record_failure("refused"),
            FailureOutcome::Retry { attempt: 1 }
        );
        state.retry_now();

        assert_eq!(state.record_failure("refused"), FailureOutcome::Exhausted);
        assert_eq!(state.status, ConnectionStatus::Failed);
        assert_eq!(state.reconnect_attempts, 3);
        assert_eq!(state.last_error.as_deref(), Some("refused"));
    }

    #[test]
    fn test_success_resets_failure_count() {
        let mut state = ConnectionState::new("http://a", 3);
        state.begin_connect();
        state.record_failure("timeout");
        state.retry_now();
        state.mark_connected();
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.last_error, None);

        // The budget is full again after a success.
        assert_eq!(
            state.record_failure("closed"),
            FailureOutcome::Retry { attempt: 0 }
        );
    }

    #[test]
    fn test_explicit_connect_recovers_failed_state() {
        let mut state = ConnectionState::new("http://a", 1);
        state.begin_connect();
        assert_eq!(state.record_failure("refused"), FailureOutcome::Exhausted);

        state.begin_connect();
        assert_eq!(state.status, ConnectionStatus::Connecting);
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn test_disconnect_from_any_state() {
        let mut state = ConnectionState::new("http://a", 3);
        state.begin_connect();
        state.mark_connected();
        state.mark_disconnected();
        assert_eq!(state.status, ConnectionStatus::Disconnected);

        state.begin_connect();
        state.record_failure("refused");
        state.mark_disconnected();
        assert_eq!(state.status, ConnectionStatus::Disconnected);
        assert_eq!(state.reconnect_attempts, 0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut state = ConnectionState::new("http://a", 3);
        state.begin_connect();
        state.record_failure("connection refused");

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["serverUrl"], "http://a");
        assert_eq!(value["status"], "reconnecting");
        assert_eq!(value["reconnectAttempts"], 1);
        assert_eq!(value["maxReconnectAttempts"], 3);
        assert_eq!(value["lastError"], "connection refused");
    }
}
