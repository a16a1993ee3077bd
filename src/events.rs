// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

//! Session event types for the sessionwatch SDK.
//!
//! Events are pushed by a monitored server over its event stream. They cover
//! session state changes, transcript messages, and permission requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// =============================================================================
// Enums
// =============================================================================

/// State of a remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Busy,
    WaitingForPermission,
    Completed,
    Error,
    Aborted,
}

/// Kind of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    UserInput,
    AssistantResponse,
    ToolExecution,
    SystemMessage,
}

// =============================================================================
// Event Data Types
// =============================================================================

/// A single transcript message carried by a `message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: String,
    pub content: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

/// Data for a `session_update` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdateEvent {
    pub session_id: String,
    pub status: SessionStatus,
    pub last_activity: i64,
    /// Open server-defined payload. `null` and absent both mean "no metadata".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

/// Data for a `message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub session_id: String,
    pub message: SessionMessage,
}

/// Data for a `permission_request` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequestEvent {
    pub session_id: String,
    pub permission_id: String,
    pub tool_name: String,
    /// Tool arguments are deliberately left as an open mapping; the schema of
    /// individual tools is not this crate's concern.
    pub tool_args: HashMap<String, Value>,
    pub description: String,
}

// =============================================================================
// SessionEvent
// =============================================================================

/// An event received on a server's stream, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    #[serde(rename = "session_update")]
    SessionUpdate(SessionUpdateEvent),
    #[serde(rename = "message")]
    Message(MessageEvent),
    #[serde(rename = "permission_request")]
    PermissionRequest(PermissionRequestEvent),
}

impl SessionEvent {
    /// Build a `session_update` event.
    pub fn session_update(
        session_id: impl Into<String>,
        status: SessionStatus,
        last_activity: i64,
        metadata: Option<HashMap<String, Value>>,
    ) -> Self {
        Self::SessionUpdate(SessionUpdateEvent {
            session_id: session_id.into(),
            status,
            last_activity,
            metadata,
        })
    }

    /// Build a `message` event.
    pub fn message(session_id: impl Into<String>, message: SessionMessage) -> Self {
        Self::Message(MessageEvent {
            session_id: session_id.into(),
            message,
        })
    }

    /// Build a `permission_request` event.
    pub fn permission_request(
        session_id: impl Into<String>,
        permission_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_args: HashMap<String, Value>,
        description: impl Into<String>,
    ) -> Self {
        Self::PermissionRequest(PermissionRequestEvent {
            session_id: session_id.into(),
            permission_id: permission_id.into(),
            tool_name: tool_name.into(),
            tool_args,
            description: description.into(),
        })
    }

    /// The session this event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::SessionUpdate(data) => &data.session_id,
            SessionEvent::Message(data) => &data.session_id,
            SessionEvent::PermissionRequest(data) => &data.session_id,
        }
    }

    /// The wire value of this event's `type` discriminant.
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::SessionUpdate(_) => "session_update",
            SessionEvent::Message(_) => "message",
            SessionEvent::PermissionRequest(_) => "permission_request",
        }
    }

    /// Get session update data if this is a `session_update` event.
    pub fn as_session_update(&self) -> Option<&SessionUpdateEvent> {
        match self {
            SessionEvent::SessionUpdate(data) => Some(data),
            _ => None,
        }
    }

    /// Get message data if this is a `message` event.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            SessionEvent::Message(data) => Some(data),
            _ => None,
        }
    }

    /// Get permission request data if this is a `permission_request` event.
    pub fn as_permission_request(&self) -> Option<&PermissionRequestEvent> {
        match self {
            SessionEvent::PermissionRequest(data) => Some(data),
            _ => None,
        }
    }
}

// =============================================================================
// Structural Validation
// =============================================================================

const SESSION_STATUSES: [&str; 6] = [
    "idle",
    "busy",
    "waiting_for_permission",
    "completed",
    "error",
    "aborted",
];

const MESSAGE_TYPES: [&str; 4] = [
    "user_input",
    "assistant_response",
    "tool_execution",
    "system_message",
];

fn is_non_empty_string(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

fn is_string(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(_)))
}

fn is_integer(value: Option<&Value>) -> bool {
    matches!(value, Some(v) if v.is_i64() || v.is_u64())
}

/// Structural predicate for inbound event payloads.
///
/// Returns true iff `value` is an object whose `type` is one of the three
/// known literals, whose `sessionId` is a non-empty string, and whose
/// type-specific required fields are present with the correct shape. Extra
/// fields are tolerated; unknown `type` values are rejected regardless of the
/// rest of the shape. Never panics.
pub fn is_valid_session_event(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    if !is_non_empty_string(obj.get("sessionId")) {
        return false;
    }

    let Some(Value::String(event_type)) = obj.get("type") else {
        return false;
    };

    match event_type.as_str() {
        "session_update" => {
            let status_ok = matches!(
                obj.get("status"),
                Some(Value::String(s)) if SESSION_STATUSES.contains(&s.as_str())
            );
            // metadata is optional; null and absent both mean "no metadata"
            let metadata_ok = matches!(
                obj.get("metadata"),
                None | Some(Value::Null) | Some(Value::Object(_))
            );
            status_ok && is_integer(obj.get("lastActivity")) && metadata_ok
        }
        "message" => {
            let Some(Value::Object(msg)) = obj.get("message") else {
                return false;
            };
            let type_ok = matches!(
                msg.get("type"),
                Some(Value::String(s)) if MESSAGE_TYPES.contains(&s.as_str())
            );
            is_string(msg.get("id"))
                && is_string(msg.get("content"))
                && is_integer(msg.get("timestamp"))
                && type_ok
        }
        "permission_request" => {
            is_string(obj.get("permissionId"))
                && is_string(obj.get("toolName"))
                && matches!(obj.get("toolArgs"), Some(Value::Object(_)))
                && is_string(obj.get("description"))
        }
        _ => false,
    }
}
