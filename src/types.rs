//! Core types for the Tether realtime core
//!
//! Wire shapes are camelCase to match the client protocol; the chat body
//! field is named `message` on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque user identifier, issued by the external identity provider
pub type UserId = String;

/// Store-assigned identifier for chat messages
pub type MessageId = i64;

/// Store-assigned identifier for notifications
pub type NotificationId = i64;

/// A user's stored record: profile fields plus the connection graph edges
/// that hang off this user.
///
/// `connections` is symmetric once a request has been accepted;
/// `connection_requests` holds pending inbound requests and is
/// one-directional. A given peer must never appear in both at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub photo_url: String,
    /// Established (accepted) connections, set semantics
    #[serde(default)]
    pub connections: Vec<UserId>,
    /// Pending inbound connection requests, set semantics
    #[serde(default)]
    pub connection_requests: Vec<UserId>,
}

impl UserRecord {
    /// Create a bare record with no edges
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: String::new(),
            photo_url: String::new(),
            connections: Vec::new(),
            connection_requests: Vec::new(),
        }
    }

    /// Add a peer to `connections` if absent. Returns true if inserted.
    pub fn add_connection(&mut self, peer: &str) -> bool {
        if self.connections.iter().any(|c| c == peer) {
            return false;
        }
        self.connections.push(peer.to_string());
        true
    }

    /// Remove a peer from `connection_requests` if present. Returns true if removed.
    pub fn remove_request(&mut self, peer: &str) -> bool {
        let before = self.connection_requests.len();
        self.connection_requests.retain(|r| r != peer);
        self.connection_requests.len() != before
    }

    /// Check whether a pending request from `peer` exists
    pub fn has_request_from(&self, peer: &str) -> bool {
        self.connection_requests.iter().any(|r| r == peer)
    }

    /// Check whether `peer` is an established connection
    pub fn is_connected_to(&self, peer: &str) -> bool {
        self.connections.iter().any(|c| c == peer)
    }
}

/// A persisted direct chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    /// Message body; named `message` on the wire
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
}

/// A persisted notification. `user_id` is the target, `sender_id` the
/// originating user. Mutable only through the read flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    /// Target user
    pub user_id: UserId,
    /// Originating user
    pub sender_id: UserId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: UserId,
    pub sender_id: UserId,
    pub message: String,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to the SQLite database file, or ":memory:"
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: ":memory:".to_string(),
        }
    }
}
