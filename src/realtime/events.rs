//! Wire events for the realtime protocol
//!
//! Frames are JSON objects tagged by `event` with the payload under `data`,
//! e.g. `{"event":"joinRoom","data":"user-1"}`.

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, NewChatMessage, Notification, UserId};

/// Payload for accept/reject decisions: `userId` is the user resolving the
/// request, `senderId` the user who originally sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDecision {
    pub user_id: UserId,
    pub sender_id: UserId,
}

/// Inbound events (client to server)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Announce user identity and enter that user's room
    #[serde(rename = "joinRoom")]
    JoinRoom(UserId),
    /// Send a direct message to another user
    #[serde(rename = "sendMessage")]
    SendMessage(NewChatMessage),
    /// Accept a pending connection request
    #[serde(rename = "acceptRequest")]
    AcceptRequest(RequestDecision),
    /// Reject a pending connection request
    #[serde(rename = "rejectRequest")]
    RejectRequest(RequestDecision),
}

/// Outbound events (server to client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full snapshot of users with at least one live session
    #[serde(rename = "activeUsers")]
    ActiveUsers(Vec<UserId>),
    /// A persisted chat message, delivered to the receiver's room
    #[serde(rename = "receiveMessage")]
    ReceiveMessage(ChatMessage),
    /// A persisted notification, delivered to the affected user's room
    #[serde(rename = "newNotification")]
    NewNotification(Notification),
}
