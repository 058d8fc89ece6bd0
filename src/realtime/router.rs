//! Protocol state machine: validates inbound events, coordinates the
//! store gateways and pushes results to the affected rooms
//!
//! Connections move `Unjoined -> Joined -> Disconnected`. Events from one
//! connection are handled one at a time (the socket loop awaits each
//! handler); events from different connections interleave freely. Every
//! gateway call runs on the blocking pool under a bounded timeout, and any
//! failure drops the event without a partial-success broadcast - the
//! client is the retry authority.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TetherError};
use crate::storage::{ConnectionGraphGateway, MessageGateway, NotificationGateway};
use crate::types::{NewChatMessage, NewNotification, UserRecord};

use super::events::{ClientEvent, RequestDecision, ServerEvent};
use super::registry::SessionRegistry;

/// Default bound on a single gateway call
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

/// The realtime router
pub struct RealtimeRouter {
    registry: SessionRegistry,
    users: Arc<dyn ConnectionGraphGateway>,
    messages: Arc<dyn MessageGateway>,
    notifications: Arc<dyn NotificationGateway>,
    gateway_timeout: Duration,
}

impl Clone for RealtimeRouter {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            users: self.users.clone(),
            messages: self.messages.clone(),
            notifications: self.notifications.clone(),
            gateway_timeout: self.gateway_timeout,
        }
    }
}

impl RealtimeRouter {
    /// Create a router over a single store implementing all three gateways
    pub fn new<S>(registry: SessionRegistry, store: Arc<S>) -> Self
    where
        S: ConnectionGraphGateway + MessageGateway + NotificationGateway + 'static,
    {
        Self::with_gateways(registry, store.clone(), store.clone(), store)
    }

    /// Create a router with separately provided gateways
    pub fn with_gateways(
        registry: SessionRegistry,
        users: Arc<dyn ConnectionGraphGateway>,
        messages: Arc<dyn MessageGateway>,
        notifications: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            registry,
            users,
            messages,
            notifications,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Override the per-call gateway timeout
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// The session registry this router routes through
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Parse and handle one inbound frame from a connection
    pub async fn handle_frame(&self, conn_id: &str, frame: &str) -> Result<()> {
        let event: ClientEvent = serde_json::from_str(frame)
            .map_err(|e| TetherError::InvalidPayload(format!("unparseable frame: {e}")))?;
        self.handle_event(conn_id, event).await
    }

    /// Handle one inbound event from a connection
    pub async fn handle_event(&self, conn_id: &str, event: ClientEvent) -> Result<()> {
        match event {
            ClientEvent::JoinRoom(user_id) => self.handle_join(conn_id, user_id),
            ClientEvent::SendMessage(input) => self.handle_send_message(conn_id, input).await,
            ClientEvent::AcceptRequest(decision) => {
                self.handle_accept_request(conn_id, decision).await
            }
            ClientEvent::RejectRequest(decision) => {
                self.handle_reject_request(conn_id, decision).await
            }
        }
    }

    /// `joinRoom`: bind the connection and broadcast the new active set
    pub fn handle_join(&self, conn_id: &str, user_id: String) -> Result<()> {
        if user_id.is_empty() {
            return Err(TetherError::InvalidPayload(
                "joinRoom requires a user id".to_string(),
            ));
        }

        let snapshot = self.registry.join(conn_id, &user_id);
        tracing::info!("Connection {} joined as {}", conn_id, user_id);
        self.registry.broadcast(ServerEvent::ActiveUsers(snapshot));
        Ok(())
    }

    /// `sendMessage`: persist, then deliver to the receiver's room
    pub async fn handle_send_message(&self, conn_id: &str, input: NewChatMessage) -> Result<()> {
        self.require_joined(conn_id)?;
        if input.sender_id.is_empty() || input.receiver_id.is_empty() || input.message.is_empty() {
            return Err(TetherError::InvalidPayload(
                "sendMessage requires senderId, receiverId and message".to_string(),
            ));
        }

        let messages = self.messages.clone();
        let persisted = self
            .call_gateway("create_message", move || messages.create_message(&input))
            .await?;

        tracing::debug!(
            "Message {} persisted from {} to {}",
            persisted.id,
            persisted.sender_id,
            persisted.receiver_id
        );

        // Best-effort: dropped silently if the receiver is offline,
        // the record is already durable
        let receiver = persisted.receiver_id.clone();
        self.registry
            .send_to_user(&receiver, ServerEvent::ReceiveMessage(persisted));
        Ok(())
    }

    /// `acceptRequest`: two-record saga plus notification side effects.
    ///
    /// Write order bounds the inconsistency window: the requestee's record
    /// is saved before the requester's, and the notification side effects
    /// run last. Each step is a set-membership no-op on retry.
    pub async fn handle_accept_request(
        &self,
        conn_id: &str,
        decision: RequestDecision,
    ) -> Result<()> {
        self.require_joined(conn_id)?;
        let RequestDecision { user_id, sender_id } = validate_decision(decision)?;

        let mut user = self.fetch_user_required(user_id.clone()).await?;
        let mut sender = self.fetch_user_required(sender_id.clone()).await?;

        let had_request = user.remove_request(&sender_id);
        if !had_request {
            if user.is_connected_to(&sender_id) {
                // Retry of an already-applied accept; nothing left to do
                tracing::debug!("Accept from {} already applied for {}", sender_id, user_id);
                return Ok(());
            }
            return Err(TetherError::InvalidPayload(format!(
                "no pending request from {sender_id} to {user_id}"
            )));
        }

        user.add_connection(&sender_id);
        sender.add_connection(&user_id);

        // Requestee first; the requester's record is only written once
        // this save has gone through
        self.save_user(user.clone()).await?;
        self.save_user(sender).await?;

        let notifications = self.notifications.clone();
        let (target, origin) = (user_id.clone(), sender_id.clone());
        self.call_gateway("mark_read", move || {
            notifications.mark_read(&target, &origin)
        })
        .await?;

        let notification = self
            .create_notification(NewNotification {
                user_id: sender_id.clone(),
                sender_id: user_id.clone(),
                message: format!(
                    "{} accepted your connection request.",
                    display_name_of(&user)
                ),
            })
            .await?;

        tracing::info!("Connection request accepted by {} from {}", user_id, sender_id);
        self.registry
            .send_to_user(&sender_id, ServerEvent::NewNotification(notification));
        Ok(())
    }

    /// `rejectRequest`: clear the pending request and its notifications,
    /// then notify the requester
    pub async fn handle_reject_request(
        &self,
        conn_id: &str,
        decision: RequestDecision,
    ) -> Result<()> {
        self.require_joined(conn_id)?;
        let RequestDecision { user_id, sender_id } = validate_decision(decision)?;

        let mut user = self.fetch_user_required(user_id.clone()).await?;

        // Tolerated even when no request is pending
        user.remove_request(&sender_id);
        self.save_user(user.clone()).await?;

        // Deletes notifications filtered by (target=userId, origin=senderId).
        // Note the pending-request notification itself is stored under the
        // opposite direction, so this filter may match nothing.
        let notifications = self.notifications.clone();
        let (target, origin) = (user_id.clone(), sender_id.clone());
        self.call_gateway("delete_matching", move || {
            notifications.delete_matching(&target, &origin)
        })
        .await?;

        let notification = self
            .create_notification(NewNotification {
                user_id: sender_id.clone(),
                sender_id: user_id.clone(),
                message: format!(
                    "{} rejected your connection request.",
                    display_name_of(&user)
                ),
            })
            .await?;

        tracing::info!("Connection request rejected by {} from {}", user_id, sender_id);
        self.registry
            .send_to_user(&sender_id, ServerEvent::NewNotification(notification));
        Ok(())
    }

    /// Connection teardown: vacate the room and broadcast only if the
    /// active set changed
    pub fn handle_disconnect(&self, conn_id: &str) {
        if let Some(snapshot) = self.registry.leave(conn_id) {
            tracing::info!("Connection {} closed, active set changed", conn_id);
            self.registry.broadcast(ServerEvent::ActiveUsers(snapshot));
        } else {
            tracing::debug!("Connection {} closed", conn_id);
        }
    }

    fn require_joined(&self, conn_id: &str) -> Result<()> {
        if self.registry.bound_user(conn_id).is_none() {
            return Err(TetherError::InvalidPayload(
                "connection has not joined".to_string(),
            ));
        }
        Ok(())
    }

    async fn fetch_user_required(&self, id: String) -> Result<UserRecord> {
        let users = self.users.clone();
        let lookup = id.clone();
        self.call_gateway("fetch_user", move || users.fetch_user(&lookup))
            .await?
            .ok_or(TetherError::UserNotFound(id))
    }

    async fn save_user(&self, user: UserRecord) -> Result<()> {
        let users = self.users.clone();
        self.call_gateway("save_user", move || users.save_user(&user))
            .await
    }

    async fn create_notification(
        &self,
        input: NewNotification,
    ) -> Result<crate::types::Notification> {
        let notifications = self.notifications.clone();
        self.call_gateway("create_notification", move || {
            notifications.create_notification(&input)
        })
        .await
    }

    /// Run a sync gateway call on the blocking pool under the configured
    /// timeout. Expiry counts as a dropped-event store failure.
    async fn call_gateway<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(self.gateway_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(TetherError::Store(format!("{op}: worker failed: {join}"))),
            Err(_) => Err(TetherError::Store(format!(
                "{op}: timed out after {:?}",
                self.gateway_timeout
            ))),
        }
    }
}

fn validate_decision(decision: RequestDecision) -> Result<RequestDecision> {
    if decision.user_id.is_empty() || decision.sender_id.is_empty() {
        return Err(TetherError::InvalidPayload(
            "request decision requires userId and senderId".to_string(),
        ));
    }
    Ok(decision)
}

/// Display name for notification texts, falling back to the id for
/// records that never set one
fn display_name_of(user: &UserRecord) -> &str {
    if user.display_name.is_empty() {
        &user.id
    } else {
        &user.display_name
    }
}
