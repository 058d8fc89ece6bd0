//! Gateway contracts the realtime router operates through
//!
//! Three narrow traits instead of one wide store interface: the router is
//! the only component that touches more than one of them, and each event
//! handler coordinates at most what its operation needs.
//!
//! # Design Principles
//!
//! 1. **Sync Interface**: All methods are synchronous. The router wraps
//!    calls in `tokio::task::spawn_blocking` with a bounded timeout.
//!
//! 2. **Error Handling**: All methods return `Result<T>` using the crate's
//!    error type.
//!
//! 3. **Immutable Self**: Methods take `&self` to allow internal
//!    mutability and shared ownership behind `Arc`.

use crate::error::Result;
use crate::types::{ChatMessage, NewChatMessage, NewNotification, Notification, UserRecord};

/// Reads and mutates each user's connection list and pending-request list
pub trait ConnectionGraphGateway: Send + Sync {
    /// Fetch a user record by id. Returns `None` if the user has no record.
    fn fetch_user(&self, id: &str) -> Result<Option<UserRecord>>;

    /// Persist a whole user record (upsert), including both edge sets
    fn save_user(&self, user: &UserRecord) -> Result<()>;
}

/// Persists chat messages
pub trait MessageGateway: Send + Sync {
    /// Persist a new chat message and return the stored record
    /// with its assigned id and timestamp
    fn create_message(&self, input: &NewChatMessage) -> Result<ChatMessage>;
}

/// Appends, updates and removes notification records
pub trait NotificationGateway: Send + Sync {
    /// Persist a new unread notification and return the stored record
    fn create_notification(&self, input: &NewNotification) -> Result<Notification>;

    /// Mark all notifications matching `(target, origin)` as read.
    /// Returns the number of records updated.
    fn mark_read(&self, user_id: &str, sender_id: &str) -> Result<usize>;

    /// Delete all notifications matching `(target, origin)`.
    /// Returns the number of records deleted.
    fn delete_matching(&self, user_id: &str, sender_id: &str) -> Result<usize>;
}
