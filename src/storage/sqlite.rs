//! SQLite implementation of the gateway contracts
//!
//! Wraps the `Store` connection handling and delegates to the functions
//! in `queries.rs`. `save_user` runs in a transaction so the profile row
//! and both edge tables move together; cross-record atomicity between two
//! different users' saves is intentionally not provided (the router's
//! accept/reject saga orders the writes instead).

use crate::error::{Result, TetherError};
use crate::types::{
    ChatMessage, NewChatMessage, NewNotification, Notification, StorageConfig, UserRecord,
};

use super::connection::Store;
use super::gateway::{ConnectionGraphGateway, MessageGateway, NotificationGateway};
use super::queries;

/// SQLite-backed store implementing all three gateway contracts
pub struct SqliteStore {
    store: Store,
}

impl SqliteStore {
    /// Open a store with the given configuration
    pub fn open(config: StorageConfig) -> Result<Self> {
        let store = Store::open(config)?;
        Ok(Self { store })
    }

    /// Open an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let store = Store::open_in_memory()?;
        Ok(Self { store })
    }

    /// Get a reference to the underlying Store
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl ConnectionGraphGateway for SqliteStore {
    fn fetch_user(&self, id: &str) -> Result<Option<UserRecord>> {
        self.store
            .with_connection(|conn| match queries::get_user(conn, id) {
                Ok(user) => Ok(Some(user)),
                Err(TetherError::UserNotFound(_)) => Ok(None),
                Err(e) => Err(e),
            })
    }

    fn save_user(&self, user: &UserRecord) -> Result<()> {
        self.store
            .with_transaction(|conn| queries::upsert_user(conn, user))
    }
}

impl MessageGateway for SqliteStore {
    fn create_message(&self, input: &NewChatMessage) -> Result<ChatMessage> {
        self.store
            .with_transaction(|conn| queries::create_message(conn, input))
    }
}

impl NotificationGateway for SqliteStore {
    fn create_notification(&self, input: &NewNotification) -> Result<Notification> {
        self.store
            .with_transaction(|conn| queries::create_notification(conn, input))
    }

    fn mark_read(&self, user_id: &str, sender_id: &str) -> Result<usize> {
        self.store
            .with_transaction(|conn| queries::mark_notifications_read(conn, user_id, sender_id))
    }

    fn delete_matching(&self, user_id: &str, sender_id: &str) -> Result<usize> {
        self.store
            .with_transaction(|conn| queries::delete_notifications(conn, user_id, sender_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_missing_user_is_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.fetch_user("ghost").unwrap().is_none());
    }

    #[test]
    fn test_save_and_fetch_user() {
        let store = SqliteStore::in_memory().unwrap();
        let mut user = UserRecord::new("u1", "u1@example.com");
        user.display_name = "User One".to_string();
        user.connection_requests.push("u2".to_string());

        store.save_user(&user).unwrap();
        let fetched = store.fetch_user("u1").unwrap().unwrap();
        assert_eq!(fetched, user);
    }

    #[test]
    fn test_message_gateway_assigns_id() {
        let store = SqliteStore::in_memory().unwrap();
        let msg = store
            .create_message(&NewChatMessage {
                sender_id: "A".to_string(),
                receiver_id: "B".to_string(),
                message: "hi".to_string(),
            })
            .unwrap();
        assert!(msg.id > 0);
        assert_eq!(msg.message, "hi");
    }

    #[test]
    fn test_notification_gateway_lifecycle() {
        let store = SqliteStore::in_memory().unwrap();
        let n = store
            .create_notification(&NewNotification {
                user_id: "u1".to_string(),
                sender_id: "u2".to_string(),
                message: "ping".to_string(),
            })
            .unwrap();
        assert!(!n.is_read);

        assert_eq!(store.mark_read("u1", "u2").unwrap(), 1);
        assert_eq!(store.delete_matching("u1", "u2").unwrap(), 1);
        assert_eq!(store.delete_matching("u1", "u2").unwrap(), 0);
    }
}
