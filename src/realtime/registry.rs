//! Session registry: which users currently have live connections
//!
//! Owns the only shared mutable in-memory state in the core: the binding
//! from connection to user, the per-user routing table ("rooms") and the
//! derived active-user set. All mutation happens inside the internal lock;
//! active-set snapshots are taken in the same critical section as the
//! mutation they reflect.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::types::UserId;

use super::events::ServerEvent;

/// Connection ID
pub type ConnectionId = String;

/// Per-connection outbound event sink
pub type EventSink = mpsc::UnboundedSender<ServerEvent>;

#[derive(Default)]
struct RegistryInner {
    /// Every live connection, joined or not
    sinks: HashMap<ConnectionId, EventSink>,
    /// Connection to user binding (joined connections only)
    bindings: HashMap<ConnectionId, UserId>,
    /// User to connection routing table
    rooms: HashMap<UserId, HashSet<ConnectionId>>,
}

impl RegistryInner {
    fn active_users(&self) -> Vec<UserId> {
        self.rooms.keys().cloned().collect()
    }

    /// Drop a connection from its room, removing the room when emptied.
    /// Returns true if the user left the active set.
    fn vacate(&mut self, user_id: &str, conn_id: &str) -> bool {
        if let Some(room) = self.rooms.get_mut(user_id) {
            room.remove(conn_id);
            if room.is_empty() {
                self.rooms.remove(user_id);
                return true;
            }
        }
        false
    }
}

/// Tracks live sessions and routes outbound events to them
pub struct SessionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner::default())),
        }
    }

    /// Register a freshly opened connection (not yet joined)
    pub fn register(&self, conn_id: ConnectionId, sink: EventSink) {
        self.inner.write().sinks.insert(conn_id, sink);
    }

    /// Bind a connection to a user identity and enter that user's room.
    ///
    /// Idempotent per connection: a repeated join overwrites the binding,
    /// vacating the previous room first. Returns the active-user snapshot
    /// taken after the mutation.
    pub fn join(&self, conn_id: &str, user_id: &str) -> Vec<UserId> {
        let mut inner = self.inner.write();

        if let Some(previous) = inner.bindings.insert(conn_id.to_string(), user_id.to_string()) {
            if previous != user_id {
                inner.vacate(&previous, conn_id);
            }
        }

        inner
            .rooms
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id.to_string());

        inner.active_users()
    }

    /// Remove a connection entirely. No-op if it was never registered.
    ///
    /// Returns a post-mutation active-user snapshot if the set changed
    /// (the connection was its user's last), `None` otherwise.
    pub fn leave(&self, conn_id: &str) -> Option<Vec<UserId>> {
        let mut inner = self.inner.write();

        inner.sinks.remove(conn_id);
        let user_id = inner.bindings.remove(conn_id)?;

        if inner.vacate(&user_id, conn_id) {
            Some(inner.active_users())
        } else {
            None
        }
    }

    /// Deliver an event to every live connection in a user's room.
    /// Silently a no-op if the user has no live connection.
    pub fn send_to_user(&self, user_id: &str, event: ServerEvent) {
        let sinks: Vec<EventSink> = {
            let inner = self.inner.read();
            match inner.rooms.get(user_id) {
                Some(room) => room
                    .iter()
                    .filter_map(|conn| inner.sinks.get(conn).cloned())
                    .collect(),
                None => return,
            }
        };

        for sink in sinks {
            let _ = sink.send(event.clone());
        }
    }

    /// Deliver an event to every live connection, joined or not
    pub fn broadcast(&self, event: ServerEvent) {
        let sinks: Vec<EventSink> = self.inner.read().sinks.values().cloned().collect();
        for sink in sinks {
            let _ = sink.send(event.clone());
        }
    }

    /// Snapshot of users with at least one live connection
    pub fn active_users(&self) -> Vec<UserId> {
        self.inner.read().active_users()
    }

    /// The user a connection is currently bound to, if joined
    pub fn bound_user(&self, conn_id: &str) -> Option<UserId> {
        self.inner.read().bindings.get(conn_id).cloned()
    }

    /// Number of live connections
    pub fn client_count(&self) -> usize {
        self.inner.read().sinks.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
