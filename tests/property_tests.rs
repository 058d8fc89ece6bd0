//! Property-based tests for tether
//!
//! These tests verify invariants that must hold for all inputs:
//! - The active-user set always equals the set of users with at least
//!   one open connection, for any join/leave sequence
//! - Inbound frame parsing never panics
//!
//! Run with: cargo test --test property_tests

use proptest::prelude::*;

// ============================================================================
// SESSION REGISTRY TESTS
// ============================================================================

mod registry_tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use tether::realtime::{ServerEvent, SessionRegistry};
    use tokio::sync::mpsc;

    /// One step in a simulated connection history
    #[derive(Debug, Clone)]
    enum Op {
        Join { conn: u8, user: u8 },
        Leave { conn: u8 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..16, 0u8..6).prop_map(|(conn, user)| Op::Join { conn, user }),
            (0u8..16).prop_map(|conn| Op::Leave { conn }),
        ]
    }

    /// Reference model: plain map from connection to user
    fn model_active_set(bindings: &HashMap<u8, u8>) -> HashSet<String> {
        bindings.values().map(|u| format!("user-{u}")).collect()
    }

    proptest! {
        /// Invariant: after any sequence of joins and leaves, the registry's
        /// active set equals the set of users with >= 1 open connection
        #[test]
        fn active_set_matches_model(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let registry = SessionRegistry::new();
            let mut model: HashMap<u8, u8> = HashMap::new();
            // Keep receivers alive so sends are not errors
            let mut sinks = Vec::new();

            for op in ops {
                match op {
                    Op::Join { conn, user } => {
                        let conn_id = format!("conn-{conn}");
                        if model.insert(conn, user).is_none() {
                            let (tx, rx) = mpsc::unbounded_channel();
                            registry.register(conn_id.clone(), tx);
                            sinks.push(rx);
                        }
                        registry.join(&conn_id, &format!("user-{user}"));
                    }
                    Op::Leave { conn } => {
                        model.remove(&conn);
                        registry.leave(&format!("conn-{conn}"));
                    }
                }
            }

            let actual: HashSet<String> = registry.active_users().into_iter().collect();
            prop_assert_eq!(actual, model_active_set(&model));
        }

        /// Invariant: the snapshot returned by join always contains the
        /// joining user
        #[test]
        fn join_snapshot_contains_user(conn in 0u8..16, user in 0u8..6) {
            let registry = SessionRegistry::new();
            let (tx, _rx) = mpsc::unbounded_channel();
            let conn_id = format!("conn-{conn}");
            let user_id = format!("user-{user}");
            registry.register(conn_id.clone(), tx);

            let snapshot = registry.join(&conn_id, &user_id);
            prop_assert!(snapshot.contains(&user_id));
        }

        /// Invariant: sending to an arbitrary user never panics, even with
        /// no live connections
        #[test]
        fn send_to_user_never_panics(user in "\\PC{0,20}") {
            let registry = SessionRegistry::new();
            registry.send_to_user(&user, ServerEvent::ActiveUsers(vec![]));
        }
    }
}

// ============================================================================
// FRAME PARSING TESTS
// ============================================================================

mod frame_tests {
    use super::*;
    use tether::realtime::ClientEvent;

    proptest! {
        /// Invariant: parsing never panics on arbitrary input
        #[test]
        fn parse_never_panics(s in "\\PC*") {
            let _ = serde_json::from_str::<ClientEvent>(&s);
        }

        /// Invariant: well-formed joinRoom frames always parse to JoinRoom
        #[test]
        fn join_room_roundtrip(user in "[a-zA-Z0-9_-]{1,32}") {
            let frame = format!(r#"{{"event":"joinRoom","data":"{user}"}}"#);
            let event: ClientEvent = serde_json::from_str(&frame).unwrap();
            prop_assert_eq!(event, ClientEvent::JoinRoom(user));
        }

        /// Invariant: sendMessage frames roundtrip through serialization
        #[test]
        fn send_message_roundtrip(
            sender in "[a-z0-9]{1,16}",
            receiver in "[a-z0-9]{1,16}",
            body in "\\PC{1,80}",
        ) {
            let event = ClientEvent::SendMessage(tether::types::NewChatMessage {
                sender_id: sender,
                receiver_id: receiver,
                message: body,
            });
            let json = serde_json::to_string(&event).unwrap();
            let parsed: ClientEvent = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(parsed, event);
        }
    }
}
