//! Tether - Real-time presence and messaging core
//!
//! Tracks which users are online, routes direct messages between users,
//! and drives the connection-request workflow (request, accept/reject,
//! notification) with live delivery to connected client sessions.

pub mod error;
pub mod realtime;
pub mod storage;
pub mod types;

pub use error::{Result, TetherError};
pub use storage::SqliteStore;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
