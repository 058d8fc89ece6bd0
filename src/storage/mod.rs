//! Storage layer: SQLite store plus the gateway contracts the realtime
//! router operates through.

pub mod connection;
pub mod gateway;
pub mod migrations;
pub mod queries;
pub mod sqlite;

pub use connection::Store;
pub use gateway::{ConnectionGraphGateway, MessageGateway, NotificationGateway};
pub use sqlite::SqliteStore;
