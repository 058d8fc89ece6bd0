//! Database queries for users, messages and notifications

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::error::{Result, TetherError};
use crate::types::{
    ChatMessage, NewChatMessage, NewNotification, Notification, NotificationId, UserId, UserRecord,
};

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a chat message from a database row
pub fn message_from_row(row: &Row) -> rusqlite::Result<ChatMessage> {
    let created_at: String = row.get("created_at")?;
    Ok(ChatMessage {
        id: row.get("id")?,
        sender_id: row.get("sender_id")?,
        receiver_id: row.get("receiver_id")?,
        message: row.get("message")?,
        created_at: parse_timestamp(&created_at),
    })
}

/// Parse a notification from a database row
pub fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    let created_at: String = row.get("created_at")?;
    let is_read: i32 = row.get("is_read")?;
    Ok(Notification {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        sender_id: row.get("sender_id")?,
        message: row.get("message")?,
        is_read: is_read != 0,
        created_at: parse_timestamp(&created_at),
    })
}

// ============================================================================
// User records
// ============================================================================

/// Fetch a user record by id, including both edge sets
pub fn get_user(conn: &Connection, id: &str) -> Result<UserRecord> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, email, display_name, photo_url FROM users WHERE id = ?",
    )?;

    let mut user = stmt
        .query_row(params![id], |row| {
            Ok(UserRecord {
                id: row.get("id")?,
                email: row.get("email")?,
                display_name: row.get("display_name")?,
                photo_url: row.get("photo_url")?,
                connections: Vec::new(),
                connection_requests: Vec::new(),
            })
        })
        .map_err(|_| TetherError::UserNotFound(id.to_string()))?;

    user.connections = load_edges(conn, "user_connections", "peer_id", id)?;
    user.connection_requests = load_edges(conn, "connection_requests", "sender_id", id)?;

    Ok(user)
}

fn load_edges(conn: &Connection, table: &str, column: &str, user_id: &str) -> Result<Vec<UserId>> {
    // table/column names are compile-time constants, never user input
    let sql = format!("SELECT {column} FROM {table} WHERE user_id = ? ORDER BY rowid");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Upsert a whole user record, replacing both edge sets
///
/// Callers are expected to run this inside a transaction so the profile
/// row and the edge tables move together.
pub fn upsert_user(conn: &Connection, user: &UserRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, display_name, photo_url)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            email = excluded.email,
            display_name = excluded.display_name,
            photo_url = excluded.photo_url",
        params![user.id, user.email, user.display_name, user.photo_url],
    )?;

    conn.execute(
        "DELETE FROM user_connections WHERE user_id = ?",
        params![user.id],
    )?;
    let mut insert_conn = conn.prepare_cached(
        "INSERT OR IGNORE INTO user_connections (user_id, peer_id) VALUES (?1, ?2)",
    )?;
    for peer in &user.connections {
        insert_conn.execute(params![user.id, peer])?;
    }

    conn.execute(
        "DELETE FROM connection_requests WHERE user_id = ?",
        params![user.id],
    )?;
    let mut insert_req = conn.prepare_cached(
        "INSERT OR IGNORE INTO connection_requests (user_id, sender_id) VALUES (?1, ?2)",
    )?;
    for sender in &user.connection_requests {
        insert_req.execute(params![user.id, sender])?;
    }

    Ok(())
}

// ============================================================================
// Chat messages
// ============================================================================

/// Persist a new chat message and return the stored record
pub fn create_message(conn: &Connection, input: &NewChatMessage) -> Result<ChatMessage> {
    let now = Utc::now();

    conn.execute(
        "INSERT INTO messages (sender_id, receiver_id, message, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            input.sender_id,
            input.receiver_id,
            input.message,
            now.to_rfc3339()
        ],
    )?;

    Ok(ChatMessage {
        id: conn.last_insert_rowid(),
        sender_id: input.sender_id.clone(),
        receiver_id: input.receiver_id.clone(),
        message: input.message.clone(),
        created_at: now,
    })
}

/// Fetch a chat message by id
pub fn get_message(conn: &Connection, id: i64) -> Result<ChatMessage> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, sender_id, receiver_id, message, created_at FROM messages WHERE id = ?",
    )?;
    stmt.query_row(params![id], message_from_row)
        .map_err(TetherError::Database)
}

// ============================================================================
// Notifications
// ============================================================================

/// Persist a new notification (unread) and return the stored record
pub fn create_notification(conn: &Connection, input: &NewNotification) -> Result<Notification> {
    let now = Utc::now();

    conn.execute(
        "INSERT INTO notifications (user_id, sender_id, message, is_read, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![
            input.user_id,
            input.sender_id,
            input.message,
            now.to_rfc3339()
        ],
    )?;

    Ok(Notification {
        id: conn.last_insert_rowid(),
        user_id: input.user_id.clone(),
        sender_id: input.sender_id.clone(),
        message: input.message.clone(),
        is_read: false,
        created_at: now,
    })
}

/// Mark every notification with the given target/origin pair as read.
/// Returns the number of rows updated.
pub fn mark_notifications_read(conn: &Connection, user_id: &str, sender_id: &str) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND sender_id = ?2",
        params![user_id, sender_id],
    )?;
    Ok(updated)
}

/// Delete every notification with the given target/origin pair.
/// Returns the number of rows deleted.
pub fn delete_notifications(conn: &Connection, user_id: &str, sender_id: &str) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM notifications WHERE user_id = ?1 AND sender_id = ?2",
        params![user_id, sender_id],
    )?;
    Ok(deleted)
}

/// List notifications targeted at a user, newest first
pub fn list_notifications(conn: &Connection, user_id: &str) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, user_id, sender_id, message, is_read, created_at
         FROM notifications WHERE user_id = ? ORDER BY id DESC",
    )?;
    let rows = stmt.query_map(params![user_id], notification_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Fetch a single notification by id
pub fn get_notification(conn: &Connection, id: NotificationId) -> Result<Notification> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, user_id, sender_id, message, is_read, created_at
         FROM notifications WHERE id = ?",
    )?;
    stmt.query_row(params![id], notification_from_row)
        .map_err(TetherError::Database)
}
