//! Error types for Tether

use thiserror::Error;

/// Result type alias for Tether operations
pub type Result<T> = std::result::Result<T, TetherError>;

/// Main error type for Tether
#[derive(Error, Debug)]
pub enum TetherError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TetherError {
    /// Check if the failure is client-correctable (bad input, unknown user)
    /// as opposed to a store-side fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TetherError::UserNotFound(_) | TetherError::InvalidPayload(_)
        )
    }
}
