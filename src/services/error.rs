use thiserror::Error;

use crate::application::error::ApplicationError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Corrupt blob {blob_id}: {reason}")]
    CorruptBlob { blob_id: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<StorageError> for ApplicationError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Database(msg) => ApplicationError::DatabaseError(msg),
            other => ApplicationError::InternalError(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => StorageError::NotFound("no matching row".to_string()),
            other => StorageError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serialization(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token rejected: {0}")]
    Rejected(String),

    #[error("Login service unavailable: {0}")]
    Unavailable(String),
}

impl From<AuthError> for ApplicationError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Rejected(_) => ApplicationError::Unauthorized(error.to_string()),
            AuthError::Unavailable(_) => ApplicationError::InternalError(error.to_string()),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AuthError::Unavailable("Request timeout".to_string())
        } else if error.is_connect() {
            AuthError::Unavailable(format!("Connection failed: {}", error))
        } else {
            AuthError::Unavailable(error.to_string())
        }
    }
}
