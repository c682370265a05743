//! Database error types.
//!
//! Provides error handling for persistence operations using `thiserror`.

use thiserror::Error;

/// Database-specific errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create database connection.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Database record with provided identifier not found.
    #[error("{0}")]
    NotFoundWithMessage(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(#[from] vendmon_core::ConfigError),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
