use thiserror::Error;

/// Errors that can occur when interacting with a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (duplicate email, second cart for
    /// a user).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The storage backend failed for a non-database reason.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
