use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column failed to serialize or deserialize.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A referenced row no longer exists (e.g. a schedule's job plan).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
