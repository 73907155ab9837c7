//! Error types for database operations.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors returned by the persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying sqlx error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration failure.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint conflict on a caller-visible identity.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// Input rejected before touching the database.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A stored value could not be decoded.
    #[error("malformed stored value in {entity}.{column}")]
    Malformed {
        entity: &'static str,
        column: &'static str,
    },
}

impl DatabaseError {
    /// Construct a `NotFound` for `entity` with a display id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
