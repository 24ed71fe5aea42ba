use sqlx::types::Uuid;
use thiserror::Error;

/// Storage-level errors. Anything the caller can act on gets its own
/// variant; the rest is carried through from sqlx.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("user {user_id} is already enrolled in session {session_id}")]
    DuplicateParticipant { session_id: Uuid, user_id: Uuid },

    #[error("duplicate {field}: {value}")]
    DuplicateValue { field: &'static str, value: String },

    #[error("{entity} {id} not found")]
    RowNotFound { entity: &'static str, id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
