use thiserror::Error;

use tavern_database::RepositoryError;

/// Error taxonomy of the resource operations. The HTTP layer maps each
/// variant to a status code; nothing here is retried and nothing is fatal
/// to the process.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Duplicate-key storage errors are conflicts the caller can act on;
/// everything else passes through.
pub(crate) fn conflict_on_duplicate(err: RepositoryError) -> DomainError {
    match err {
        RepositoryError::DuplicateParticipant { .. } | RepositoryError::DuplicateValue { .. } => {
            DomainError::Conflict(err.to_string())
        }
        other => other.into(),
    }
}
