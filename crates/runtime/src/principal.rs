use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use tavern_database::User;

use crate::DomainError;

/// The acting identity of a request, resolved from a verified credential.
/// Absent principal = anonymous caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Principal::from(&user)
    }
}

pub fn require_principal(principal: Option<&Principal>) -> Result<&Principal, DomainError> {
    principal.ok_or(DomainError::Unauthenticated)
}
