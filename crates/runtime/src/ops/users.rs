use serde::Deserialize;
use sqlx::types::Uuid;

use tavern_database::{Repository, User};

use crate::error::conflict_on_duplicate;
use crate::{require_principal, Action, DomainError, PermissionResolver, Principal};

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_digest: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(skip)]
    pub password_digest: Option<String>,
}

fn required(value: &str, what: &str, op: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("[{op}] {what} is required")));
    }
    Ok(())
}

/// Open operation: anyone may register. Uniqueness of username and email
/// surfaces as a conflict.
pub async fn register(repo: &dyn Repository, input: NewUser) -> Result<User, DomainError> {
    required(&input.username, "username", "register")?;
    required(&input.email, "email", "register")?;
    if input.password_digest.is_empty() {
        return Err(DomainError::Validation(
            "[register] password is required".to_string(),
        ));
    }

    repo.create_user(User::new(
        input.username.trim().to_string(),
        input.email.trim().to_string(),
        input.password_digest,
    ))
    .await
    .map_err(conflict_on_duplicate)
}

pub async fn get_user(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    user_id: Uuid,
) -> Result<User, DomainError> {
    let principal = require_principal(principal)?;
    let user = repo
        .find_user(user_id)
        .await?
        .ok_or(DomainError::NotFound("user"))?;

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::ViewUser { target: user.id })
        .await?
        .require()?;

    Ok(user)
}

pub async fn list_users(
    repo: &dyn Repository,
    principal: Option<&Principal>,
) -> Result<Vec<User>, DomainError> {
    let principal = require_principal(principal)?;

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::ListUsers)
        .await?
        .require()?;

    Ok(repo.list_users().await?)
}

pub async fn update_user(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    user_id: Uuid,
    input: UpdateUserInput,
) -> Result<User, DomainError> {
    let principal = require_principal(principal)?;
    let mut user = repo
        .find_user(user_id)
        .await?
        .ok_or(DomainError::NotFound("user"))?;

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::UpdateUser { target: user.id })
        .await?
        .require()?;

    if let Some(username) = input.username {
        required(&username, "username", "update_user")?;
        user.username = username.trim().to_string();
    }
    if let Some(email) = input.email {
        required(&email, "email", "update_user")?;
        user.email = email.trim().to_string();
    }
    if let Some(password_digest) = input.password_digest {
        user.password_digest = password_digest;
    }

    repo.update_user(user).await.map_err(conflict_on_duplicate)
}

/// Removes the account and everything that depends on it, sessions the
/// user runs included.
pub async fn delete_user(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    user_id: Uuid,
) -> Result<(), DomainError> {
    let principal = require_principal(principal)?;
    let user = repo
        .find_user(user_id)
        .await?
        .ok_or(DomainError::NotFound("user"))?;

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::DeleteUser { target: user.id })
        .await?
        .require()?;

    repo.delete_user_cascade(user.id).await?;
    Ok(())
}
