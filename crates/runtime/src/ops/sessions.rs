use serde::Deserialize;
use sqlx::types::Uuid;

use tavern_common::get_current_timestamp;
use tavern_database::{GameSession, ParticipantRole, Repository, SessionParticipant};

use crate::{require_principal, Action, DomainError, PermissionResolver, Principal};

#[derive(Debug, Deserialize)]
pub struct CreateSessionInput {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSessionInput {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Creates the session and enrolls its creator as game-master ("mj") in
/// one unit.
pub async fn create_session(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    input: CreateSessionInput,
) -> Result<GameSession, DomainError> {
    let principal = require_principal(principal)?;
    if input.title.trim().is_empty() {
        return Err(DomainError::Validation(
            "[create_session] title is required".to_string(),
        ));
    }

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::CreateSession)
        .await?
        .require()?;

    let session = GameSession::new(
        principal.id,
        input.title.trim().to_string(),
        input.description,
    );
    let gm_row = SessionParticipant::new(
        session.id,
        principal.id,
        None,
        ParticipantRole::GameMaster,
    );

    Ok(repo.create_session_with_gm(session, gm_row).await?)
}

/// Open to anonymous callers, deliberately (the list endpoint is not).
pub async fn get_session(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
) -> Result<GameSession, DomainError> {
    let session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;

    PermissionResolver::new(repo)
        .decide(principal, Action::ViewSession { session: &session })
        .await?
        .require()?;

    Ok(session)
}

pub async fn list_sessions(
    repo: &dyn Repository,
    principal: Option<&Principal>,
) -> Result<Vec<GameSession>, DomainError> {
    PermissionResolver::new(repo)
        .decide(principal, Action::ListSessions)
        .await?
        .require()?;

    Ok(repo.list_sessions().await?)
}

pub async fn update_session(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
    input: UpdateSessionInput,
) -> Result<GameSession, DomainError> {
    let principal = require_principal(principal)?;
    let mut session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::UpdateSession { session: &session })
        .await?
        .require()?;

    if let Some(title) = input.title {
        if title.trim().is_empty() {
            return Err(DomainError::Validation(
                "[update_session] title is required".to_string(),
            ));
        }
        session.title = title.trim().to_string();
    }
    if let Some(description) = input.description {
        session.description = Some(description);
    }
    session.updated_at = get_current_timestamp();

    Ok(repo.update_session(session).await?)
}

pub async fn delete_session(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
) -> Result<(), DomainError> {
    let principal = require_principal(principal)?;
    let session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::DeleteSession { session: &session })
        .await?
        .require()?;

    repo.delete_session_cascade(session.id).await?;
    Ok(())
}
