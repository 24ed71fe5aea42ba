use serde::Deserialize;
use sqlx::types::Uuid;

use tavern_database::{
    Character, ParticipantRole, Repository, RepositoryError, SessionParticipant,
};

use crate::error::conflict_on_duplicate;
use crate::{require_principal, Action, Decision, DomainError, PermissionResolver, Principal};

#[derive(Debug, Deserialize)]
pub struct AddParticipantInput {
    pub user_id: Uuid,
    pub role: Option<ParticipantRole>,
    pub character_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateParticipantInput {
    pub role: Option<ParticipantRole>,
    pub character_id: Option<Uuid>,
}

/// The character brought into a session must exist, belong to the enrolled
/// user, and not already sit in a different session.
async fn check_enrollment_character(
    repo: &dyn Repository,
    op: &str,
    session_id: Uuid,
    target_user: Uuid,
    character_id: Uuid,
) -> Result<Character, DomainError> {
    let character = repo
        .find_character(character_id)
        .await?
        .ok_or(DomainError::NotFound("character"))?;

    if character.owner_id != target_user {
        return Err(DomainError::Validation(format!(
            "[{op}] character does not belong to the enrolled user"
        )));
    }
    if character
        .session_id
        .is_some_and(|attached| attached != session_id)
    {
        return Err(DomainError::Validation(format!(
            "[{op}] character is already attached to another session"
        )));
    }
    Ok(character)
}

pub async fn add_participant(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
    input: AddParticipantInput,
) -> Result<SessionParticipant, DomainError> {
    let principal = require_principal(principal)?;
    let session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;
    repo.find_user(input.user_id)
        .await?
        .ok_or(DomainError::NotFound("user"))?;

    let decision = PermissionResolver::new(repo)
        .decide(
            Some(principal),
            Action::AddParticipant {
                session: &session,
                target_user: input.user_id,
            },
        )
        .await?;

    let role = match decision {
        Decision::Allow => input.role.unwrap_or(ParticipantRole::Player),
        // the resolver narrowed the role; whatever was requested is ignored
        Decision::AllowAsRole(forced) => forced,
        Decision::Deny(reason) => return Err(reason.into()),
    };

    if let Some(character_id) = input.character_id {
        check_enrollment_character(
            repo,
            "add_participant",
            session.id,
            input.user_id,
            character_id,
        )
        .await?;
    }

    let row = SessionParticipant::new(session.id, input.user_id, input.character_id, role);
    repo.enroll_participant(row).await.map_err(conflict_on_duplicate)
}

pub async fn update_participant(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
    target_user: Uuid,
    input: UpdateParticipantInput,
) -> Result<SessionParticipant, DomainError> {
    let principal = require_principal(principal)?;
    let session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;
    let mut row = repo
        .find_participant(session.id, target_user)
        .await?
        .ok_or(DomainError::NotFound("participant"))?;

    PermissionResolver::new(repo)
        .decide(
            Some(principal),
            Action::UpdateParticipantRole { session: &session },
        )
        .await?
        .require()?;

    if let Some(role) = input.role {
        row.role = role;
    }
    if let Some(character_id) = input.character_id {
        check_enrollment_character(
            repo,
            "update_participant",
            session.id,
            target_user,
            character_id,
        )
        .await?;
        row.character_id = Some(character_id);
    }

    Ok(repo.update_participant(row).await?)
}

pub async fn remove_participant(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
    target_user: Uuid,
) -> Result<(), DomainError> {
    let principal = require_principal(principal)?;
    let session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;
    repo.find_participant(session.id, target_user)
        .await?
        .ok_or(DomainError::NotFound("participant"))?;

    PermissionResolver::new(repo)
        .decide(
            Some(principal),
            Action::RemoveParticipant {
                session: &session,
                target_user,
            },
        )
        .await?
        .require()?;

    match repo.remove_participant(session.id, target_user).await {
        Ok(()) => Ok(()),
        // raced with another removal; the row is gone either way
        Err(RepositoryError::RowNotFound { .. }) => Err(DomainError::NotFound("participant")),
        Err(other) => Err(other.into()),
    }
}

pub async fn list_participants(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
) -> Result<Vec<SessionParticipant>, DomainError> {
    let principal = require_principal(principal)?;
    let session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;

    PermissionResolver::new(repo)
        .decide(
            Some(principal),
            Action::ViewParticipants { session: &session },
        )
        .await?
        .require()?;

    Ok(repo.list_participants(session.id).await?)
}
