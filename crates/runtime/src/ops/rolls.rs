use serde::Deserialize;
use sqlx::types::Uuid;

use tavern_database::{DiceRoll, Repository};

use crate::{
    require_principal, Action, DiceExpression, DomainError, PermissionResolver, Principal,
};

#[derive(Debug, Deserialize)]
pub struct RollInput {
    pub expression: String,
    pub character_id: Option<Uuid>,
}

/// Rolls for the session and logs the result. Rolls are immutable once
/// written.
pub async fn roll_dice(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
    input: RollInput,
) -> Result<DiceRoll, DomainError> {
    let principal = require_principal(principal)?;
    let session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::RollDice { session: &session })
        .await?
        .require()?;

    let expression = DiceExpression::parse(input.expression.trim())?;

    if let Some(character_id) = input.character_id {
        let character = repo
            .find_character(character_id)
            .await?
            .ok_or(DomainError::NotFound("character"))?;
        if character.session_id != Some(session.id) {
            return Err(DomainError::Validation(
                "[roll_dice] character is not attached to this session".to_string(),
            ));
        }
    }

    let rolled = expression.roll();
    let roll = DiceRoll::new(
        input.expression.trim().to_string(),
        rolled.total,
        rolled.rolls,
        expression.modifier,
        principal.id,
        session.id,
        input.character_id,
    );

    Ok(repo.create_roll(roll).await?)
}

pub async fn list_rolls(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    session_id: Uuid,
) -> Result<Vec<DiceRoll>, DomainError> {
    let principal = require_principal(principal)?;
    let session = repo
        .find_session(session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;

    PermissionResolver::new(repo)
        .decide(
            Some(principal),
            Action::ViewRollHistory { session: &session },
        )
        .await?
        .require()?;

    Ok(repo.list_rolls_by_session(session.id).await?)
}

pub async fn get_roll(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    roll_id: Uuid,
) -> Result<DiceRoll, DomainError> {
    let principal = require_principal(principal)?;
    let roll = repo
        .find_roll(roll_id)
        .await?
        .ok_or(DomainError::NotFound("roll"))?;
    let session = repo
        .find_session(roll.session_id)
        .await?
        .ok_or(DomainError::NotFound("session"))?;

    PermissionResolver::new(repo)
        .decide(
            Some(principal),
            Action::ViewRoll {
                session: &session,
                roll: &roll,
            },
        )
        .await?
        .require()?;

    Ok(roll)
}
