use serde::Deserialize;
use sqlx::types::Uuid;

use tavern_common::get_current_timestamp;
use tavern_database::{Character, Repository};

use crate::{require_principal, Action, DomainError, PermissionResolver, Principal};

#[derive(Debug, Deserialize)]
pub struct CreateCharacterInput {
    pub name: String,
    pub race: String,
    pub class: String,
}

/// `session_id` distinguishes "absent" (leave alone) from "null" (detach):
/// absent field = no change, explicit null = detach.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCharacterInput {
    pub name: Option<String>,
    pub race: Option<String>,
    pub class: Option<String>,
    pub is_alive: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub session_id: Option<Option<Uuid>>,
}

// serde's Option<Option<T>> needs a small shim to keep "absent" and "null"
// apart in JSON bodies.
fn deserialize_double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required(value: &str, what: &str, op: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("[{op}] {what} is required")));
    }
    Ok(())
}

pub async fn create_character(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    input: CreateCharacterInput,
) -> Result<Character, DomainError> {
    let principal = require_principal(principal)?;
    required(&input.name, "name", "create_character")?;
    required(&input.race, "race", "create_character")?;
    required(&input.class, "class", "create_character")?;

    PermissionResolver::new(repo)
        .decide(Some(principal), Action::CreateCharacter)
        .await?
        .require()?;

    let character = Character::new(
        principal.id,
        input.name.trim().to_string(),
        input.race.trim().to_string(),
        input.class.trim().to_string(),
    );
    Ok(repo.create_character(character).await?)
}

pub async fn get_character(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    character_id: Uuid,
) -> Result<Character, DomainError> {
    let principal = require_principal(principal)?;
    let character = repo
        .find_character(character_id)
        .await?
        .ok_or(DomainError::NotFound("character"))?;

    PermissionResolver::new(repo)
        .decide(
            Some(principal),
            Action::ViewCharacter {
                character: &character,
            },
        )
        .await?
        .require()?;

    Ok(character)
}

pub async fn list_own_characters(
    repo: &dyn Repository,
    principal: Option<&Principal>,
) -> Result<Vec<Character>, DomainError> {
    let principal = require_principal(principal)?;
    Ok(repo.list_characters_by_owner(principal.id).await?)
}

/// Identity fields (name/race/class) and state fields (is_alive,
/// session attachment) sit behind different rules; an update touching
/// both must clear both.
pub async fn update_character(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    character_id: Uuid,
    input: UpdateCharacterInput,
) -> Result<Character, DomainError> {
    let principal = require_principal(principal)?;
    let mut character = repo
        .find_character(character_id)
        .await?
        .ok_or(DomainError::NotFound("character"))?;

    let resolver = PermissionResolver::new(repo);

    let touches_identity =
        input.name.is_some() || input.race.is_some() || input.class.is_some();
    let touches_state = input.is_alive.is_some() || input.session_id.is_some();

    if touches_identity {
        resolver
            .decide(
                Some(principal),
                Action::UpdateCharacterIdentity {
                    character: &character,
                },
            )
            .await?
            .require()?;
    }
    if touches_state {
        resolver
            .decide(
                Some(principal),
                Action::UpdateCharacterState {
                    character: &character,
                },
            )
            .await?
            .require()?;
    }
    if !touches_identity && !touches_state {
        return Err(DomainError::Validation(
            "[update_character] nothing to update".to_string(),
        ));
    }

    if let Some(name) = input.name {
        required(&name, "name", "update_character")?;
        character.name = name.trim().to_string();
    }
    if let Some(race) = input.race {
        required(&race, "race", "update_character")?;
        character.race = race.trim().to_string();
    }
    if let Some(class) = input.class {
        required(&class, "class", "update_character")?;
        character.class = class.trim().to_string();
    }
    if let Some(is_alive) = input.is_alive {
        character.is_alive = is_alive;
    }
    if let Some(session_id) = input.session_id {
        if let Some(target) = session_id {
            repo.find_session(target)
                .await?
                .ok_or(DomainError::NotFound("session"))?;
        }
        character.session_id = session_id;
    }
    character.updated_at = get_current_timestamp();

    Ok(repo.update_character(character).await?)
}

pub async fn delete_character(
    repo: &dyn Repository,
    principal: Option<&Principal>,
    character_id: Uuid,
) -> Result<(), DomainError> {
    let principal = require_principal(principal)?;
    let character = repo
        .find_character(character_id)
        .await?
        .ok_or(DomainError::NotFound("character"))?;

    PermissionResolver::new(repo)
        .decide(
            Some(principal),
            Action::DeleteCharacter {
                character: &character,
            },
        )
        .await?
        .require()?;

    repo.delete_character_cascade(character.id).await?;
    Ok(())
}
