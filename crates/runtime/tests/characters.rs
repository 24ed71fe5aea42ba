mod common;

use anyhow::Result;
use sqlx::types::Uuid;

use tavern_database::{ParticipantRole, Repository};
use tavern_runtime::ops;
use tavern_runtime::ops::characters::{CreateCharacterInput, UpdateCharacterInput};
use tavern_runtime::ops::participants::AddParticipantInput;
use tavern_runtime::{DomainError, Principal};

use common::{create_session, enroll, register, repo};

async fn make_character(
    repo: &dyn Repository,
    owner: &Principal,
    name: &str,
) -> Result<Uuid, DomainError> {
    Ok(ops::characters::create_character(
        repo,
        Some(owner),
        CreateCharacterInput {
            name: name.to_string(),
            race: "human".to_string(),
            class: "wizard".to_string(),
        },
    )
    .await?
    .id)
}

fn rename(name: &str) -> UpdateCharacterInput {
    UpdateCharacterInput {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn creator_owns_and_controls_their_character() -> Result<()> {
    let repo = repo();
    let owner = register(&repo, "alice").await;
    let character_id = make_character(&repo, &owner, "Aldric").await?;

    let character = ops::characters::get_character(&repo, Some(&owner), character_id).await?;
    assert_eq!(character.owner_id, owner.id);
    assert!(character.is_alive);

    let character =
        ops::characters::update_character(&repo, Some(&owner), character_id, rename("Aldric II"))
            .await?;
    assert_eq!(character.name, "Aldric II");
    Ok(())
}

#[tokio::test]
async fn unattached_characters_are_invisible_to_others() -> Result<()> {
    let repo = repo();
    let owner = register(&repo, "alice").await;
    let other = register(&repo, "bob").await;
    let character_id = make_character(&repo, &owner, "Aldric").await?;

    let err = ops::characters::get_character(&repo, Some(&other), character_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn gm_may_touch_state_but_not_identity_of_an_attached_character() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    let character_id = make_character(&repo, &player, "Sylvain").await?;

    ops::participants::add_participant(
        &repo,
        Some(&player),
        session_id,
        AddParticipantInput {
            user_id: player.id,
            role: None,
            character_id: Some(character_id),
        },
    )
    .await?;

    // the GM can see it and mark it dead
    let character = ops::characters::get_character(&repo, Some(&gm), character_id).await?;
    assert_eq!(character.session_id, Some(session_id));

    let character = ops::characters::update_character(
        &repo,
        Some(&gm),
        character_id,
        UpdateCharacterInput {
            is_alive: Some(false),
            ..Default::default()
        },
    )
    .await?;
    assert!(!character.is_alive);

    // but renaming someone else's character needs owner or session admin
    let err = ops::characters::update_character(&repo, Some(&gm), character_id, rename("Bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn session_admin_may_rewrite_identity_of_an_attached_character() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let admin = register(&repo, "carol").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    let character_id = make_character(&repo, &player, "Sylvain").await?;

    ops::participants::add_participant(
        &repo,
        Some(&player),
        session_id,
        AddParticipantInput {
            user_id: player.id,
            role: None,
            character_id: Some(character_id),
        },
    )
    .await?;
    enroll(&repo, &gm, session_id, &admin, Some(ParticipantRole::Admin)).await?;

    let character =
        ops::characters::update_character(&repo, Some(&admin), character_id, rename("Sylvain le Brave"))
            .await?;
    assert_eq!(character.name, "Sylvain le Brave");
    Ok(())
}

#[tokio::test]
async fn delete_needs_owner_or_system_wide_admin() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let admin = register(&repo, "carol").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    let character_id = make_character(&repo, &player, "Sylvain").await?;

    ops::participants::add_participant(
        &repo,
        Some(&player),
        session_id,
        AddParticipantInput {
            user_id: player.id,
            role: None,
            character_id: Some(character_id),
        },
    )
    .await?;

    // the GM, session-scoped though they are, may NOT delete (asymmetric
    // with update, preserved deliberately)
    let err = ops::characters::delete_character(&repo, Some(&gm), character_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // an admin from a completely unrelated session may
    let dave = register(&repo, "dave").await;
    let elsewhere = create_session(&repo, &dave, "Side Quest").await;
    enroll(&repo, &dave, elsewhere, &admin, Some(ParticipantRole::Admin)).await?;

    ops::characters::delete_character(&repo, Some(&admin), character_id).await?;
    assert!(repo.find_character(character_id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn deleting_a_character_nulls_references() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    let character_id = make_character(&repo, &player, "Sylvain").await?;

    ops::participants::add_participant(
        &repo,
        Some(&player),
        session_id,
        AddParticipantInput {
            user_id: player.id,
            role: None,
            character_id: Some(character_id),
        },
    )
    .await?;
    let roll = ops::rolls::roll_dice(
        &repo,
        Some(&player),
        session_id,
        tavern_runtime::ops::rolls::RollInput {
            expression: "1d20".to_string(),
            character_id: Some(character_id),
        },
    )
    .await?;

    ops::characters::delete_character(&repo, Some(&player), character_id).await?;

    let roll = repo.find_roll(roll.id).await?.unwrap();
    assert_eq!(roll.character_id, None);
    let row = repo.find_participant(session_id, player.id).await?.unwrap();
    assert_eq!(row.character_id, None);
    Ok(())
}

#[tokio::test]
async fn character_identity_fields_must_not_be_blank() -> Result<()> {
    let repo = repo();
    let owner = register(&repo, "alice").await;

    let err = ops::characters::create_character(
        &repo,
        Some(&owner),
        CreateCharacterInput {
            name: "".to_string(),
            race: "human".to_string(),
            class: "wizard".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let character_id = make_character(&repo, &owner, "Aldric").await?;
    let err = ops::characters::update_character(&repo, Some(&owner), character_id, rename("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn enrollment_character_must_belong_to_the_enrolled_user() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    let foreign_character = make_character(&repo, &gm, "Notmine").await?;

    let err = ops::participants::add_participant(
        &repo,
        Some(&player),
        session_id,
        AddParticipantInput {
            user_id: player.id,
            role: None,
            character_id: Some(foreign_character),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    Ok(())
}
