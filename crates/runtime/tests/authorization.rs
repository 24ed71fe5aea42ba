mod common;

use anyhow::Result;
use sqlx::types::Uuid;

use tavern_database::{ParticipantRole, Repository};
use tavern_runtime::ops;
use tavern_runtime::ops::participants::UpdateParticipantInput;
use tavern_runtime::{Action, Decision, DenyReason, DomainError, PermissionResolver};

use common::{create_session, enroll, register, repo};

#[tokio::test]
async fn gm_may_update_and_delete_their_session() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    let session = repo.find_session(session_id).await?.unwrap();

    let resolver = PermissionResolver::new(&repo);
    assert_eq!(
        resolver
            .decide(Some(&gm), Action::UpdateSession { session: &session })
            .await?,
        Decision::Allow
    );
    assert_eq!(
        resolver
            .decide(Some(&gm), Action::DeleteSession { session: &session })
            .await?,
        Decision::Allow
    );
    Ok(())
}

#[tokio::test]
async fn session_admin_matches_gm_privilege_for_that_session_only() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let admin = register(&repo, "bob").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    let other_id = create_session(&repo, &register(&repo, "carol").await, "Side Quest").await;

    enroll(&repo, &gm, session_id, &admin, Some(ParticipantRole::Admin)).await?;

    let session = repo.find_session(session_id).await?.unwrap();
    let other = repo.find_session(other_id).await?.unwrap();

    let resolver = PermissionResolver::new(&repo);
    assert_eq!(
        resolver
            .decide(Some(&admin), Action::DeleteSession { session: &session })
            .await?,
        Decision::Allow
    );
    // the grant is scoped: no standing in the other session
    assert!(matches!(
        resolver
            .decide(Some(&admin), Action::UpdateSession { session: &other })
            .await?,
        Decision::Deny(DenyReason::Forbidden(_))
    ));
    Ok(())
}

#[tokio::test]
async fn self_enrollment_is_always_downgraded_to_player() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let joiner = register(&repo, "bob").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;

    let stored = enroll(
        &repo,
        &joiner,
        session_id,
        &joiner,
        Some(ParticipantRole::Admin),
    )
    .await?;
    assert_eq!(stored, ParticipantRole::Player);
    Ok(())
}

#[tokio::test]
async fn gm_enrolling_someone_else_keeps_the_requested_role() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let other = register(&repo, "bob").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;

    let stored = enroll(&repo, &gm, session_id, &other, Some(ParticipantRole::Admin)).await?;
    assert_eq!(stored, ParticipantRole::Admin);
    Ok(())
}

#[tokio::test]
async fn stranger_cannot_enroll_someone_else() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let stranger = register(&repo, "bob").await;
    let target = register(&repo, "carol").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;

    let err = enroll(&repo, &stranger, session_id, &target, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn participant_may_always_leave_but_not_remove_others() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let other = register(&repo, "carol").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;

    enroll(&repo, &player, session_id, &player, None).await?;
    enroll(&repo, &other, session_id, &other, None).await?;

    let err = ops::participants::remove_participant(&repo, Some(&player), session_id, other.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    ops::participants::remove_participant(&repo, Some(&player), session_id, player.id).await?;
    assert!(repo.find_participant(session_id, player.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn view_session_is_open_to_anonymous_but_listing_is_not() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;

    let session = ops::sessions::get_session(&repo, None, session_id).await?;
    assert_eq!(session.id, session_id);

    let err = ops::sessions::list_sessions(&repo, None).await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthenticated));
    Ok(())
}

#[tokio::test]
async fn participants_and_history_are_members_only() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let outsider = register(&repo, "carol").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    enroll(&repo, &player, session_id, &player, None).await?;

    assert!(
        ops::participants::list_participants(&repo, Some(&player), session_id)
            .await
            .is_ok()
    );
    let err = ops::participants::list_participants(&repo, Some(&outsider), session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let err = ops::rolls::list_rolls(&repo, Some(&outsider), session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn full_promotion_scenario() -> Result<()> {
    let repo = repo();
    let a = register(&repo, "alice").await;
    let b = register(&repo, "bob").await;

    // A creates the session and is auto-enrolled as game-master
    let session_id = create_session(&repo, &a, "Dragon Hunt").await;
    let gm_row = repo.find_participant(session_id, a.id).await?.unwrap();
    assert_eq!(gm_row.role, ParticipantRole::GameMaster);

    // B self-enrolls asking for admin, gets player
    let stored = enroll(&repo, &b, session_id, &b, Some(ParticipantRole::Admin)).await?;
    assert_eq!(stored, ParticipantRole::Player);

    // B cannot promote themselves
    let err = ops::participants::update_participant(
        &repo,
        Some(&b),
        session_id,
        b.id,
        UpdateParticipantInput {
            role: Some(ParticipantRole::Admin),
            character_id: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // A promotes B
    let row = ops::participants::update_participant(
        &repo,
        Some(&a),
        session_id,
        b.id,
        UpdateParticipantInput {
            role: Some(ParticipantRole::Admin),
            character_id: None,
        },
    )
    .await?;
    assert_eq!(row.role, ParticipantRole::Admin);

    // and B, now session admin, may delete the session
    ops::sessions::delete_session(&repo, Some(&b), session_id).await?;
    assert!(repo.find_session(session_id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn user_management_is_self_or_system_admin() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let admin = register(&repo, "bob").await;
    let nobody = register(&repo, "carol").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    enroll(&repo, &gm, session_id, &admin, Some(ParticipantRole::Admin)).await?;

    // self view always works
    assert!(ops::users::get_user(&repo, Some(&nobody), nobody.id)
        .await
        .is_ok());
    // a plain user cannot look at someone else's account
    let err = ops::users::get_user(&repo, Some(&nobody), gm.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    // but a session admin anywhere is a system admin for user management
    assert!(ops::users::get_user(&repo, Some(&admin), gm.id).await.is_ok());

    let err = ops::users::list_users(&repo, Some(&nobody)).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    assert_eq!(ops::users::list_users(&repo, Some(&admin)).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn decisions_check_existence_before_permission() -> Result<()> {
    let repo = repo();
    let someone = register(&repo, "alice").await;

    // a missing session is a 404, not a 403, whoever asks
    let err = ops::sessions::update_session(
        &repo,
        Some(&someone),
        Uuid::new_v4(),
        Default::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("session")));
    Ok(())
}
