mod common;

use anyhow::Result;

use tavern_database::{ParticipantRole, Repository};
use tavern_runtime::ops;
use tavern_runtime::ops::rolls::RollInput;
use tavern_runtime::DomainError;

use common::{create_session, enroll, register, repo};

fn roll(expression: &str) -> RollInput {
    RollInput {
        expression: expression.to_string(),
        character_id: None,
    }
}

#[tokio::test]
async fn participants_and_gm_may_roll_strangers_may_not() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let outsider = register(&repo, "carol").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    enroll(&repo, &player, session_id, &player, None).await?;

    assert!(ops::rolls::roll_dice(&repo, Some(&gm), session_id, roll("1d20"))
        .await
        .is_ok());
    assert!(
        ops::rolls::roll_dice(&repo, Some(&player), session_id, roll("2d6+3"))
            .await
            .is_ok()
    );

    let err = ops::rolls::roll_dice(&repo, Some(&outsider), session_id, roll("1d20"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn a_logged_roll_is_consistent_with_its_expression() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;

    let logged = ops::rolls::roll_dice(&repo, Some(&gm), session_id, roll("4d10-2")).await?;

    assert_eq!(logged.expression, "4d10-2");
    assert_eq!(logged.modifier, -2);
    assert_eq!(logged.rolls.len(), 4);
    assert!(logged.rolls.iter().all(|&die| (1..=10).contains(&die)));
    assert_eq!(logged.result, logged.rolls.iter().sum::<i64>() - 2);
    assert_eq!(logged.user_id, gm.id);
    assert_eq!(logged.session_id, session_id);
    Ok(())
}

#[tokio::test]
async fn malformed_expressions_are_rejected_before_anything_is_written() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;

    for bad in ["", "d20", "2d", "0d6", "2d0", "1d6+", "abc", "2d6~1"] {
        let err = ops::rolls::roll_dice(&repo, Some(&gm), session_id, roll(bad))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)), "accepted {bad:?}");
    }
    assert!(repo.list_rolls_by_session(session_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn a_thousand_3d8_rolls_stay_in_bounds_with_a_sane_mean() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;

    let mut total = 0i64;
    for _ in 0..1000 {
        let logged =
            ops::rolls::roll_dice(&repo, Some(&gm), session_id, roll("3d8")).await?;
        assert!((3..=24).contains(&logged.result));
        total += logged.result;
    }

    // E[3d8] = 13.5; the mean of 1000 samples has a stddev of about 0.13,
    // so a band of 1.5 either way is far beyond any plausible flake
    let mean = total as f64 / 1000.0;
    assert!((12.0..=15.0).contains(&mean), "suspicious mean {mean}");
    Ok(())
}

#[tokio::test]
async fn roll_history_visibility_follows_the_rule_table() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let admin = register(&repo, "carol").await;
    let outsider = register(&repo, "dave").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    enroll(&repo, &player, session_id, &player, None).await?;
    enroll(&repo, &gm, session_id, &admin, Some(ParticipantRole::Admin)).await?;

    ops::rolls::roll_dice(&repo, Some(&player), session_id, roll("2d6")).await?;

    for viewer in [&gm, &player, &admin] {
        assert_eq!(
            ops::rolls::list_rolls(&repo, Some(viewer), session_id).await?.len(),
            1
        );
    }
    let err = ops::rolls::list_rolls(&repo, Some(&outsider), session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn a_roller_keeps_access_to_their_own_roll_after_leaving() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    enroll(&repo, &player, session_id, &player, None).await?;

    let logged = ops::rolls::roll_dice(&repo, Some(&player), session_id, roll("1d6")).await?;
    ops::participants::remove_participant(&repo, Some(&player), session_id, player.id).await?;

    // no longer a participant, still the roll's author
    let fetched = ops::rolls::get_roll(&repo, Some(&player), logged.id).await?;
    assert_eq!(fetched.id, logged.id);

    // a third party with no ties gets nothing
    let outsider = register(&repo, "carol").await;
    let err = ops::rolls::get_roll(&repo, Some(&outsider), logged.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn rolling_with_a_character_requires_it_in_the_session() -> Result<()> {
    let repo = repo();
    let gm = register(&repo, "alice").await;
    let player = register(&repo, "bob").await;
    let session_id = create_session(&repo, &gm, "Dragon Hunt").await;
    enroll(&repo, &player, session_id, &player, None).await?;

    let stray = ops::characters::create_character(
        &repo,
        Some(&player),
        tavern_runtime::ops::characters::CreateCharacterInput {
            name: "Sylvain".to_string(),
            race: "elf".to_string(),
            class: "ranger".to_string(),
        },
    )
    .await?;

    let err = ops::rolls::roll_dice(
        &repo,
        Some(&player),
        session_id,
        RollInput {
            expression: "1d6".to_string(),
            character_id: Some(stray.id),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    Ok(())
}
