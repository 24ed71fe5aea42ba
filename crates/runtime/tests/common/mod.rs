use sqlx::types::Uuid;

use tavern_database::{MemoryRepository, ParticipantRole, Repository};
use tavern_runtime::ops;
use tavern_runtime::ops::participants::AddParticipantInput;
use tavern_runtime::ops::sessions::CreateSessionInput;
use tavern_runtime::Principal;

pub fn repo() -> MemoryRepository {
    MemoryRepository::new()
}

pub async fn register(repo: &dyn Repository, name: &str) -> Principal {
    let user = ops::users::register(
        repo,
        ops::users::NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_digest: format!("digest-{name}"),
        },
    )
    .await
    .expect("register user");
    Principal::from(user)
}

pub async fn create_session(repo: &dyn Repository, gm: &Principal, title: &str) -> Uuid {
    ops::sessions::create_session(
        repo,
        Some(gm),
        CreateSessionInput {
            title: title.to_string(),
            description: None,
        },
    )
    .await
    .expect("create session")
    .id
}

pub async fn enroll(
    repo: &dyn Repository,
    actor: &Principal,
    session_id: Uuid,
    target: &Principal,
    role: Option<ParticipantRole>,
) -> Result<ParticipantRole, tavern_runtime::DomainError> {
    ops::participants::add_participant(
        repo,
        Some(actor),
        session_id,
        AddParticipantInput {
            user_id: target.id,
            role,
            character_id: None,
        },
    )
    .await
    .map(|row| row.role)
}
