use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::types::Uuid;
use tokio::sync::RwLock;

use crate::{
    Character, DiceRoll, GameSession, ParticipantRole, Repository, RepositoryError,
    RepositoryResult, SessionParticipant, User,
};

/// In-memory implementation of [`Repository`], used by the test suites and
/// by local development without a database.
///
/// One `RwLock` guards all tables; every compound mutation runs under a
/// single write-lock hold, which is what makes enrollment uniqueness and
/// the cascading deletes atomic here.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, GameSession>,
    participants: HashMap<Uuid, SessionParticipant>,
    characters: HashMap<Uuid, Character>,
    rolls: HashMap<Uuid, DiceRoll>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

fn delete_session_rows(tables: &mut Tables, session_id: Uuid) {
    tables.participants.retain(|_, p| p.session_id != session_id);
    tables.rolls.retain(|_, r| r.session_id != session_id);
    for character in tables.characters.values_mut() {
        if character.session_id == Some(session_id) {
            character.session_id = None;
        }
    }
    tables.sessions.remove(&session_id);
}

fn delete_character_rows(tables: &mut Tables, character_id: Uuid) {
    for roll in tables.rolls.values_mut() {
        if roll.character_id == Some(character_id) {
            roll.character_id = None;
        }
    }
    for participant in tables.participants.values_mut() {
        if participant.character_id == Some(character_id) {
            participant.character_id = None;
        }
    }
    tables.characters.remove(&character_id);
}

fn attach_character(tables: &mut Tables, character_id: Uuid, session_id: Uuid) {
    if let Some(character) = tables.characters.get_mut(&character_id) {
        character.session_id = Some(session_id);
    }
}

fn detach_character(tables: &mut Tables, character_id: Uuid) {
    if let Some(character) = tables.characters.get_mut(&character_id) {
        character.session_id = None;
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: User) -> RepositoryResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::DuplicateValue {
                field: "username",
                value: user.username,
            });
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::DuplicateValue {
                field: "email",
                value: user.email,
            });
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn update_user(&self, user: User) -> RepositoryResult<User> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(RepositoryError::RowNotFound {
                entity: "user",
                id: user.id,
            });
        }
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(RepositoryError::DuplicateValue {
                field: "username",
                value: user.username,
            });
        }
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(RepositoryError::DuplicateValue {
                field: "email",
                value: user.email,
            });
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user_cascade(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(RepositoryError::RowNotFound { entity: "user", id });
        }

        let gm_sessions: Vec<Uuid> = tables
            .sessions
            .values()
            .filter(|s| s.gm_id == id)
            .map(|s| s.id)
            .collect();
        for session_id in gm_sessions {
            delete_session_rows(&mut tables, session_id);
        }

        let enrolled_characters: Vec<Uuid> = tables
            .participants
            .values()
            .filter(|p| p.user_id == id)
            .filter_map(|p| p.character_id)
            .collect();
        for character_id in enrolled_characters {
            detach_character(&mut tables, character_id);
        }
        tables.participants.retain(|_, p| p.user_id != id);
        tables.rolls.retain(|_, r| r.user_id != id);

        let owned: Vec<Uuid> = tables
            .characters
            .values()
            .filter(|c| c.owner_id == id)
            .map(|c| c.id)
            .collect();
        for character_id in owned {
            delete_character_rows(&mut tables, character_id);
        }

        tables.users.remove(&id);
        Ok(())
    }

    async fn create_session_with_gm(
        &self,
        session: GameSession,
        gm_row: SessionParticipant,
    ) -> RepositoryResult<GameSession> {
        let mut tables = self.tables.write().await;
        tables.sessions.insert(session.id, session.clone());
        tables.participants.insert(gm_row.id, gm_row);
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> RepositoryResult<Option<GameSession>> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn list_sessions(&self) -> RepositoryResult<Vec<GameSession>> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<GameSession> = tables.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| (s.created_at, s.id));
        Ok(sessions)
    }

    async fn update_session(&self, session: GameSession) -> RepositoryResult<GameSession> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(&session.id) {
            return Err(RepositoryError::RowNotFound {
                entity: "session",
                id: session.id,
            });
        }
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn delete_session_cascade(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(&id) {
            return Err(RepositoryError::RowNotFound {
                entity: "session",
                id,
            });
        }
        delete_session_rows(&mut tables, id);
        Ok(())
    }

    async fn enroll_participant(
        &self,
        row: SessionParticipant,
    ) -> RepositoryResult<SessionParticipant> {
        let mut tables = self.tables.write().await;
        if tables
            .participants
            .values()
            .any(|p| p.session_id == row.session_id && p.user_id == row.user_id)
        {
            return Err(RepositoryError::DuplicateParticipant {
                session_id: row.session_id,
                user_id: row.user_id,
            });
        }
        if let Some(character_id) = row.character_id {
            attach_character(&mut tables, character_id, row.session_id);
        }
        tables.participants.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<SessionParticipant>> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .values()
            .find(|p| p.session_id == session_id && p.user_id == user_id)
            .cloned())
    }

    async fn list_participants(
        &self,
        session_id: Uuid,
    ) -> RepositoryResult<Vec<SessionParticipant>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<SessionParticipant> = tables
            .participants
            .values()
            .filter(|p| p.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| (p.joined_at, p.id));
        Ok(rows)
    }

    async fn update_participant(
        &self,
        row: SessionParticipant,
    ) -> RepositoryResult<SessionParticipant> {
        let mut tables = self.tables.write().await;
        let previous = tables
            .participants
            .get(&row.id)
            .cloned()
            .ok_or(RepositoryError::RowNotFound {
                entity: "participant",
                id: row.id,
            })?;

        if previous.character_id != row.character_id {
            if let Some(old) = previous.character_id {
                detach_character(&mut tables, old);
            }
            if let Some(new) = row.character_id {
                attach_character(&mut tables, new, row.session_id);
            }
        }
        tables.participants.insert(row.id, row.clone());
        Ok(row)
    }

    async fn remove_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .participants
            .values()
            .find(|p| p.session_id == session_id && p.user_id == user_id)
            .cloned()
            .ok_or(RepositoryError::RowNotFound {
                entity: "participant",
                id: user_id,
            })?;

        if let Some(character_id) = row.character_id {
            detach_character(&mut tables, character_id);
        }
        tables.participants.remove(&row.id);
        Ok(())
    }

    async fn user_holds_admin_role(&self, user_id: Uuid) -> RepositoryResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .values()
            .any(|p| p.user_id == user_id && p.role == ParticipantRole::Admin))
    }

    async fn create_character(&self, character: Character) -> RepositoryResult<Character> {
        let mut tables = self.tables.write().await;
        tables.characters.insert(character.id, character.clone());
        Ok(character)
    }

    async fn find_character(&self, id: Uuid) -> RepositoryResult<Option<Character>> {
        Ok(self.tables.read().await.characters.get(&id).cloned())
    }

    async fn list_characters_by_owner(
        &self,
        owner_id: Uuid,
    ) -> RepositoryResult<Vec<Character>> {
        let tables = self.tables.read().await;
        let mut characters: Vec<Character> = tables
            .characters
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        characters.sort_by_key(|c| (c.created_at, c.id));
        Ok(characters)
    }

    async fn update_character(&self, character: Character) -> RepositoryResult<Character> {
        let mut tables = self.tables.write().await;
        if !tables.characters.contains_key(&character.id) {
            return Err(RepositoryError::RowNotFound {
                entity: "character",
                id: character.id,
            });
        }
        tables.characters.insert(character.id, character.clone());
        Ok(character)
    }

    async fn delete_character_cascade(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.characters.contains_key(&id) {
            return Err(RepositoryError::RowNotFound {
                entity: "character",
                id,
            });
        }
        delete_character_rows(&mut tables, id);
        Ok(())
    }

    async fn create_roll(&self, roll: DiceRoll) -> RepositoryResult<DiceRoll> {
        let mut tables = self.tables.write().await;
        tables.rolls.insert(roll.id, roll.clone());
        Ok(roll)
    }

    async fn find_roll(&self, id: Uuid) -> RepositoryResult<Option<DiceRoll>> {
        Ok(self.tables.read().await.rolls.get(&id).cloned())
    }

    async fn list_rolls_by_session(
        &self,
        session_id: Uuid,
    ) -> RepositoryResult<Vec<DiceRoll>> {
        let tables = self.tables.read().await;
        let mut rolls: Vec<DiceRoll> = tables
            .rolls
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        rolls.sort_by_key(|r| (r.created_at, r.id));
        Ok(rolls)
    }
}
