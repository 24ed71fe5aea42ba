use async_trait::async_trait;
use sqlx::types::Uuid;

use crate::{
    Character, DiceRoll, GameSession, RepositoryResult, SessionParticipant, User,
};

/// Read/write access to the relational data the permission checks and the
/// resource operations run against.
///
/// Compound mutations (enrollment with character attach, cascading deletes)
/// are single methods so every backend can make them atomic: Postgres runs
/// them in one transaction, the memory backend holds its write lock across
/// the whole mutation. Callers never get a chance to interleave a
/// check-then-act sequence of their own.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    // --- users ---

    /// Inserts a user. `DuplicateValue` if the username or email is taken.
    async fn create_user(&self, user: User) -> RepositoryResult<User>;
    async fn find_user(&self, id: Uuid) -> RepositoryResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn list_users(&self) -> RepositoryResult<Vec<User>>;

    /// Rewrites a user row. `DuplicateValue` on a username/email collision,
    /// `RowNotFound` if the row is gone.
    async fn update_user(&self, user: User) -> RepositoryResult<User>;

    /// Deletes a user and everything hanging off them: every session they
    /// GM (full session cascade each), their participant rows (detaching
    /// characters), their dice rolls, then their characters (nulling roll
    /// references), then the user row.
    async fn delete_user_cascade(&self, id: Uuid) -> RepositoryResult<()>;

    // --- game sessions ---

    /// Inserts a session together with its game-master's own participant
    /// row ("mj"), as one unit.
    async fn create_session_with_gm(
        &self,
        session: GameSession,
        gm_row: SessionParticipant,
    ) -> RepositoryResult<GameSession>;
    async fn find_session(&self, id: Uuid) -> RepositoryResult<Option<GameSession>>;
    async fn list_sessions(&self) -> RepositoryResult<Vec<GameSession>>;
    async fn update_session(&self, session: GameSession) -> RepositoryResult<GameSession>;

    /// Deletes a session and its dependents in order: participant rows,
    /// dice rolls, character attachments (nulled), then the session row.
    async fn delete_session_cascade(&self, id: Uuid) -> RepositoryResult<()>;

    // --- participants ---

    /// Inserts a participant row, attaching the named character to the
    /// session in the same unit. `DuplicateParticipant` if a row for
    /// (session_id, user_id) already exists; the uniqueness guarantee
    /// lives here, not in a preceding lookup.
    async fn enroll_participant(
        &self,
        row: SessionParticipant,
    ) -> RepositoryResult<SessionParticipant>;
    async fn find_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<SessionParticipant>>;
    async fn list_participants(
        &self,
        session_id: Uuid,
    ) -> RepositoryResult<Vec<SessionParticipant>>;

    /// Rewrites a participant row, reconciling any character change:
    /// the previous character is detached, the new one attached.
    async fn update_participant(
        &self,
        row: SessionParticipant,
    ) -> RepositoryResult<SessionParticipant>;

    /// Removes a participant row, detaching their character if one was
    /// brought along. `RowNotFound` if the user is not enrolled.
    async fn remove_participant(&self, session_id: Uuid, user_id: Uuid)
        -> RepositoryResult<()>;

    /// Whether the user holds an "admin" participant row in any session.
    async fn user_holds_admin_role(&self, user_id: Uuid) -> RepositoryResult<bool>;

    // --- characters ---

    async fn create_character(&self, character: Character) -> RepositoryResult<Character>;
    async fn find_character(&self, id: Uuid) -> RepositoryResult<Option<Character>>;
    async fn list_characters_by_owner(&self, owner_id: Uuid)
        -> RepositoryResult<Vec<Character>>;
    async fn update_character(&self, character: Character) -> RepositoryResult<Character>;

    /// Deletes a character after nulling every reference to it: dice roll
    /// character links and participant rows that carried it.
    async fn delete_character_cascade(&self, id: Uuid) -> RepositoryResult<()>;

    // --- dice rolls ---

    async fn create_roll(&self, roll: DiceRoll) -> RepositoryResult<DiceRoll>;
    async fn find_roll(&self, id: Uuid) -> RepositoryResult<Option<DiceRoll>>;
    async fn list_rolls_by_session(&self, session_id: Uuid)
        -> RepositoryResult<Vec<DiceRoll>>;
}
