use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Uuid;
use sqlx::PgPool;

use tavern_common::define_module_client;

use crate::{
    Character, DiceRoll, GameSession, Repository, RepositoryError, RepositoryResult,
    SessionParticipant, User,
};

/// Schema DDL, applied at connect time. Uniqueness that the application
/// logic relies on (usernames, emails, one participant row per
/// session/user pair) lives here as constraints, not as lookups.
const DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        password_digest TEXT NOT NULL,
        created_at BIGINT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_username_idx ON users (username)",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_idx ON users (email)",
    "CREATE TABLE IF NOT EXISTS game_sessions (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        gm_id UUID NOT NULL,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS characters (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        race TEXT NOT NULL,
        class TEXT NOT NULL,
        is_alive BOOLEAN NOT NULL,
        owner_id UUID NOT NULL,
        session_id UUID,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS session_participants (
        id UUID PRIMARY KEY,
        session_id UUID NOT NULL,
        user_id UUID NOT NULL,
        character_id UUID,
        role TEXT NOT NULL,
        joined_at BIGINT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS session_participants_session_user_idx
        ON session_participants (session_id, user_id)",
    "CREATE TABLE IF NOT EXISTS dice_rolls (
        id UUID PRIMARY KEY,
        expression TEXT NOT NULL,
        result BIGINT NOT NULL,
        rolls JSONB NOT NULL,
        modifier BIGINT NOT NULL,
        user_id UUID NOT NULL,
        session_id UUID NOT NULL,
        character_id UUID,
        created_at BIGINT NOT NULL
    )",
];

/// Postgres-backed [`Repository`].
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub async fn connect(database_url: &str) -> RepositoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        for statement in DDL {
            sqlx::query(statement).execute(&pool).await?;
        }
        tracing::info!("postgres schema ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: PgRepository,
    env: ["DATABASE_URL"],
    setup: async {
        PgRepository::connect(
            &std::env::var("DATABASE_URL").expect("DATABASE_URL is set")
        )
        .await
        .expect("postgres connection failed")
    }
}

fn map_user_unique(err: sqlx::Error, user: &User) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("users_email_idx") => RepositoryError::DuplicateValue {
                    field: "email",
                    value: user.email.clone(),
                },
                _ => RepositoryError::DuplicateValue {
                    field: "username",
                    value: user.username.clone(),
                },
            };
        }
    }
    err.into()
}

fn map_participant_unique(err: sqlx::Error, row: &SessionParticipant) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::DuplicateParticipant {
                session_id: row.session_id,
                user_id: row.user_id,
            };
        }
    }
    err.into()
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_user(&self, user: User) -> RepositoryResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_digest, created_at)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_digest)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_user_unique(e, &user))
    }

    async fn find_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn update_user(&self, user: User) -> RepositoryResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET username = $2, email = $3, password_digest = $4
             WHERE id = $1 RETURNING *",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_user_unique(e, &user))?
        .ok_or(RepositoryError::RowNotFound {
            entity: "user",
            id: user.id,
        })
    }

    async fn delete_user_cascade(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::RowNotFound { entity: "user", id });
        }

        // sessions this user runs, with their own dependents
        sqlx::query(
            "DELETE FROM session_participants WHERE session_id IN
             (SELECT id FROM game_sessions WHERE gm_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM dice_rolls WHERE session_id IN
             (SELECT id FROM game_sessions WHERE gm_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE characters SET session_id = NULL WHERE session_id IN
             (SELECT id FROM game_sessions WHERE gm_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM game_sessions WHERE gm_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // memberships elsewhere
        sqlx::query(
            "UPDATE characters SET session_id = NULL WHERE id IN
             (SELECT character_id FROM session_participants
              WHERE user_id = $1 AND character_id IS NOT NULL)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM session_participants WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM dice_rolls WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // owned characters and references to them
        sqlx::query(
            "UPDATE dice_rolls SET character_id = NULL WHERE character_id IN
             (SELECT id FROM characters WHERE owner_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE session_participants SET character_id = NULL WHERE character_id IN
             (SELECT id FROM characters WHERE owner_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM characters WHERE owner_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_session_with_gm(
        &self,
        session: GameSession,
        gm_row: SessionParticipant,
    ) -> RepositoryResult<GameSession> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, GameSession>(
            "INSERT INTO game_sessions (id, title, description, gm_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(session.id)
        .bind(&session.title)
        .bind(&session.description)
        .bind(session.gm_id)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO session_participants (id, session_id, user_id, character_id, role, joined_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(gm_row.id)
        .bind(gm_row.session_id)
        .bind(gm_row.user_id)
        .bind(gm_row.character_id)
        .bind(gm_row.role.clone())
        .bind(gm_row.joined_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_session(&self, id: Uuid) -> RepositoryResult<Option<GameSession>> {
        Ok(
            sqlx::query_as::<_, GameSession>("SELECT * FROM game_sessions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_sessions(&self) -> RepositoryResult<Vec<GameSession>> {
        Ok(sqlx::query_as::<_, GameSession>(
            "SELECT * FROM game_sessions ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_session(&self, session: GameSession) -> RepositoryResult<GameSession> {
        sqlx::query_as::<_, GameSession>(
            "UPDATE game_sessions SET title = $2, description = $3, updated_at = $4
             WHERE id = $1 RETURNING *",
        )
        .bind(session.id)
        .bind(&session.title)
        .bind(&session.description)
        .bind(session.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::RowNotFound {
            entity: "session",
            id: session.id,
        })
    }

    async fn delete_session_cascade(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM game_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::RowNotFound {
                entity: "session",
                id,
            });
        }

        sqlx::query("DELETE FROM session_participants WHERE session_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM dice_rolls WHERE session_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE characters SET session_id = NULL WHERE session_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM game_sessions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn enroll_participant(
        &self,
        row: SessionParticipant,
    ) -> RepositoryResult<SessionParticipant> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, SessionParticipant>(
            "INSERT INTO session_participants (id, session_id, user_id, character_id, role, joined_at)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(row.id)
        .bind(row.session_id)
        .bind(row.user_id)
        .bind(row.character_id)
        .bind(row.role.clone())
        .bind(row.joined_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_participant_unique(e, &row))?;

        if let Some(character_id) = row.character_id {
            sqlx::query("UPDATE characters SET session_id = $1 WHERE id = $2")
                .bind(row.session_id)
                .bind(character_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<SessionParticipant>> {
        Ok(sqlx::query_as::<_, SessionParticipant>(
            "SELECT * FROM session_participants WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_participants(
        &self,
        session_id: Uuid,
    ) -> RepositoryResult<Vec<SessionParticipant>> {
        Ok(sqlx::query_as::<_, SessionParticipant>(
            "SELECT * FROM session_participants WHERE session_id = $1 ORDER BY joined_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_participant(
        &self,
        row: SessionParticipant,
    ) -> RepositoryResult<SessionParticipant> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_as::<_, SessionParticipant>(
            "SELECT * FROM session_participants WHERE id = $1 FOR UPDATE",
        )
        .bind(row.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::RowNotFound {
            entity: "participant",
            id: row.id,
        })?;

        let updated = sqlx::query_as::<_, SessionParticipant>(
            "UPDATE session_participants SET character_id = $2, role = $3
             WHERE id = $1 RETURNING *",
        )
        .bind(row.id)
        .bind(row.character_id)
        .bind(row.role.clone())
        .fetch_one(&mut *tx)
        .await?;

        if previous.character_id != row.character_id {
            if let Some(old) = previous.character_id {
                sqlx::query("UPDATE characters SET session_id = NULL WHERE id = $1")
                    .bind(old)
                    .execute(&mut *tx)
                    .await?;
            }
            if let Some(new) = row.character_id {
                sqlx::query("UPDATE characters SET session_id = $1 WHERE id = $2")
                    .bind(row.session_id)
                    .bind(new)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn remove_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, SessionParticipant>(
            "DELETE FROM session_participants WHERE session_id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::RowNotFound {
            entity: "participant",
            id: user_id,
        })?;

        if let Some(character_id) = row.character_id {
            sqlx::query("UPDATE characters SET session_id = NULL WHERE id = $1")
                .bind(character_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn user_holds_admin_role(&self, user_id: Uuid) -> RepositoryResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM session_participants WHERE user_id = $1 AND role = 'admin' LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn create_character(&self, character: Character) -> RepositoryResult<Character> {
        Ok(sqlx::query_as::<_, Character>(
            "INSERT INTO characters
             (id, name, race, class, is_alive, owner_id, session_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(character.id)
        .bind(&character.name)
        .bind(&character.race)
        .bind(&character.class)
        .bind(character.is_alive)
        .bind(character.owner_id)
        .bind(character.session_id)
        .bind(character.created_at)
        .bind(character.updated_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_character(&self, id: Uuid) -> RepositoryResult<Option<Character>> {
        Ok(
            sqlx::query_as::<_, Character>("SELECT * FROM characters WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_characters_by_owner(
        &self,
        owner_id: Uuid,
    ) -> RepositoryResult<Vec<Character>> {
        Ok(sqlx::query_as::<_, Character>(
            "SELECT * FROM characters WHERE owner_id = $1 ORDER BY created_at, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_character(&self, character: Character) -> RepositoryResult<Character> {
        sqlx::query_as::<_, Character>(
            "UPDATE characters SET name = $2, race = $3, class = $4, is_alive = $5,
             session_id = $6, updated_at = $7 WHERE id = $1 RETURNING *",
        )
        .bind(character.id)
        .bind(&character.name)
        .bind(&character.race)
        .bind(&character.class)
        .bind(character.is_alive)
        .bind(character.session_id)
        .bind(character.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::RowNotFound {
            entity: "character",
            id: character.id,
        })
    }

    async fn delete_character_cascade(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM characters WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::RowNotFound {
                entity: "character",
                id,
            });
        }

        sqlx::query("UPDATE dice_rolls SET character_id = NULL WHERE character_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE session_participants SET character_id = NULL WHERE character_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_roll(&self, roll: DiceRoll) -> RepositoryResult<DiceRoll> {
        Ok(sqlx::query_as::<_, DiceRoll>(
            "INSERT INTO dice_rolls
             (id, expression, result, rolls, modifier, user_id, session_id, character_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(roll.id)
        .bind(&roll.expression)
        .bind(roll.result)
        .bind(&roll.rolls)
        .bind(roll.modifier)
        .bind(roll.user_id)
        .bind(roll.session_id)
        .bind(roll.character_id)
        .bind(roll.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_roll(&self, id: Uuid) -> RepositoryResult<Option<DiceRoll>> {
        Ok(
            sqlx::query_as::<_, DiceRoll>("SELECT * FROM dice_rolls WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_rolls_by_session(
        &self,
        session_id: Uuid,
    ) -> RepositoryResult<Vec<DiceRoll>> {
        Ok(sqlx::query_as::<_, DiceRoll>(
            "SELECT * FROM dice_rolls WHERE session_id = $1 ORDER BY created_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
