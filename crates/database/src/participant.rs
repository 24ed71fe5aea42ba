use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::types::Uuid;
use sqlx::{Decode, Encode, Postgres, Type};

use tavern_common::get_current_timestamp;

/// Participant role. The wire/storage form is an open string; three values
/// carry meaning: "mj" (game-master), "joueur" (player, the self-enrollment
/// default) and "admin" (session-scoped elevated privilege). Anything else
/// is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParticipantRole {
    GameMaster,
    Player,
    Admin,
    Custom(String),
}

impl ParticipantRole {
    pub fn as_str(&self) -> &str {
        match self {
            ParticipantRole::GameMaster => "mj",
            ParticipantRole::Player => "joueur",
            ParticipantRole::Admin => "admin",
            ParticipantRole::Custom(other) => other,
        }
    }
}

impl From<String> for ParticipantRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "mj" => ParticipantRole::GameMaster,
            "joueur" => ParticipantRole::Player,
            "admin" => ParticipantRole::Admin,
            _ => ParticipantRole::Custom(value),
        }
    }
}

impl From<ParticipantRole> for String {
    fn from(role: ParticipantRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Stored as TEXT.
impl Type<Postgres> for ParticipantRole {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Postgres> for ParticipantRole {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> Decode<'r, Postgres> for ParticipantRole {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as Decode<Postgres>>::decode(value)?;
        Ok(ParticipantRole::from(raw))
    }
}

/// Join row binding a user to a session, optionally with one of their
/// characters. At most one row per (session_id, user_id), enforced by a
/// storage-level unique index, not a pre-read.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionParticipant {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub character_id: Option<Uuid>,
    pub role: ParticipantRole,
    pub joined_at: i64,
}

impl SessionParticipant {
    pub fn new(
        session_id: Uuid,
        user_id: Uuid,
        character_id: Option<Uuid>,
        role: ParticipantRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            user_id,
            character_id,
            role,
            joined_at: get_current_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_string_roundtrip() {
        for (raw, role) in [
            ("mj", ParticipantRole::GameMaster),
            ("joueur", ParticipantRole::Player),
            ("admin", ParticipantRole::Admin),
            ("barde", ParticipantRole::Custom("barde".to_string())),
        ] {
            assert_eq!(ParticipantRole::from(raw.to_string()), role);
            assert_eq!(role.as_str(), raw);
        }
    }

    #[test]
    fn role_serde_uses_wire_strings() {
        let role: ParticipantRole = serde_json::from_str("\"joueur\"").unwrap();
        assert_eq!(role, ParticipantRole::Player);
        assert_eq!(
            serde_json::to_string(&ParticipantRole::GameMaster).unwrap(),
            "\"mj\""
        );
    }
}
