use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use tavern_common::get_current_timestamp;

/// A player character. `owner_id` gates identity changes (name/race/class);
/// `session_id` is the optional attachment that opens the weaker
/// GM/session-admin privileges.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub race: String,
    pub class: String,
    pub is_alive: bool,

    pub owner_id: Uuid,
    pub session_id: Option<Uuid>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Character {
    pub fn new(owner_id: Uuid, name: String, race: String, class: String) -> Self {
        let now = get_current_timestamp();
        Self {
            id: Uuid::new_v4(),
            name,
            race,
            class,
            is_alive: true,
            owner_id,
            session_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
