use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use tavern_common::get_current_timestamp;

/// A game session. `gm_id` is the game-master and is privileged for the
/// session's whole lifetime, with or without a matching participant row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GameSession {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,

    pub gm_id: Uuid,

    pub created_at: i64,
    pub updated_at: i64,
}

impl GameSession {
    pub fn new(gm_id: Uuid, title: String, description: Option<String>) -> Self {
        let now = get_current_timestamp();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            gm_id,
            created_at: now,
            updated_at: now,
        }
    }
}
