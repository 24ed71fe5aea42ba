use serde::{Deserialize, Serialize};
use sqlx::types::{Json, Uuid};

use tavern_common::get_current_timestamp;

/// One logged dice roll. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DiceRoll {
    pub id: Uuid,
    pub expression: String,

    pub result: i64,
    pub rolls: Json<Vec<i64>>,
    pub modifier: i64,

    pub user_id: Uuid,
    pub session_id: Uuid,
    pub character_id: Option<Uuid>,

    pub created_at: i64,
}

impl DiceRoll {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        expression: String,
        result: i64,
        rolls: Vec<i64>,
        modifier: i64,
        user_id: Uuid,
        session_id: Uuid,
        character_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            expression,
            result,
            rolls: Json(rolls),
            modifier,
            user_id,
            session_id,
            character_id,
            created_at: get_current_timestamp(),
        }
    }
}
