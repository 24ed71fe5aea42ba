use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use tavern_common::get_current_timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    // opaque digest from the credential service, never serialized out
    #[serde(skip_serializing, default)]
    pub password_digest: String,

    pub created_at: i64,
}

impl User {
    pub fn new(username: String, email: String, password_digest: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_digest,
            created_at: get_current_timestamp(),
        }
    }
}
