use anyhow::anyhow;
use axum::{
    extract::State, http::StatusCode, routing::post, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tavern_common::{encrypt, get_current_timestamp, hash_password, verify_password, EnvVars};
use tavern_runtime::ops::users::NewUser;
use tavern_runtime::ops;

use crate::env::ApiServerEnv;
use crate::global_state::GlobalState;
use crate::middleware::AuthClaims;
use crate::response::{AppError, AppSuccess};

pub fn auth_routes() -> Router<GlobalState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

async fn register(
    State(state): State<GlobalState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<AppSuccess, AppError> {
    if payload.password.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("[/auth/register] password is required"),
        ));
    }

    let env = ApiServerEnv::load();
    let user = ops::users::register(
        state.repo.as_ref(),
        NewUser {
            username: payload.username,
            email: payload.email,
            password_digest: hash_password(&payload.password, &env.get_env_var("SECRET_SALT")),
        },
    )
    .await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "User registered successfully",
        json!({ "user": user }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn login(
    State(state): State<GlobalState>,
    Json(payload): Json<LoginRequest>,
) -> Result<AppSuccess, AppError> {
    let env = ApiServerEnv::load();
    let salt = env.get_env_var("SECRET_SALT");

    let user = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .filter(|user| verify_password(&payload.password, &salt, &user.password_digest))
        .ok_or_else(|| {
            AppError::new(
                StatusCode::UNAUTHORIZED,
                anyhow!("[/auth/login] invalid credentials"),
            )
        })?;

    let claims = AuthClaims {
        user_id: user.id,
        timestamp: get_current_timestamp(),
        origin: "api-auth".to_string(),
    };
    let claims_json = serde_json::to_string(&claims).map_err(|e| AppError::internal(anyhow!(e)))?;
    let auth_token = encrypt(&claims_json, &salt).map_err(AppError::internal)?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Login successful",
        json!({ "auth_token": auth_token, "user": user }),
    ))
}
