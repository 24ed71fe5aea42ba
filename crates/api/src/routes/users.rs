use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::Uuid;

use tavern_common::{hash_password, EnvVars};
use tavern_runtime::ops;
use tavern_runtime::ops::users::UpdateUserInput;

use crate::env::ApiServerEnv;
use crate::global_state::GlobalState;
use crate::middleware::{authenticate, ensure_account, CurrentUserId};
use crate::response::{AppError, AppSuccess};

pub fn user_routes() -> Router<GlobalState> {
    Router::new()
        .route(
            "/users",
            get(list_users).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/user/{id}",
            get(get_user).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/user/{id}",
            put(update_user).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/user/{id}",
            delete(delete_user).route_layer(middleware::from_fn(authenticate)),
        )
}

async fn list_users(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let users = ops::users::list_users(state.repo.as_ref(), principal.as_ref()).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Users fetched successfully",
        json!({ "users": users }),
    ))
}

async fn get_user(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let user = ops::users::get_user(state.repo.as_ref(), principal.as_ref(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "User fetched successfully",
        json!({ "user": user }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

async fn update_user(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;

    let env = ApiServerEnv::load();
    let input = UpdateUserInput {
        username: payload.username,
        email: payload.email,
        password_digest: payload
            .password
            .map(|password| hash_password(&password, &env.get_env_var("SECRET_SALT"))),
    };

    let user = ops::users::update_user(state.repo.as_ref(), principal.as_ref(), id, input).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "User updated successfully",
        json!({ "user": user }),
    ))
}

async fn delete_user(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    ops::users::delete_user(state.repo.as_ref(), principal.as_ref(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "User deleted successfully",
        json!({ "id": id }),
    ))
}
