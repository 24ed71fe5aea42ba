use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use sqlx::types::Uuid;

use tavern_runtime::ops;
use tavern_runtime::ops::characters::{CreateCharacterInput, UpdateCharacterInput};

use crate::global_state::GlobalState;
use crate::middleware::{authenticate, ensure_account, CurrentUserId};
use crate::response::{AppError, AppSuccess};

pub fn character_routes() -> Router<GlobalState> {
    Router::new()
        .route(
            "/character",
            post(create_character).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/characters",
            get(list_own_characters).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/character/{id}",
            get(get_character).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/character/{id}",
            put(update_character).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/character/{id}",
            delete(delete_character).route_layer(middleware::from_fn(authenticate)),
        )
}

async fn create_character(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Json(payload): Json<CreateCharacterInput>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let character =
        ops::characters::create_character(state.repo.as_ref(), principal.as_ref(), payload)
            .await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "Character created successfully",
        json!({ "character": character }),
    ))
}

async fn list_own_characters(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let characters =
        ops::characters::list_own_characters(state.repo.as_ref(), principal.as_ref()).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Characters fetched successfully",
        json!({ "characters": characters }),
    ))
}

async fn get_character(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let character =
        ops::characters::get_character(state.repo.as_ref(), principal.as_ref(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Character fetched successfully",
        json!({ "character": character }),
    ))
}

async fn update_character(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCharacterInput>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let character =
        ops::characters::update_character(state.repo.as_ref(), principal.as_ref(), id, payload)
            .await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Character updated successfully",
        json!({ "character": character }),
    ))
}

async fn delete_character(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    ops::characters::delete_character(state.repo.as_ref(), principal.as_ref(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Character deleted successfully",
        json!({ "id": id }),
    ))
}
