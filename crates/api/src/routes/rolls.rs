use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sqlx::types::Uuid;

use tavern_runtime::ops;
use tavern_runtime::ops::rolls::RollInput;

use crate::global_state::GlobalState;
use crate::middleware::{authenticate, ensure_account, CurrentUserId};
use crate::response::{AppError, AppSuccess};

pub fn roll_routes() -> Router<GlobalState> {
    Router::new()
        .route(
            "/session/{id}/roll",
            post(roll_dice).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/session/{id}/rolls",
            get(list_rolls).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/roll/{id}",
            get(get_roll).route_layer(middleware::from_fn(authenticate)),
        )
}

async fn roll_dice(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RollInput>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let roll =
        ops::rolls::roll_dice(state.repo.as_ref(), principal.as_ref(), id, payload).await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "Dice rolled successfully",
        json!({ "roll": roll }),
    ))
}

async fn list_rolls(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let rolls = ops::rolls::list_rolls(state.repo.as_ref(), principal.as_ref(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Rolls fetched successfully",
        json!({ "rolls": rolls }),
    ))
}

async fn get_roll(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let roll = ops::rolls::get_roll(state.repo.as_ref(), principal.as_ref(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Roll fetched successfully",
        json!({ "roll": roll }),
    ))
}
