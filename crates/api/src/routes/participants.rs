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
use tavern_runtime::ops::participants::{AddParticipantInput, UpdateParticipantInput};

use crate::global_state::GlobalState;
use crate::middleware::{authenticate, ensure_account, CurrentUserId};
use crate::response::{AppError, AppSuccess};

pub fn participant_routes() -> Router<GlobalState> {
    Router::new()
        .route(
            "/session/{id}/participants",
            post(add_participant).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/session/{id}/participants",
            get(list_participants).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/session/{id}/participant/{user_id}",
            put(update_participant).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/session/{id}/participant/{user_id}",
            delete(remove_participant).route_layer(middleware::from_fn(authenticate)),
        )
}

async fn add_participant(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddParticipantInput>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let participant =
        ops::participants::add_participant(state.repo.as_ref(), principal.as_ref(), id, payload)
            .await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "Participant added successfully",
        json!({ "participant": participant }),
    ))
}

async fn list_participants(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let participants =
        ops::participants::list_participants(state.repo.as_ref(), principal.as_ref(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Participants fetched successfully",
        json!({ "participants": participants }),
    ))
}

async fn update_participant(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateParticipantInput>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let participant = ops::participants::update_participant(
        state.repo.as_ref(),
        principal.as_ref(),
        id,
        user_id,
        payload,
    )
    .await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Participant updated successfully",
        json!({ "participant": participant }),
    ))
}

async fn remove_participant(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    ops::participants::remove_participant(state.repo.as_ref(), principal.as_ref(), id, user_id)
        .await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Participant removed successfully",
        json!({ "session_id": id, "user_id": user_id }),
    ))
}
