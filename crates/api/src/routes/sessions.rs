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
use tavern_runtime::ops::sessions::{CreateSessionInput, UpdateSessionInput};

use crate::global_state::GlobalState;
use crate::middleware::{authenticate, ensure_account, CurrentUserId};
use crate::response::{AppError, AppSuccess};

pub fn session_routes() -> Router<GlobalState> {
    Router::new()
        // single-session view is open to the world, the list is not
        .route("/session/{id}", get(get_session))
        .route(
            "/sessions",
            get(list_sessions).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/session",
            post(create_session).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/session/{id}",
            put(update_session).route_layer(middleware::from_fn(authenticate)),
        )
        .route(
            "/session/{id}",
            delete(delete_session).route_layer(middleware::from_fn(authenticate)),
        )
}

async fn create_session(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Json(payload): Json<CreateSessionInput>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let session =
        ops::sessions::create_session(state.repo.as_ref(), principal.as_ref(), payload).await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "Session created successfully",
        json!({ "session": session }),
    ))
}

async fn get_session(
    State(state): State<GlobalState>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let session = ops::sessions::get_session(state.repo.as_ref(), None, id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Session fetched successfully",
        json!({ "session": session }),
    ))
}

async fn list_sessions(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let sessions =
        ops::sessions::list_sessions(state.repo.as_ref(), principal.as_ref()).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Sessions fetched successfully",
        json!({ "sessions": sessions }),
    ))
}

async fn update_session(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSessionInput>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    let session =
        ops::sessions::update_session(state.repo.as_ref(), principal.as_ref(), id, payload)
            .await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Session updated successfully",
        json!({ "session": session }),
    ))
}

async fn delete_session(
    State(state): State<GlobalState>,
    Extension(current): Extension<CurrentUserId>,
    Path(id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let principal = ensure_account(&state, &current).await?;
    ops::sessions::delete_session(state.repo.as_ref(), principal.as_ref(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Session deleted successfully",
        json!({ "id": id }),
    ))
}
