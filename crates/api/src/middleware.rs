use axum::body::Body;
use axum::middleware::Next;
use axum::{extract::Request, response::Response};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use tavern_common::{decrypt, get_current_timestamp, EnvVars};
use tavern_runtime::Principal;

use crate::env::ApiServerEnv;
use crate::global_state::GlobalState;
use crate::response::AppError;
use crate::utils::extract_bearer_token;

/// Sealed token payload issued at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub user_id: Uuid,
    pub timestamp: i64,
    pub origin: String,
}

pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// The id the bearer token resolved to, if any. `None` is an anonymous
/// caller; the operations decide whether that is acceptable.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUserId(pub Option<Uuid>);

/// Never rejects: a missing, stale or undecipherable token just leaves the
/// request anonymous.
pub async fn authenticate(mut req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let env = ApiServerEnv::load();

    let user_id = extract_bearer_token(&req)
        .ok()
        .and_then(|token| decrypt(&token, &env.get_env_var("SECRET_SALT")).ok())
        .and_then(|decrypted| serde_json::from_str::<AuthClaims>(&decrypted).ok())
        .and_then(|claims| {
            if claims.timestamp < get_current_timestamp() - TOKEN_TTL_SECS {
                None
            } else {
                Some(claims.user_id)
            }
        });

    req.extensions_mut().insert(CurrentUserId(user_id));
    Ok(next.run(req).await)
}

/// Resolves the token id to a live account. A deleted account degrades to
/// anonymous rather than erroring.
pub async fn ensure_account(
    state: &GlobalState,
    current: &CurrentUserId,
) -> Result<Option<Principal>, AppError> {
    match current.0 {
        Some(id) => Ok(state.repo.find_user(id).await?.map(Principal::from)),
        None => Ok(None),
    }
}
