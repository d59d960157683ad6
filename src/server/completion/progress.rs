use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::ProgressResponse;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{ProgressKey, User};

/// Resolves the library key after checking that the game and platform exist.
pub(super) fn resolve_key(
    store: &dyn Store,
    user: &User,
    game_id: &str,
    platform_id: &str,
) -> Result<ProgressKey, ApiError> {
    store
        .get_game(game_id)
        .api_err("Failed to get game")?
        .or_not_found("Game not found")?;
    store
        .get_platform(platform_id)
        .api_err("Failed to get platform")?
        .or_not_found("Platform not found")?;

    Ok(ProgressKey::new(&user.id, game_id, platform_id))
}

pub async fn get_progress(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((game_id, platform_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = resolve_key(state.store.as_ref(), &auth.user, &game_id, &platform_id)?;

    let progress = state.engine.summarize(&key)?;
    let status = state.engine.current_status(&key)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ProgressResponse {
        game_id: key.game_id,
        platform_id: key.platform_id,
        status,
        progress,
    })))
}

pub async fn recalculate(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((game_id, platform_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = resolve_key(state.store.as_ref(), &auth.user, &game_id, &platform_id)?;

    let recalculation = state.engine.recalculate(&key)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(recalculation)))
}
