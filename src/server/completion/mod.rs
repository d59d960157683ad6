mod logs;
mod progress;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn completion_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/games/{game_id}/platforms/{platform_id}/completion",
            get(progress::get_progress),
        )
        .route(
            "/games/{game_id}/platforms/{platform_id}/completion/recalculate",
            post(progress::recalculate),
        )
        .route(
            "/games/{game_id}/platforms/{platform_id}/completion/logs",
            get(logs::list_logs),
        )
        .route(
            "/games/{game_id}/platforms/{platform_id}/completion/logs",
            post(logs::create_log),
        )
        .route("/completion/logs/{id}", delete(logs::delete_log))
}
