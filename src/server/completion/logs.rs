use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::progress::resolve_key;
use crate::auth::RequireUser;
use crate::error::Error;
use crate::progress::NewCompletion;
use crate::server::AppState;
use crate::server::dto::{
    CompletionLogResponse, CreateCompletionLogRequest, ListCompletionLogsParams,
};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{
    clamp_log_limit, parse_submitted_type, parse_type_filter, validate_dlc_reference,
    validate_percentage,
};

pub async fn list_logs(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((game_id, platform_id)): Path<(String, String)>,
    Query(params): Query<ListCompletionLogsParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let key = resolve_key(store, &auth.user, &game_id, &platform_id)?;
    let completion_type = parse_type_filter(params.completion_type.as_deref())?;

    let logs = store
        .list_completion_logs(&key, completion_type, clamp_log_limit(params.limit))
        .api_err("Failed to list completion logs")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(logs)))
}

pub async fn create_log(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((game_id, platform_id)): Path<(String, String)>,
    Json(req): Json<CreateCompletionLogRequest>,
) -> impl IntoResponse {
    let completion_type = parse_submitted_type(&req.completion_type)?;
    let percentage = validate_percentage(req.percentage)?;
    validate_dlc_reference(completion_type, req.dlc_id.as_deref())?;

    let key = resolve_key(state.store.as_ref(), &auth.user, &game_id, &platform_id)?;

    let (log, recalculation) = state
        .engine
        .log_completion(
            &key,
            NewCompletion {
                completion_type,
                dlc_id: req.dlc_id,
                percentage,
                notes: req.notes,
                logged_at: req.logged_at,
            },
        )
        .map_err(|e| match e {
            Error::NotFound => ApiError::not_found("DLC not found for this game"),
            other => ApiError::from(other),
        })?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CompletionLogResponse { log, recalculation })),
    ))
}

pub async fn delete_log(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (log, recalculation) = state
        .engine
        .delete_completion(&auth.user.id, &id)
        .map_err(|e| match e {
            Error::NotFound => ApiError::not_found("Completion log not found"),
            other => ApiError::from(other),
        })?;

    Ok::<_, ApiError>(Json(ApiResponse::success(CompletionLogResponse {
        log,
        recalculation,
    })))
}
