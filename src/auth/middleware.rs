use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::server::AppState;
use crate::server::response::ApiResponse;
use crate::types::User;

/// Header carrying the authenticated user id. Set by the auth gateway in
/// front of this service; requests reaching us are already authenticated.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor that requires a known user on the request
pub struct RequireUser {
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingIdentity,
    InvalidIdentity,
    UnknownUser,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingIdentity => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidIdentity => (StatusCode::UNAUTHORIZED, "Invalid user identity"),
            AuthError::UnknownUser => (StatusCode::FORBIDDEN, "Unknown user"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let mut response = (status, Json(ApiResponse::<()>::error(message))).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                HeaderValue::from_static("Gateway realm=\"questlog\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(AuthError::MissingIdentity)?
            .to_str()
            .map_err(|_| AuthError::InvalidIdentity)?
            .trim();

        if user_id.is_empty() {
            return Err(AuthError::InvalidIdentity);
        }

        let user = state
            .store
            .get_user(user_id)
            .map_err(|e| {
                tracing::error!("Failed to look up user: {e}");
                AuthError::InternalError
            })?
            .ok_or(AuthError::UnknownUser)?;

        Ok(RequireUser { user })
    }
}
