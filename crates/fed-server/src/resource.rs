//! Protected resource endpoint.
//!
//! Returns the caller's claim set as a plain-text listing; answers 401
//! with a bearer challenge when the token is missing or invalid.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use fed_oauth::ResourceGuard;

use crate::state::AppState;

/// GET `/api/resource`
pub async fn get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.guard.authorize(authorization) {
        Ok(ticket) => ResourceGuard::claim_listing(&ticket).into_response(),
        Err(e) => {
            tracing::debug!("resource access denied: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                "unauthorized",
            )
                .into_response()
        }
    }
}
