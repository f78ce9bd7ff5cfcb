//! Router configuration.
//!
//! One Axum router hosts all four parties, each under its own prefix.

use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{authz, client, idp, resource};

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        // Identity provider
        .route("/saml/authn", get(idp::authn_request))
        .route("/saml/login", post(idp::login_submit))
        // Authorization server
        .route("/oauth/saml-authorize", post(authz::saml_authorize))
        .route(
            "/oauth/authorize",
            get(authz::authorize_page).post(authz::authorize_submit),
        )
        .route("/oauth/token", post(authz::token))
        // Relying application
        .route("/client", get(client::home))
        .route("/client/resource", get(client::get_resource))
        .route("/client/authn-response", post(client::authn_response))
        .route("/client/oauth-redirect", get(client::oauth_redirect))
        // Protected resource
        .route("/api/resource", get(resource::get))
        // Health
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Server information response.
#[derive(Serialize)]
pub struct ServerInfo {
    name: String,
    version: String,
}

/// Root endpoint handler.
async fn root() -> Json<ServerInfo> {
    Json(ServerInfo {
        name: "fed-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// Liveness probe.
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe.
async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
