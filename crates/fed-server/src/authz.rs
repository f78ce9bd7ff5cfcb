//! Authorization server endpoints.
//!
//! `POST /oauth/saml-authorize` signs a caller in from a SAML response,
//! `GET|POST /oauth/authorize` runs the consent step and issues the
//! authorization code, and `POST /oauth/token` exchanges codes and refresh
//! tokens for bearer tokens.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use base64::Engine;
use serde::{Deserialize, Serialize};

use fed_oauth::{assertion_fingerprint, OAuthError, Ticket};

use crate::state::AppState;
use crate::ui::{self, ConsentTemplate};

/// Query parameters shared by the authorize endpoints.
#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    /// OAuth client id (the federated subject in this federation).
    pub client_id: Option<String>,
    /// Redirect URI supplied by the client.
    pub redirect_uri: String,
    /// Opaque client flow-correlation state.
    pub state: Option<String>,
    /// Requested scopes (space-separated).
    pub scope: Option<String>,
    /// Requested response type; only `code` is supported.
    pub response_type: Option<String>,
}

/// SAML sign-in form body.
#[derive(Debug, Deserialize)]
pub struct SamlAuthorizeForm {
    /// Base64-encoded signed SAML response.
    #[serde(rename = "SAMLResponse")]
    pub saml_response: String,
}

/// POST `/oauth/saml-authorize`
///
/// Validates the relayed assertion. On success the assertion fingerprint is
/// cached as the caller's token-endpoint secret and the browser continues
/// to the consent step, carrying the federated subject as `client_id`.
pub async fn saml_authorize(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
    Form(form): Form<SamlAuthorizeForm>,
) -> Response {
    let response_xml = match fed_saml::bindings::decode_message(&form.saml_response) {
        Ok(xml) => xml,
        Err(e) => {
            tracing::warn!("undecodable SAML response: {}", e);
            return ui::error_page(StatusCode::BAD_REQUEST, "The sign-in response was malformed");
        }
    };

    let subject = match state.assertion_validator.validate(&response_xml) {
        Ok(subject) => subject,
        Err(e) => {
            // Validation detail stays in the log; the user sees a generic page.
            tracing::warn!("assertion rejected: {}", e);
            return ui::error_page(
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::BAD_REQUEST),
                "The sign-in assertion was not accepted",
            );
        }
    };

    // The fingerprint of the exact relayed payload becomes the client
    // secret for the token exchange of this login.
    state
        .fingerprints
        .insert(&subject, assertion_fingerprint(&form.saml_response));

    let next = format!(
        "{}?client_id={}&redirect_uri={}&state={}&scope={}&response_type={}",
        state.config.authorize_url(),
        urlencoding::encode(&subject),
        urlencoding::encode(&params.redirect_uri),
        urlencoding::encode(params.state.as_deref().unwrap_or_default()),
        urlencoding::encode(params.scope.as_deref().unwrap_or_default()),
        urlencoding::encode(params.response_type.as_deref().unwrap_or("code")),
    );

    Redirect::to(&next).into_response()
}

/// GET `/oauth/authorize`
///
/// Shows the consent form when the caller has a live SAML sign-in and the
/// request parameters validate.
pub async fn authorize_page(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    let Some(client_id) = params.client_id.clone() else {
        return ui::error_page(StatusCode::BAD_REQUEST, "Missing client_id");
    };

    if let Err(response) = validate_authorize_request(&state, &client_id, &params) {
        return response;
    }

    let scope = params.scope.unwrap_or_default();
    let action_url = format!(
        "{}?client_id={}&redirect_uri={}&state={}&scope={}&response_type={}",
        state.config.authorize_url(),
        urlencoding::encode(&client_id),
        urlencoding::encode(&params.redirect_uri),
        urlencoding::encode(params.state.as_deref().unwrap_or_default()),
        urlencoding::encode(&scope),
        urlencoding::encode(params.response_type.as_deref().unwrap_or("code")),
    );

    ui::render(&ConsentTemplate {
        client_id,
        scopes: scope.split(' ').filter(|s| !s.is_empty()).map(String::from).collect(),
        action_url,
    })
}

/// Consent form body.
#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    /// Either `submit.Grant` or `submit.Decline`.
    pub submit: String,
}

/// POST `/oauth/authorize`
///
/// Grant attaches the scope claims and sends a single-use code back to the
/// client; decline signs the cached fingerprint out and returns to the
/// client landing page.
pub async fn authorize_submit(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
    Form(form): Form<ConsentForm>,
) -> Response {
    let Some(client_id) = params.client_id.clone() else {
        return ui::error_page(StatusCode::BAD_REQUEST, "Missing client_id");
    };

    if let Err(response) = validate_authorize_request(&state, &client_id, &params) {
        return response;
    }

    if form.submit != "submit.Grant" {
        tracing::info!(client_id, "consent declined");
        state.fingerprints.remove(&client_id);
        return Redirect::to(&state.config.client_base_url()).into_response();
    }

    let scope = params.scope.unwrap_or_default();
    let ticket = Ticket::new(&client_id).with_scopes(scope.split(' '));
    let code = state.tokens.issue_authorization_code(&ticket);

    let back = format!(
        "{}?code={}&state={}",
        params.redirect_uri,
        urlencoding::encode(&code),
        urlencoding::encode(params.state.as_deref().unwrap_or_default()),
    );

    Redirect::to(&back).into_response()
}

/// Shared validation for the authorize endpoints.
fn validate_authorize_request(
    state: &AppState,
    client_id: &str,
    params: &AuthorizeParams,
) -> Result<(), Response> {
    // A live fingerprint entry is what "signed in via SAML" means here.
    if !state.fingerprints.contains(client_id) {
        tracing::warn!(client_id, "authorize without a live SAML sign-in");
        return Err(ui::error_page(
            StatusCode::FORBIDDEN,
            "No active sign-in; restart the flow from the client",
        ));
    }

    if params.response_type.as_deref() != Some("code") {
        return Err(ui::error_page(
            StatusCode::BAD_REQUEST,
            "Only the authorization code flow is supported",
        ));
    }

    if !state.tokens.validate_redirect_uri(client_id, &params.redirect_uri) {
        tracing::warn!(client_id, redirect_uri = %params.redirect_uri, "redirect URI mismatch");
        return Err(ui::error_page(
            StatusCode::BAD_REQUEST,
            "The redirect URI is not registered for this client",
        ));
    }

    Ok(())
}

/// Token endpoint form body.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// `authorization_code` or `refresh_token`.
    pub grant_type: String,
    /// OAuth client id; must match the authenticated client.
    pub client_id: Option<String>,
    /// The authorization code being redeemed.
    pub code: Option<String>,
    /// Redirect URI used in the authorization request.
    pub redirect_uri: Option<String>,
    /// The refresh token being replayed.
    pub refresh_token: Option<String>,
}

/// OAuth error response body.
#[derive(Debug, Serialize)]
pub struct OAuthErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable description.
    pub error_description: String,
}

/// POST `/oauth/token`
///
/// The client authenticates with HTTP Basic `client_id:fingerprint`.
pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    let Some((basic_id, basic_secret)) = basic_credentials(&headers) else {
        return oauth_error(&OAuthError::InvalidClient(
            "missing client credentials".to_string(),
        ));
    };

    if let Some(form_client) = request.client_id.as_deref() {
        if form_client != basic_id {
            return oauth_error(&OAuthError::InvalidRequest(
                "client_id does not match authenticated client".to_string(),
            ));
        }
    }

    match request.grant_type.as_str() {
        "authorization_code" => {
            let Some(redirect_uri) = request.redirect_uri.as_deref() else {
                return oauth_error(&OAuthError::InvalidRequest(
                    "redirect_uri is required".to_string(),
                ));
            };
            if !state.tokens.validate_redirect_uri(&basic_id, redirect_uri) {
                return oauth_error(&OAuthError::InvalidClient(
                    "redirect URI mismatch".to_string(),
                ));
            }

            let Some(code) = request.code.as_deref() else {
                return oauth_error(&OAuthError::InvalidRequest("code is required".to_string()));
            };

            let client_auth_ok = state.tokens.authenticate_client(&basic_id, &basic_secret);
            match state.tokens.exchange_code_for_token(code, client_auth_ok) {
                Ok(response) => Json(response).into_response(),
                Err(e) => oauth_error(&e),
            }
        }
        "refresh_token" => {
            let Some(refresh_token) = request.refresh_token.as_deref() else {
                return oauth_error(&OAuthError::InvalidRequest(
                    "refresh_token is required".to_string(),
                ));
            };

            if !state.tokens.authenticate_client(&basic_id, &basic_secret) {
                return oauth_error(&OAuthError::InvalidClient(
                    "client authentication failed".to_string(),
                ));
            }

            match state.tokens.refresh_access_token(refresh_token) {
                Ok(access_token) => Json(fed_oauth::TokenResponse {
                    access_token,
                    token_type: "Bearer".to_string(),
                    expires_in: state.config.access_token_lifespan,
                    refresh_token: Some(refresh_token.to_string()),
                })
                .into_response(),
                Err(e) => oauth_error(&e),
            }
        }
        other => oauth_error(&OAuthError::UnsupportedGrantType(other.to_string())),
    }
}

/// Parses HTTP Basic credentials from the request headers.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

/// Builds an RFC 6749 error response.
fn oauth_error(error: &OAuthError) -> Response {
    let status = StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    tracing::debug!(code = error.error_code(), "token endpoint error: {}", error);
    (
        status,
        Json(OAuthErrorBody {
            error: error.error_code(),
            error_description: error.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_credentials_round_trip() {
        let mut headers = HeaderMap::new();
        let value = base64::engine::general_purpose::STANDARD.encode("federatedusername:fp123");
        headers.insert(
            header::AUTHORIZATION,
            format!("Basic {value}").parse().unwrap(),
        );

        let (id, secret) = basic_credentials(&headers).unwrap();
        assert_eq!(id, "federatedusername");
        assert_eq!(secret, "fp123");
    }

    #[test]
    fn basic_credentials_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer token".parse().unwrap());
        assert!(basic_credentials(&headers).is_none());
    }

    #[test]
    fn basic_credentials_requires_separator() {
        let mut headers = HeaderMap::new();
        let value = base64::engine::general_purpose::STANDARD.encode("nosecret");
        headers.insert(
            header::AUTHORIZATION,
            format!("Basic {value}").parse().unwrap(),
        );
        assert!(basic_credentials(&headers).is_none());
    }
}
