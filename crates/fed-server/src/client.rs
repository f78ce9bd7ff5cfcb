//! Relying application endpoints.
//!
//! The client drives the three-hop redirect chain: it requests the
//! resource with its stored bearer token, starts a SAML login when that
//! fails, relays the assertion to the authorization server with fresh flow
//! state, and exchanges the returned code for tokens on the back channel.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use fed_oauth::{assertion_fingerprint, TokenResponse};
use fed_saml::types::AuthnRequest;
use fed_saml::{bindings, xml};

use crate::flow::{FlowFailure, FlowPhase};
use crate::state::AppState;
use crate::ui::{self, ClientHomeTemplate, OAuthRelayTemplate, ResourceViewTemplate};

/// Name of the cookie holding the access token.
const TOKEN_COOKIE: &str = "OAuthToken";

/// GET `/client`
pub async fn home(headers: HeaderMap) -> Response {
    ui::render(&ClientHomeTemplate {
        has_token: read_cookie(&headers, TOKEN_COOKIE).is_some(),
    })
}

/// GET `/client/resource`
///
/// Attaches the stored bearer token to the resource call. A missing or
/// rejected token restarts the flow at the identity provider; there is no
/// automatic retry beyond that single restart redirect.
pub async fn get_resource(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = read_cookie(&headers, TOKEN_COOKIE) {
        let phase = FlowPhase::TokenReceived.advance(FlowPhase::ResourceAccessAttempted);
        tracing::debug!(%phase, "calling resource with stored bearer token");

        match state
            .http
            .get(state.config.resource_url())
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                let body = response.text().await.unwrap_or_default();
                return ui::render(&ResourceViewTemplate { body });
            }
            Ok(response) if response.status() == reqwest::StatusCode::UNAUTHORIZED => {
                tracing::debug!("stored token rejected; restarting login flow");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "unexpected resource response");
                return ui::error_page(StatusCode::BAD_GATEWAY, "The resource call failed");
            }
            Err(e) => {
                tracing::warn!("resource call failed: {}", e);
                return ui::error_page(StatusCode::BAD_GATEWAY, "The resource call failed");
            }
        }
    }

    start_login(&state)
}

/// Builds the AuthnRequest redirect that begins a login attempt.
fn start_login(state: &AppState) -> Response {
    let phase = FlowPhase::Idle.advance(FlowPhase::AuthnRequested);

    let request = AuthnRequest::new(state.config.client_base_url());
    let encoded = bindings::encode_message(&xml::serialize_authn_request(&request));

    let target = format!(
        "{}?SAMLRequest={}",
        state.config.saml_authn_url(),
        urlencoding::encode(&encoded)
    );

    tracing::debug!(%phase, request_id = %request.id, "redirecting to identity provider");
    Redirect::to(&target).into_response()
}

/// Query half of the assertion hand-off (`?username=`).
#[derive(Debug, Deserialize)]
pub struct AuthnResponseQuery {
    /// The federated username asserted by the identity provider.
    pub username: String,
}

/// Form half of the assertion hand-off.
#[derive(Debug, Deserialize)]
pub struct AuthnResponseForm {
    /// Base64-encoded signed SAML response.
    #[serde(rename = "SAMLResponse")]
    pub saml_response: String,
}

/// POST `/client/authn-response`
///
/// Correlates a fresh state id with the received assertion, then relays
/// the assertion toward the authorization server.
pub async fn authn_response(
    State(state): State<AppState>,
    Query(query): Query<AuthnResponseQuery>,
    Form(form): Form<AuthnResponseForm>,
) -> Response {
    let phase = FlowPhase::AuthnRequested.advance(FlowPhase::AssertionReceived);

    let state_id = fed_crypto::random::generate_state_id();
    let fingerprint = assertion_fingerprint(&form.saml_response);
    state
        .grants
        .begin_flow(&state_id, &query.username, &fingerprint);

    let action_url = format!(
        "{}?redirect_uri={}&state={}&scope={}&response_type=code",
        state.config.saml_authorize_url(),
        urlencoding::encode(&state.config.client_oauth_redirect_url()),
        urlencoding::encode(&state_id),
        urlencoding::encode(&state.config.default_scope),
    );

    let phase = phase.advance(FlowPhase::GrantRequested);
    tracing::debug!(%phase, state_id, "relaying assertion to authorization server");

    ui::render(&OAuthRelayTemplate {
        action_url,
        saml_response: form.saml_response,
    })
}

/// Query parameters of the code redirect.
#[derive(Debug, Deserialize)]
pub struct OAuthRedirectQuery {
    /// The authorization code.
    pub code: String,
    /// The flow-correlation state id.
    pub state: String,
}

/// GET `/client/oauth-redirect`
///
/// Consumes the pending flow state, exchanges the code on the back channel
/// (authenticating with the correlated fingerprint), and persists the
/// access token as an HTTP-only cookie.
pub async fn oauth_redirect(
    State(state): State<AppState>,
    Query(query): Query<OAuthRedirectQuery>,
) -> Response {
    let flow = match state.grants.end_flow(&query.state) {
        Ok(flow) => flow,
        Err(e) => {
            let phase = FlowPhase::GrantRequested.advance(FlowPhase::Failed(FlowFailure::UnknownState));
            tracing::warn!(%phase, "code redirect with unknown state: {}", e);
            return ui::error_page(
                StatusCode::BAD_REQUEST,
                "This sign-in attempt is no longer valid; start over",
            );
        }
    };

    let phase = FlowPhase::GrantRequested.advance(FlowPhase::CodeReceived);

    let exchange = state
        .http
        .post(state.config.token_url())
        .basic_auth(&flow.subject, Some(&flow.fingerprint))
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", flow.subject.as_str()),
            ("code", query.code.as_str()),
            ("redirect_uri", &state.config.client_oauth_redirect_url()),
        ])
        .send()
        .await;

    let token_response = match exchange {
        Ok(response) if response.status().is_success() => {
            match response.json::<TokenResponse>().await {
                Ok(token_response) => token_response,
                Err(e) => {
                    tracing::warn!("undecodable token response: {}", e);
                    return ui::error_page(StatusCode::BAD_GATEWAY, "Token exchange failed");
                }
            }
        }
        Ok(response) => {
            let phase = phase.advance(FlowPhase::Failed(FlowFailure::ExchangeFailed));
            tracing::warn!(%phase, status = %response.status(), "token exchange rejected");
            return ui::error_page(StatusCode::BAD_GATEWAY, "Token exchange failed");
        }
        Err(e) => {
            let phase = phase.advance(FlowPhase::Failed(FlowFailure::ExchangeFailed));
            tracing::warn!(%phase, "token exchange call failed: {}", e);
            return ui::error_page(StatusCode::BAD_GATEWAY, "Token exchange failed");
        }
    };

    let phase = phase.advance(FlowPhase::TokenReceived);
    tracing::info!(%phase, subject = %flow.subject, "access token stored");

    let cookie = format!(
        "{TOKEN_COOKIE}={}; HttpOnly; Path=/",
        token_response.access_token
    );

    let mut response = Redirect::to("/client").into_response();
    match cookie.parse() {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Err(_) => {
            return ui::error_page(StatusCode::BAD_GATEWAY, "Token exchange failed");
        }
    }
    response
}

/// Reads a cookie value from the request headers.
fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_cookie_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "other=1; OAuthToken=abc.def.ghi; last=2".parse().unwrap(),
        );

        assert_eq!(
            read_cookie(&headers, "OAuthToken").as_deref(),
            Some("abc.def.ghi")
        );
        assert!(read_cookie(&headers, "Missing").is_none());
    }

    #[test]
    fn read_cookie_without_header() {
        let headers = HeaderMap::new();
        assert!(read_cookie(&headers, "OAuthToken").is_none());
    }
}
