//! Identity provider endpoints.
//!
//! `GET /saml/authn` validates the requester's trust and shows the login
//! form; `POST /saml/login` authenticates the demo credentials, issues a
//! signed assertion, and posts it back to the requester's registered
//! return URL with the federated username as a query parameter.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use fed_saml::bindings::HttpPostBinding;
use fed_saml::{xml, SamlError};

use crate::state::AppState;
use crate::ui::{self, LoginTemplate, NotTrustedTemplate};

/// Query parameters of the authentication-request endpoint.
#[derive(Debug, Deserialize)]
pub struct AuthnRequestQuery {
    /// Base64-encoded AuthnRequest XML.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
}

/// GET `/saml/authn`
///
/// Decodes and parses the AuthnRequest, gates the issuer on the trust
/// registry, and shows the credential form on success.
pub async fn authn_request(
    State(state): State<AppState>,
    Query(query): Query<AuthnRequestQuery>,
) -> Response {
    let Some(encoded) = query.saml_request else {
        return ui::error_page(StatusCode::BAD_REQUEST, "Missing SAMLRequest parameter");
    };

    let parsed = match fed_saml::bindings::decode_message(&encoded)
        .and_then(|request_xml| xml::parse_authn_request(&request_xml))
    {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("rejected malformed AuthnRequest: {}", e);
            return ui::error_page(StatusCode::BAD_REQUEST, "The sign-in request was malformed");
        }
    };

    if !state.trust.is_trusted(&parsed.issuer) {
        tracing::warn!(issuer = %parsed.issuer, "AuthnRequest from untrusted party");
        return ui::render(&NotTrustedTemplate {
            requester: parsed.issuer,
        });
    }

    ui::render(&LoginTemplate {
        requester: parsed.issuer,
        error: None,
    })
}

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Local username.
    pub username: String,
    /// Password.
    pub password: String,
    /// The relying party that requested the login.
    pub requester: String,
}

/// POST `/saml/login`
///
/// The demo credential store is a fixed configuration pair; assertion
/// issuance itself only receives the verdict.
pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let Some(return_url) = state.trust.lookup(&form.requester).map(str::to_string) else {
        return ui::render(&NotTrustedTemplate {
            requester: form.requester,
        });
    };

    let credentials_valid = form.username == state.config.demo_username
        && form.password == state.config.demo_password;

    let issued = match state.assertion_issuer.issue(
        &form.username,
        credentials_valid,
        &form.requester,
        &form.requester,
    ) {
        Ok(issued) => issued,
        Err(SamlError::AuthenticationFailed) => {
            return ui::render(&LoginTemplate {
                requester: form.requester,
                error: Some("Invalid credentials".to_string()),
            });
        }
        Err(e) => {
            tracing::warn!("assertion issuance failed: {}", e);
            return ui::error_page(StatusCode::BAD_REQUEST, "Sign-in is not possible");
        }
    };

    // The federated username rides the query string; the signed response
    // rides the auto-submitted form body.
    let destination = format!(
        "{}?username={}",
        return_url,
        urlencoding::encode(&issued.federated_subject)
    );

    Html(HttpPostBinding::encode_response(&issued.xml, &destination)).into_response()
}
