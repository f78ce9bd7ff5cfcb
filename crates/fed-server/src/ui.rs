//! HTML UI for the federation flows.
//!
//! Small askama-rendered pages: the identity provider's login form, the
//! authorization server's consent form, the auto-submitting relay form,
//! and the relying client's pages.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Identity provider login page.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// The relying party that requested the login.
    pub requester: String,
    /// Error message to display.
    pub error: Option<String>,
}

/// Shown when an authentication request comes from an unregistered party.
#[derive(Template)]
#[template(path = "not_trusted.html")]
pub struct NotTrustedTemplate {
    /// The untrusted party.
    pub requester: String,
}

/// Authorization server consent page.
#[derive(Template)]
#[template(path = "consent.html")]
pub struct ConsentTemplate {
    /// The client asking for delegated access.
    pub client_id: String,
    /// The scopes being requested.
    pub scopes: Vec<String>,
    /// Form action URL carrying the authorize parameters.
    pub action_url: String,
}

/// Auto-submitting form relaying a SAML response onward.
#[derive(Template)]
#[template(path = "oauth_relay.html")]
pub struct OAuthRelayTemplate {
    /// Target of the relay.
    pub action_url: String,
    /// The base64 SAML response payload.
    pub saml_response: String,
}

/// Relying client landing page.
#[derive(Template)]
#[template(path = "client_home.html")]
pub struct ClientHomeTemplate {
    /// Whether an access token cookie is stored.
    pub has_token: bool,
}

/// Resource output as seen by the client.
#[derive(Template)]
#[template(path = "resource_view.html")]
pub struct ResourceViewTemplate {
    /// The claim listing returned by the resource.
    pub body: String,
}

/// Generic error page.
///
/// Messages stay generic; validation detail goes to the log, not the user.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    /// The message to display.
    pub message: String,
}

/// Renders a template into an HTML response.
pub fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Renders the generic error page with a status code.
pub fn error_page(status: StatusCode, message: impl Into<String>) -> Response {
    let mut response = render(&ErrorTemplate {
        message: message.into(),
    });
    *response.status_mut() = status;
    response
}
