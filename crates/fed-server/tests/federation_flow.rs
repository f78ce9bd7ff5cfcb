//! Federation flow integration tests.
//!
//! Drives the protocol both at the component level (issuer → validator →
//! grants → tokens → guard) and at the HTTP level through the router with
//! in-process requests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::Engine;
use tower::ServiceExt;

use fed_oauth::{assertion_fingerprint, Ticket};
use fed_server::{create_router, AppState, ServerConfig};

const KEY_PEM: &str = include_str!("../testdata/idp_key.pem");
const CERT_PEM: &str = include_str!("../testdata/idp_cert.pem");

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        public_base_url: "http://127.0.0.1:8080".to_string(),
        idp_entity_id: "federation-idp".to_string(),
        signing_key_path: String::new(),
        signing_cert_path: String::new(),
        demo_username: "user".to_string(),
        demo_password: "password".to_string(),
        federated_subject: "federatedusername".to_string(),
        default_scope: "photos documents".to_string(),
        access_token_lifespan: 300,
        assertion_validity_seconds: 60,
        fingerprint_ttl_seconds: None,
        http_timeout_seconds: 2,
        token_secret: Some("integration-test-secret".to_string()),
    }
}

fn test_state() -> AppState {
    AppState::with_key_material(test_config(), KEY_PEM, CERT_PEM).expect("state")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8_lossy(&bytes).into_owned()
}

fn form_post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request")
}

fn basic_auth(id: &str, secret: &str) -> String {
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{id}:{secret}"))
    )
}

/// The end-to-end scenario: `user`/`password` authenticates, the assertion
/// maps to `federatedusername`, a code is granted and exchanged, and the
/// resulting bearer token exposes the name and scope claims.
#[tokio::test]
async fn end_to_end_login_to_resource() {
    let state = test_state();
    let config = &state.config;

    // IdP: authenticate and issue
    let issued = state
        .assertion_issuer
        .issue("user", true, &config.client_base_url(), &config.client_return_url())
        .expect("assertion");
    assert_eq!(issued.federated_subject, "federatedusername");

    // Client: correlate and relay
    let relayed = fed_saml::bindings::encode_message(&issued.xml);
    let fingerprint = assertion_fingerprint(&relayed);
    state
        .grants
        .begin_flow("state-1", &issued.federated_subject, &fingerprint);

    // Authorization server: validate, sign in, consent, issue code
    let response_xml = fed_saml::bindings::decode_message(&relayed).expect("decode");
    let subject = state.assertion_validator.validate(&response_xml).expect("validate");
    assert_eq!(subject, "federatedusername");
    state
        .fingerprints
        .insert(&subject, assertion_fingerprint(&relayed));

    let ticket = Ticket::new(&subject).with_scopes(config.default_scope.split(' '));
    let code = state.tokens.issue_authorization_code(&ticket);

    // Client: consume state, exchange the code
    let flow = state.grants.end_flow("state-1").expect("flow state");
    let auth_ok = state.tokens.authenticate_client(&flow.subject, &flow.fingerprint);
    assert!(auth_ok, "fingerprint must authenticate the client");

    let tokens = state
        .tokens
        .exchange_code_for_token(&code, auth_ok)
        .expect("exchange");

    // Resource: authorize the bearer and inspect claims
    let header_value = format!("Bearer {}", tokens.access_token);
    let claims = state.guard.authorize(Some(&header_value)).expect("authorize");

    assert_eq!(claims.subject, "federatedusername");
    assert!(claims
        .claims
        .iter()
        .any(|c| c.claim_type == "name" && c.value == "federatedusername"));
    assert_eq!(claims.scopes(), vec!["photos", "documents"]);

    // Refresh stays valid indefinitely
    let refresh = tokens.refresh_token.expect("refresh token");
    for _ in 0..3 {
        let access = state.tokens.refresh_access_token(&refresh).expect("refresh");
        let claims = state.guard.authorize(Some(&format!("Bearer {access}"))).expect("reauth");
        assert_eq!(claims.subject, "federatedusername");
        assert_eq!(claims.scopes(), vec!["photos", "documents"]);
    }
}

/// The negative scenario: a wrong password produces no assertion and no
/// downstream state of any kind.
#[tokio::test]
async fn wrong_password_never_starts_downstream_flow() {
    let state = test_state();
    let config = &state.config;

    let err = state
        .assertion_issuer
        .issue("user", false, &config.client_base_url(), &config.client_return_url())
        .unwrap_err();
    assert!(matches!(err, fed_saml::SamlError::AuthenticationFailed));

    assert_eq!(state.grants.pending_codes(), 0);
    assert!(!state.fingerprints.contains("federatedusername"));
}

#[tokio::test]
async fn concurrent_code_redemption_has_single_winner() {
    let state = test_state();
    let ticket = Ticket::new("federatedusername").with_scopes(["photos"]);
    let code = state.tokens.issue_authorization_code(&ticket);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let tokens = state.tokens.clone();
        let code = code.clone();
        tasks.push(tokio::spawn(async move {
            tokens.exchange_code_for_token(&code, true).is_ok()
        }));
    }

    let mut wins = 0;
    for task in tasks {
        if task.await.expect("task") {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
}

#[tokio::test]
async fn authn_endpoint_shows_login_for_trusted_requester() {
    let state = test_state();
    let request = fed_saml::types::AuthnRequest::new(state.config.client_base_url());
    let encoded = fed_saml::bindings::encode_message(&fed_saml::xml::serialize_authn_request(&request));

    let uri = format!("/saml/authn?SAMLRequest={}", urlencoding::encode(&encoded));
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("name=\"username\""));
    assert!(body.contains("name=\"password\""));
}

#[tokio::test]
async fn authn_endpoint_rejects_untrusted_requester() {
    let state = test_state();
    let request = fed_saml::types::AuthnRequest::new("http://rogue.example");
    let encoded = fed_saml::bindings::encode_message(&fed_saml::xml::serialize_authn_request(&request));

    let uri = format!("/saml/authn?SAMLRequest={}", urlencoding::encode(&encoded));
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("not trusted") || body.contains("not registered"));
    assert!(!body.contains("name=\"password\""));
}

#[tokio::test]
async fn login_with_wrong_password_shows_inline_error() {
    let state = test_state();
    let requester = state.config.client_base_url();

    let body = format!(
        "username=user&password=wrong&requester={}",
        urlencoding::encode(&requester)
    );
    let response = create_router(state)
        .oneshot(form_post("/saml/login", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Invalid credentials"));
    assert!(!body.contains("SAMLResponse"));
}

#[tokio::test]
async fn login_with_valid_credentials_posts_signed_assertion() {
    let state = test_state();
    let requester = state.config.client_base_url();
    let return_url = state.config.client_return_url();

    let body = format!(
        "username=user&password=password&requester={}",
        urlencoding::encode(&requester)
    );
    let response = create_router(state)
        .oneshot(form_post("/saml/login", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("SAMLResponse"));
    assert!(body.contains(&format!("{return_url}?username=federatedusername")));
}

#[tokio::test]
async fn saml_authorize_accepts_valid_assertion_and_redirects() {
    let state = test_state();
    let config = state.config.clone();

    let issued = state
        .assertion_issuer
        .issue("user", true, &config.client_base_url(), &config.client_return_url())
        .expect("assertion");
    let relayed = fed_saml::bindings::encode_message(&issued.xml);

    let uri = format!(
        "/oauth/saml-authorize?redirect_uri={}&state=s1&scope={}&response_type=code",
        urlencoding::encode(&config.client_oauth_redirect_url()),
        urlencoding::encode(&config.default_scope),
    );
    let body = format!("SAMLResponse={}", urlencoding::encode(&relayed));

    let response = create_router(state.clone())
        .oneshot(form_post(&uri, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location");
    assert!(location.contains("/oauth/authorize"));
    assert!(location.contains("client_id=federatedusername"));

    // Sign-in side effect: the fingerprint is cached for the subject.
    assert!(state.fingerprints.contains("federatedusername"));
}

#[tokio::test]
async fn saml_authorize_rejects_tampered_assertion() {
    let state = test_state();
    let config = state.config.clone();

    let issued = state
        .assertion_issuer
        .issue("user", true, &config.client_base_url(), &config.client_return_url())
        .expect("assertion");

    // Flip bytes inside the signed region (the audience URL), leaving the
    // parsed fields intact.
    let tampered_xml = issued.xml.replace(
        &format!("<saml:Audience>{}", config.client_base_url()),
        "<saml:Audience>http://evil.example",
    );
    assert_ne!(tampered_xml, issued.xml);
    let relayed = fed_saml::bindings::encode_message(&tampered_xml);

    let uri = format!(
        "/oauth/saml-authorize?redirect_uri={}&state=s1&scope=photos&response_type=code",
        urlencoding::encode(&config.client_oauth_redirect_url()),
    );
    let body = format!("SAMLResponse={}", urlencoding::encode(&relayed));

    let response = create_router(state.clone())
        .oneshot(form_post(&uri, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!state.fingerprints.contains("federatedusername"));
}

#[tokio::test]
async fn token_endpoint_requires_client_credentials() {
    let state = test_state();
    let response = create_router(state)
        .oneshot(form_post(
            "/oauth/token",
            "grant_type=authorization_code&code=x&redirect_uri=http%3A%2F%2Fx".to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_string(response).await;
    assert!(body.contains("invalid_client"));
}

#[tokio::test]
async fn token_endpoint_exchanges_code_once() {
    let state = test_state();
    let config = state.config.clone();

    // Seed a completed SAML sign-in and a granted code.
    state.fingerprints.insert("federatedusername", "fp-1");
    let ticket = Ticket::new("federatedusername").with_scopes(config.default_scope.split(' '));
    let code = state.tokens.issue_authorization_code(&ticket);

    let form = format!(
        "grant_type=authorization_code&client_id=federatedusername&code={}&redirect_uri={}",
        urlencoding::encode(&code),
        urlencoding::encode(&config.client_oauth_redirect_url()),
    );

    let mut request = form_post("/oauth/token", form.clone());
    request.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth("federatedusername", "fp-1").parse().unwrap(),
    );
    let response = create_router(state.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).expect("json");
    assert_eq!(json["token_type"], "Bearer");

    let access_token = json["access_token"].as_str().expect("access_token");
    let claims = state
        .guard
        .authorize(Some(&format!("Bearer {access_token}")))
        .expect("bearer valid");
    assert_eq!(claims.subject, "federatedusername");
    assert!(json["refresh_token"].is_string());

    // Second redemption of the same code fails.
    let mut request = form_post("/oauth/token", form);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth("federatedusername", "fp-1").parse().unwrap(),
    );
    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("invalid_grant"));
}

#[tokio::test]
async fn token_endpoint_rejects_wrong_fingerprint() {
    let state = test_state();
    let config = state.config.clone();

    state.fingerprints.insert("federatedusername", "fp-1");
    let code = state
        .tokens
        .issue_authorization_code(&Ticket::new("federatedusername"));

    let form = format!(
        "grant_type=authorization_code&client_id=federatedusername&code={}&redirect_uri={}",
        urlencoding::encode(&code),
        urlencoding::encode(&config.client_oauth_redirect_url()),
    );
    let mut request = form_post("/oauth/token", form);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth("federatedusername", "wrong-fingerprint").parse().unwrap(),
    );

    let response = create_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_string(response).await;
    assert!(body.contains("invalid_client"));
}

#[tokio::test]
async fn token_endpoint_refresh_grant() {
    let state = test_state();

    state.fingerprints.insert("federatedusername", "fp-1");
    let ticket = Ticket::new("federatedusername").with_scopes(["photos", "documents"]);
    let code = state.tokens.issue_authorization_code(&ticket);
    let pair = state
        .tokens
        .exchange_code_for_token(&code, true)
        .expect("pair");
    let refresh = pair.refresh_token.expect("refresh");

    let form = format!(
        "grant_type=refresh_token&refresh_token={}",
        urlencoding::encode(&refresh)
    );
    let mut request = form_post("/oauth/token", form);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth("federatedusername", "fp-1").parse().unwrap(),
    );

    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).expect("json");
    let access_token = json["access_token"].as_str().expect("access_token");
    let claims = state
        .guard
        .authorize(Some(&format!("Bearer {access_token}")))
        .expect("bearer valid");
    assert_eq!(claims.scopes(), vec!["photos", "documents"]);
}

#[tokio::test]
async fn resource_endpoint_requires_bearer() {
    let state = test_state();

    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/resource")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
}

#[tokio::test]
async fn resource_endpoint_lists_claims() {
    let state = test_state();

    let ticket = Ticket::new("federatedusername").with_scopes(["photos", "documents"]);
    let code = state.tokens.issue_authorization_code(&ticket);
    let pair = state.tokens.exchange_code_for_token(&code, true).expect("pair");

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/resource")
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", pair.access_token),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("User with following claims accessed the resource:"));
    assert!(body.contains("name federatedusername"));
    assert!(body.contains("urn:oauth:scope photos"));
    assert!(body.contains("urn:oauth:scope documents"));
}

#[tokio::test]
async fn oauth_redirect_with_unknown_state_fails_without_side_effects() {
    let state = test_state();

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/client/oauth-redirect?code=c1&state=never-began")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("no longer valid"));
}

#[tokio::test]
async fn client_home_reflects_token_cookie() {
    let state = test_state();

    let response = create_router(state.clone())
        .oneshot(Request::builder().uri("/client").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_string(response).await;
    assert!(body.contains("No access token"));

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/client")
                .header(header::COOKIE, "OAuthToken=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_string(response).await;
    assert!(body.contains("access token is stored"));
}
