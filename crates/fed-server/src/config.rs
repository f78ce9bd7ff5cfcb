//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults; the defaults wire up the self-contained demo deployment (one
//! demo user, one relying client, one federated identity).

use fed_core::{IdentityMap, TrustRegistry};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Public base URL (used in generated URLs and redirect targets).
    pub public_base_url: String,

    /// Entity ID the identity provider issues assertions under.
    pub idp_entity_id: String,

    /// Path to the identity provider's PEM private signing key.
    pub signing_key_path: String,

    /// Path to the identity provider's PEM certificate.
    pub signing_cert_path: String,

    /// Demo local username accepted by the identity provider.
    pub demo_username: String,

    /// Demo password accepted by the identity provider.
    pub demo_password: String,

    /// Federated subject name agreed between identity provider and
    /// authorization server.
    pub federated_subject: String,

    /// Scopes the client requests by default.
    pub default_scope: String,

    /// Access token lifespan in seconds.
    pub access_token_lifespan: i64,

    /// Assertion validity window in seconds.
    pub assertion_validity_seconds: i64,

    /// Optional TTL for cached client-authentication fingerprints. `None`
    /// preserves the original store-until-consumed behavior.
    pub fingerprint_ttl_seconds: Option<i64>,

    /// Timeout for the client's outbound HTTP calls, in seconds.
    pub http_timeout_seconds: u64,

    /// Secret keying bearer-token signatures. Generated at startup when
    /// unset; setting it only matters if tokens must survive a restart,
    /// which the in-memory stores do not anyway.
    pub token_secret: Option<String>,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a numeric variable fails to parse.
    pub fn from_env() -> fed_core::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = std::env::var("FED_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("FED_PORT", 8080)?;

        let public_base_url = std::env::var("FED_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));

        Ok(Self {
            host,
            port,
            public_base_url,
            idp_entity_id: std::env::var("FED_IDP_ENTITY_ID")
                .unwrap_or_else(|_| "federation-idp".to_string()),
            signing_key_path: std::env::var("FED_SIGNING_KEY")
                .unwrap_or_else(|_| "crates/fed-server/testdata/idp_key.pem".to_string()),
            signing_cert_path: std::env::var("FED_SIGNING_CERT")
                .unwrap_or_else(|_| "crates/fed-server/testdata/idp_cert.pem".to_string()),
            demo_username: std::env::var("FED_DEMO_USERNAME")
                .unwrap_or_else(|_| "user".to_string()),
            demo_password: std::env::var("FED_DEMO_PASSWORD")
                .unwrap_or_else(|_| "password".to_string()),
            federated_subject: std::env::var("FED_FEDERATED_SUBJECT")
                .unwrap_or_else(|_| "federatedusername".to_string()),
            default_scope: std::env::var("FED_DEFAULT_SCOPE")
                .unwrap_or_else(|_| "photos documents".to_string()),
            access_token_lifespan: parse_env("FED_ACCESS_TOKEN_LIFESPAN", 300)?,
            assertion_validity_seconds: parse_env("FED_ASSERTION_VALIDITY", 60)?,
            fingerprint_ttl_seconds: match std::env::var("FED_FINGERPRINT_TTL") {
                Ok(v) => Some(v.parse().map_err(|e| {
                    fed_core::Error::Config(format!("FED_FINGERPRINT_TTL: {e}"))
                })?),
                Err(_) => None,
            },
            http_timeout_seconds: parse_env("FED_HTTP_TIMEOUT", 10)?,
            token_secret: std::env::var("FED_TOKEN_SECRET").ok(),
        })
    }

    /// The relying client's base URL, which is also its SAML issuer ID.
    #[must_use]
    pub fn client_base_url(&self) -> String {
        format!("{}/client", self.public_base_url)
    }

    /// Where the identity provider posts assertions back to the client.
    #[must_use]
    pub fn client_return_url(&self) -> String {
        format!("{}/client/authn-response", self.public_base_url)
    }

    /// Where the authorization server redirects codes back to the client.
    #[must_use]
    pub fn client_oauth_redirect_url(&self) -> String {
        format!("{}/client/oauth-redirect", self.public_base_url)
    }

    /// The identity provider's authentication-request endpoint.
    #[must_use]
    pub fn saml_authn_url(&self) -> String {
        format!("{}/saml/authn", self.public_base_url)
    }

    /// The authorization server's SAML sign-in endpoint.
    #[must_use]
    pub fn saml_authorize_url(&self) -> String {
        format!("{}/oauth/saml-authorize", self.public_base_url)
    }

    /// The authorization server's authorize (consent) endpoint.
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!("{}/oauth/authorize", self.public_base_url)
    }

    /// The token endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.public_base_url)
    }

    /// The protected resource.
    #[must_use]
    pub fn resource_url(&self) -> String {
        format!("{}/api/resource", self.public_base_url)
    }

    /// Builds the trust registry shared by all parties.
    ///
    /// Three kinds of trusted parties live side by side: the SAML requester
    /// (client issuer → return URL), the assertion issuer (entity ID), and
    /// the OAuth client (federated subject → redirect URI).
    #[must_use]
    pub fn trust_registry(&self) -> TrustRegistry {
        TrustRegistry::new([
            (self.client_base_url(), self.client_return_url()),
            (self.idp_entity_id.clone(), self.public_base_url.clone()),
            (
                self.federated_subject.clone(),
                self.client_oauth_redirect_url(),
            ),
        ])
    }

    /// Builds the local-to-federated identity map.
    #[must_use]
    pub fn identity_map(&self) -> IdentityMap {
        IdentityMap::new([(self.demo_username.clone(), self.federated_subject.clone())])
    }
}

fn parse_env<T>(name: &str, default: T) -> fed_core::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| fed_core::Error::Config(format!("{name}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_config() -> ServerConfig {
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
            http_timeout_seconds: 10,
            token_secret: None,
        }
    }

    #[test]
    fn derived_urls() {
        let config = demo_config();
        assert_eq!(config.client_base_url(), "http://127.0.0.1:8080/client");
        assert_eq!(
            config.client_return_url(),
            "http://127.0.0.1:8080/client/authn-response"
        );
        assert_eq!(config.token_url(), "http://127.0.0.1:8080/oauth/token");
    }

    #[test]
    fn trust_registry_covers_all_parties() {
        let config = demo_config();
        let trust = config.trust_registry();

        assert_eq!(
            trust.lookup(&config.client_base_url()),
            Some(config.client_return_url().as_str())
        );
        assert!(trust.is_trusted("federation-idp"));
        assert_eq!(
            trust.lookup("federatedusername"),
            Some(config.client_oauth_redirect_url().as_str())
        );
        assert!(!trust.is_trusted("http://rogue.example"));
    }

    #[test]
    fn identity_map_covers_demo_user() {
        let map = demo_config().identity_map();
        assert_eq!(map.federated("user"), Some("federatedusername"));
    }
}
