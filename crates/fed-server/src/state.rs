//! Application state management.
//!
//! This module wires the protocol components together and defines the
//! shared state that is passed to all request handlers.

use std::sync::Arc;

use fed_cache::FingerprintCache;
use fed_core::{IdentityMap, TrustRegistry};
use fed_oauth::{GrantStore, ResourceGuard, TokenIssuer};
use fed_saml::signature::{XmlSignatureValidator, XmlSigner};
use fed_saml::{AssertionIssuer, AssertionValidator};

use crate::config::ServerConfig;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Trusted parties (SAML requesters, assertion issuers, OAuth clients).
    pub trust: Arc<TrustRegistry>,

    /// Local-to-federated identity mapping.
    pub identities: Arc<IdentityMap>,

    /// Identity-provider side: issues signed assertions.
    pub assertion_issuer: Arc<AssertionIssuer>,

    /// Authorization-server side: verifies incoming assertions.
    pub assertion_validator: Arc<AssertionValidator>,

    /// Single-use grants: authorization codes and pending flow state.
    pub grants: Arc<GrantStore>,

    /// Client-authentication fingerprint cache.
    pub fingerprints: Arc<FingerprintCache>,

    /// Token issuance and validation.
    pub tokens: Arc<TokenIssuer>,

    /// Resource-side bearer authorization.
    pub guard: Arc<ResourceGuard>,

    /// Outbound HTTP client for the relying application's back-channel
    /// calls.
    pub http: reqwest::Client,
}

impl AppState {
    /// Builds the full application state, loading key material from the
    /// configured paths.
    ///
    /// # Errors
    ///
    /// Returns an error when key material cannot be read or parsed.
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let key_pem = std::fs::read_to_string(&config.signing_key_path)?;
        let cert_pem = std::fs::read_to_string(&config.signing_cert_path)?;
        Self::with_key_material(config, &key_pem, &cert_pem)
    }

    /// Builds the application state from in-memory PEM key material.
    ///
    /// # Errors
    ///
    /// Returns an error when the key material cannot be parsed.
    pub fn with_key_material(
        config: ServerConfig,
        key_pem: &str,
        cert_pem: &str,
    ) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let trust = Arc::new(config.trust_registry());
        let identities = Arc::new(config.identity_map());

        let signer = XmlSigner::from_pem(key_pem, Some(cert_pem))
            .map_err(|e| anyhow::anyhow!("signing key: {e}"))?;
        let assertion_issuer = Arc::new(
            AssertionIssuer::new(&config.idp_entity_id, Arc::clone(&identities), signer)
                .with_validity(config.assertion_validity_seconds),
        );

        let signature_validator = XmlSignatureValidator::from_pem(&[cert_pem])
            .map_err(|e| anyhow::anyhow!("verification certificate: {e}"))?;
        let assertion_validator = Arc::new(AssertionValidator::new(
            Arc::clone(&trust),
            Arc::clone(&identities),
            signature_validator,
        ));

        let grants = Arc::new(GrantStore::new());
        let fingerprints = Arc::new(match config.fingerprint_ttl_seconds {
            Some(ttl) => FingerprintCache::with_ttl(ttl),
            None => FingerprintCache::new(),
        });

        let secret = config
            .token_secret
            .as_ref()
            .map(|s| s.as_bytes().to_vec())
            .unwrap_or_else(|| fed_crypto::random::random_bytes(48));

        let tokens = Arc::new(
            TokenIssuer::new(
                Arc::clone(&trust),
                Arc::clone(&fingerprints),
                Arc::clone(&grants),
                &secret,
            )
            .with_access_token_lifespan(config.access_token_lifespan),
        );

        let guard = Arc::new(ResourceGuard::new(Arc::clone(&tokens)));

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            trust,
            identities,
            assertion_issuer,
            assertion_validator,
            grants,
            fingerprints,
            tokens,
            guard,
            http,
        })
    }
}
