//! Bearer-token issuance and validation.
//!
//! Access tokens are short-lived HS384 JWTs derived from the identity
//! ticket. Refresh tokens are the serialized ticket itself and never
//! expire; replaying one is equivalent to re-presenting the ticket.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use fed_cache::FingerprintCache;
use fed_core::TrustRegistry;

use crate::error::{OAuthError, OAuthResult};
use crate::grants::{GrantStore, RefreshTokenCodec, TokenProvider};
use crate::ticket::{Claim, Ticket};

/// Default access-token lifespan in seconds.
pub const DEFAULT_ACCESS_TOKEN_LIFESPAN: i64 = 300;

/// JWT claim set carried by access tokens.
#[derive(Debug, Serialize, Deserialize)]
struct AccessTokenClaims {
    sub: String,
    iat: i64,
    exp: i64,
    claims: Vec<Claim>,
}

/// Token endpoint response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type (always "Bearer").
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// Refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Issues and validates tokens for the authorization server.
pub struct TokenIssuer {
    registry: Arc<TrustRegistry>,
    fingerprints: Arc<FingerprintCache>,
    grants: Arc<GrantStore>,
    refresh_codec: RefreshTokenCodec,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_lifespan: i64,
}

impl TokenIssuer {
    /// Creates a token issuer.
    ///
    /// `secret` keys the access-token signatures; it is process-local and
    /// never leaves the authorization/resource servers.
    #[must_use]
    pub fn new(
        registry: Arc<TrustRegistry>,
        fingerprints: Arc<FingerprintCache>,
        grants: Arc<GrantStore>,
        secret: &[u8],
    ) -> Self {
        Self {
            registry,
            fingerprints,
            grants,
            refresh_codec: RefreshTokenCodec,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_lifespan: DEFAULT_ACCESS_TOKEN_LIFESPAN,
        }
    }

    /// Overrides the access-token lifespan.
    #[must_use]
    pub const fn with_access_token_lifespan(mut self, seconds: i64) -> Self {
        self.access_token_lifespan = seconds;
        self
    }

    /// Authenticates a client by its cached assertion fingerprint.
    ///
    /// Returns `false` when no fingerprint is cached for the client or the
    /// presented secret does not match.
    #[must_use]
    pub fn authenticate_client(&self, client_id: &str, presented_secret: &str) -> bool {
        let ok = self.fingerprints.verify(client_id, presented_secret);
        if !ok {
            tracing::warn!(client_id, "client authentication failed");
        }
        ok
    }

    /// Validates a client's supplied redirect URI against the registry.
    #[must_use]
    pub fn validate_redirect_uri(&self, client_id: &str, supplied: &str) -> bool {
        self.registry.lookup(client_id) == Some(supplied)
    }

    /// Issues a single-use authorization code for the ticket.
    #[must_use]
    pub fn issue_authorization_code(&self, ticket: &Ticket) -> String {
        self.grants.create(ticket)
    }

    /// Exchanges an authorization code for an access/refresh token pair.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` when `client_auth_ok` is false
    /// - `InvalidGrant` when the code is unknown or already used
    pub fn exchange_code_for_token(
        &self,
        code: &str,
        client_auth_ok: bool,
    ) -> OAuthResult<TokenResponse> {
        if !client_auth_ok {
            return Err(OAuthError::InvalidClient(
                "client authentication required".to_string(),
            ));
        }

        let ticket = self
            .grants
            .receive(code)
            .ok_or_else(|| OAuthError::InvalidGrant("unknown or used code".to_string()))?;

        let access_token = self.mint_access_token(&ticket)?;
        let refresh_token = self.refresh_codec.create(&ticket);

        tracing::info!(subject = %ticket.subject, "issued token pair");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_lifespan,
            refresh_token: Some(refresh_token),
        })
    }

    /// Reissues an access token from a refresh token.
    ///
    /// The ticket is deserialized from the refresh token directly; no store
    /// is consulted, so the call is repeatable indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTicket` when the refresh token does not decode.
    pub fn refresh_access_token(&self, refresh_token: &str) -> OAuthResult<String> {
        let ticket = self
            .refresh_codec
            .receive(refresh_token)
            .ok_or_else(|| OAuthError::InvalidTicket("undecodable refresh token".to_string()))?;

        self.mint_access_token(&ticket)
    }

    /// Validates an inbound bearer token and returns its claim set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` when the token is malformed, mis-signed, or
    /// expired.
    pub fn validate_bearer_token(&self, access_token: &str) -> OAuthResult<Ticket> {
        let mut validation = Validation::new(Algorithm::HS384);
        validation.leeway = 0;

        let data = decode::<AccessTokenClaims>(access_token, &self.decoding_key, &validation)
            .map_err(|e| OAuthError::InvalidToken(e.to_string()))?;

        Ok(Ticket {
            subject: data.claims.sub,
            claims: data.claims.claims,
        })
    }

    /// Signs an access token over the ticket's claim set.
    fn mint_access_token(&self, ticket: &Ticket) -> OAuthResult<String> {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: ticket.subject.clone(),
            iat: now,
            exp: now + self.access_token_lifespan,
            claims: ticket.claims.clone(),
        };

        encode(&Header::new(Algorithm::HS384), &claims, &self.encoding_key)
            .map_err(|e| OAuthError::TokenSigning(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-for-token-signing";

    fn issuer_with(lifespan: i64) -> TokenIssuer {
        let registry = Arc::new(TrustRegistry::new([(
            "federatedusername",
            "http://client.example/oauth-redirect",
        )]));
        let fingerprints = Arc::new(FingerprintCache::new());
        let grants = Arc::new(GrantStore::new());
        TokenIssuer::new(registry, fingerprints, grants, SECRET)
            .with_access_token_lifespan(lifespan)
    }

    fn issuer() -> TokenIssuer {
        issuer_with(DEFAULT_ACCESS_TOKEN_LIFESPAN)
    }

    fn granted_ticket() -> Ticket {
        Ticket::new("federatedusername").with_scopes(["photos", "documents"])
    }

    #[test]
    fn code_exchange_yields_valid_pair() {
        let issuer = issuer();
        let code = issuer.issue_authorization_code(&granted_ticket());

        let response = issuer.exchange_code_for_token(&code, true).unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, DEFAULT_ACCESS_TOKEN_LIFESPAN);

        let claims = issuer.validate_bearer_token(&response.access_token).unwrap();
        assert_eq!(claims.subject, "federatedusername");
        assert_eq!(claims.scopes(), vec!["photos", "documents"]);
    }

    #[test]
    fn exchange_requires_client_auth() {
        let issuer = issuer();
        let code = issuer.issue_authorization_code(&granted_ticket());

        let err = issuer.exchange_code_for_token(&code, false).unwrap_err();
        assert!(matches!(err, OAuthError::InvalidClient(_)));

        // The failed exchange must not consume the code.
        assert!(issuer.exchange_code_for_token(&code, true).is_ok());
    }

    #[test]
    fn code_is_single_use_through_the_issuer() {
        let issuer = issuer();
        let code = issuer.issue_authorization_code(&granted_ticket());

        assert!(issuer.exchange_code_for_token(&code, true).is_ok());
        let err = issuer.exchange_code_for_token(&code, true).unwrap_err();
        assert!(matches!(err, OAuthError::InvalidGrant(_)));
    }

    #[test]
    fn refresh_is_repeatable_with_stable_identity() {
        let issuer = issuer();
        let code = issuer.issue_authorization_code(&granted_ticket());
        let response = issuer.exchange_code_for_token(&code, true).unwrap();
        let refresh = response.refresh_token.unwrap();

        for _ in 0..3 {
            let access = issuer.refresh_access_token(&refresh).unwrap();
            let claims = issuer.validate_bearer_token(&access).unwrap();
            assert_eq!(claims.subject, "federatedusername");
            assert_eq!(claims.scopes(), vec!["photos", "documents"]);
        }
    }

    #[test]
    fn refresh_rejects_garbage() {
        let err = issuer().refresh_access_token("not-a-ticket").unwrap_err();
        assert!(matches!(err, OAuthError::InvalidTicket(_)));
    }

    #[test]
    fn expired_access_token_rejected() {
        let issuer = issuer_with(-10);
        let code = issuer.issue_authorization_code(&granted_ticket());
        let response = issuer.exchange_code_for_token(&code, true).unwrap();

        let err = issuer
            .validate_bearer_token(&response.access_token)
            .unwrap_err();
        assert!(matches!(err, OAuthError::InvalidToken(_)));
    }

    #[test]
    fn tampered_access_token_rejected() {
        let issuer = issuer();
        let code = issuer.issue_authorization_code(&granted_ticket());
        let response = issuer.exchange_code_for_token(&code, true).unwrap();

        let mut tampered = response.access_token;
        tampered.pop();
        assert!(issuer.validate_bearer_token(&tampered).is_err());
    }

    #[test]
    fn client_authentication_against_fingerprint_cache() {
        let registry = Arc::new(TrustRegistry::default());
        let fingerprints = Arc::new(FingerprintCache::new());
        let grants = Arc::new(GrantStore::new());
        let issuer = TokenIssuer::new(registry, Arc::clone(&fingerprints), grants, SECRET);

        assert!(!issuer.authenticate_client("federatedusername", "fp"));

        fingerprints.insert("federatedusername", "fp");
        assert!(issuer.authenticate_client("federatedusername", "fp"));
        assert!(!issuer.authenticate_client("federatedusername", "other"));
    }

    #[test]
    fn redirect_uri_must_match_registration() {
        let issuer = issuer();
        assert!(issuer
            .validate_redirect_uri("federatedusername", "http://client.example/oauth-redirect"));
        assert!(!issuer.validate_redirect_uri("federatedusername", "http://evil.example/"));
        assert!(!issuer.validate_redirect_uri("unknown", "http://client.example/oauth-redirect"));
    }
}
