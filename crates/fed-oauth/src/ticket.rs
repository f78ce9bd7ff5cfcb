//! Identity tickets.
//!
//! A ticket is the serialized internal representation of an authenticated
//! identity plus its claims. It is embedded inside both token kinds: the
//! access token derives from it, and the refresh token *is* its serialized
//! form.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, OAuthResult};

/// Claim type for the subject's display name.
pub const CLAIM_NAME: &str = "name";

/// Claim type for granted OAuth scopes.
pub const CLAIM_SCOPE: &str = "urn:oauth:scope";

/// A single typed claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// The claim type.
    #[serde(rename = "type")]
    pub claim_type: String,

    /// The claim value.
    pub value: String,
}

impl Claim {
    /// Creates a claim.
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// An authenticated identity and its claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// The federated subject this ticket speaks for.
    pub subject: String,

    /// The claims attached to the identity, name claim included.
    pub claims: Vec<Claim>,
}

impl Ticket {
    /// Creates a ticket for a subject, seeded with its name claim.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        let subject = subject.into();
        let claims = vec![Claim::new(CLAIM_NAME, &subject)];
        Self { subject, claims }
    }

    /// Appends a claim.
    #[must_use]
    pub fn with_claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push(Claim::new(claim_type, value));
        self
    }

    /// Appends one scope claim per granted scope.
    #[must_use]
    pub fn with_scopes<'a>(mut self, scopes: impl IntoIterator<Item = &'a str>) -> Self {
        for scope in scopes {
            if !scope.is_empty() {
                self.claims.push(Claim::new(CLAIM_SCOPE, scope));
            }
        }
        self
    }

    /// Returns the granted scope values.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.claims
            .iter()
            .filter(|claim| claim.claim_type == CLAIM_SCOPE)
            .map(|claim| claim.value.as_str())
            .collect()
    }

    /// Serializes the ticket to its opaque transport form.
    #[must_use]
    pub fn serialize(&self) -> String {
        // Serialization of this closed struct cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    /// Deserializes a ticket from its opaque transport form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTicket` when the payload is not a valid ticket.
    pub fn deserialize(serialized: &str) -> OAuthResult<Self> {
        let json = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(serialized)
            .map_err(|e| OAuthError::InvalidTicket(format!("base64: {e}")))?;

        serde_json::from_slice(&json).map_err(|e| OAuthError::InvalidTicket(format!("json: {e}")))
    }
}

/// Computes the fingerprint of a transported SAML response.
///
/// The fingerprint doubles as the client secret at the token endpoint; both
/// the relying party and the authorization server compute it from the exact
/// base64 payload they exchanged.
#[must_use]
pub fn assertion_fingerprint(saml_response_b64: &str) -> String {
    let digest = fed_crypto::sha256(saml_response_b64.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}
