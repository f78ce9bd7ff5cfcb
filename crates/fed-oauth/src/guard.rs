//! Resource guard.
//!
//! The resource-server side of the protocol: parses a bearer credential
//! into its claim set and authorizes access.

use std::sync::Arc;

use crate::error::{OAuthError, OAuthResult};
use crate::ticket::Ticket;
use crate::token::TokenIssuer;

/// Authorizes resource requests by their bearer token.
pub struct ResourceGuard {
    issuer: Arc<TokenIssuer>,
}

impl ResourceGuard {
    /// Creates a guard validating against the given issuer.
    #[must_use]
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }

    /// Authorizes a request by its `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` when the header is missing, not a Bearer
    /// credential, or the token does not validate.
    pub fn authorize(&self, authorization: Option<&str>) -> OAuthResult<Ticket> {
        let token = bearer_token(authorization)?;
        self.issuer.validate_bearer_token(token)
    }

    /// Renders the claim listing exposed by the protected resource.
    #[must_use]
    pub fn claim_listing(ticket: &Ticket) -> String {
        let mut listing = String::from("User with following claims accessed the resource:\n");
        for claim in &ticket.claims {
            listing.push_str(&claim.claim_type);
            listing.push(' ');
            listing.push_str(&claim.value);
            listing.push('\n');
        }
        listing
    }
}

/// Extracts the bearer token from an `Authorization` header value.
fn bearer_token(authorization: Option<&str>) -> OAuthResult<&str> {
    let header =
        authorization.ok_or_else(|| OAuthError::InvalidToken("missing credential".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| OAuthError::InvalidToken("not a bearer credential".to_string()))
}
