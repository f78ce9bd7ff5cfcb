//! OAuth 2.0 protocol error types.
//!
//! Error responses follow the RFC 6749 conventions: a machine-readable
//! `error` code plus an HTTP status.

use thiserror::Error;

/// Result type for OAuth operations.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// OAuth protocol errors.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Invalid request parameters.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Client authentication failed (bad redirect URI or secret mismatch).
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Invalid, expired, or already-used authorization grant.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// Unsupported grant type.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// Access denied by the resource owner.
    #[error("access_denied: {0}")]
    AccessDenied(String),

    /// Invalid or expired bearer token.
    #[error("invalid_token: {0}")]
    InvalidToken(String),

    /// The serialized identity ticket could not be decoded.
    #[error("invalid ticket: {0}")]
    InvalidTicket(String),

    /// Unknown or already-consumed flow correlation state.
    #[error("unknown or used state: {0}")]
    UnknownState(String),

    /// Token signing error.
    #[error("token signing failed: {0}")]
    TokenSigning(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OAuthError {
    /// Returns the OAuth 2.0 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) | Self::UnknownState(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) | Self::InvalidTicket(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::AccessDenied(_) => "access_denied",
            Self::InvalidToken(_) => "invalid_token",
            Self::TokenSigning(_) | Self::Internal(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidGrant(_)
            | Self::InvalidTicket(_)
            | Self::UnsupportedGrantType(_)
            | Self::UnknownState(_) => 400,
            Self::InvalidClient(_) | Self::InvalidToken(_) => 401,
            Self::AccessDenied(_) => 403,
            Self::TokenSigning(_) | Self::Internal(_) => 500,
        }
    }
}
