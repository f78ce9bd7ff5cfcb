//! Error handling for the federation suite.
//!
//! Error messages are designed to be informative for debugging while not
//! exposing sensitive information to end users.

use thiserror::Error;

/// Result type alias using the federation error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cross-cutting federation operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication error.
    ///
    /// Authentication errors use generic messages to prevent user enumeration.
    #[error("authentication failed")]
    Authentication,

    /// Authorization error.
    #[error("access denied")]
    Authorization,

    /// Cryptographic error.
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Crypto(_) | Self::Internal)
    }

    /// Returns whether this error represents a client error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication | Self::Authorization | Self::Validation(_) | Self::NotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error_is_generic() {
        let error = Error::Authentication;
        assert_eq!(error.to_string(), "authentication failed");
    }

    #[test]
    fn authorization_error_is_generic() {
        let error = Error::Authorization;
        assert_eq!(error.to_string(), "access denied");
    }

    #[test]
    fn internal_error_is_generic() {
        let error = Error::Internal;
        // Don't expose internal details
        assert_eq!(error.to_string(), "internal error");
    }

    #[test]
    fn error_classification() {
        assert!(Error::Crypto("bad key".to_string()).is_server_error());
        assert!(Error::Authentication.is_client_error());
        assert!(!Error::Authentication.is_server_error());
    }
}
