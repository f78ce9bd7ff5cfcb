//! SAML error types.
//!
//! Provides error types for SAML operations including parsing, trust and
//! subject validation, and signature verification.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Invalid SAML request format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// XML parsing error (malformed document).
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Missing required element or attribute.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// The response issuer is not a trusted identity provider.
    #[error("untrusted issuer: {0}")]
    UntrustedIssuer(String),

    /// The response status does not indicate success.
    #[error("assertion denied: status {0}")]
    AssertionDenied(String),

    /// The assertion carries no subject identifier.
    #[error("assertion subject missing or empty")]
    MissingSubject,

    /// The asserted subject is not a known federated identity.
    #[error("unknown federated subject: {0}")]
    UnknownFederatedSubject(String),

    /// XML signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// The local subject has no federated identity mapping.
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    /// User credential check failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SamlError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::XmlParse(_)
            | Self::MissingElement(_)
            | Self::MissingSubject
            | Self::Base64Decode(_) => 400,
            Self::SignatureInvalid(_) | Self::AuthenticationFailed => 401,
            Self::UntrustedIssuer(_) | Self::AssertionDenied(_) => 403,
            Self::UnknownFederatedSubject(_) | Self::UnknownSubject(_) => 404,
            _ => 500,
        }
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<fed_crypto::SignatureError> for SamlError {
    fn from(err: fed_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let err = SamlError::InvalidRequest("test".to_string());
        assert_eq!(err.http_status(), 400);

        let err = SamlError::SignatureInvalid("bad digest".to_string());
        assert_eq!(err.http_status(), 401);

        let err = SamlError::UntrustedIssuer("evil".to_string());
        assert_eq!(err.http_status(), 403);

        let err = SamlError::Internal("test".to_string());
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn authentication_failed_is_generic() {
        let err = SamlError::AuthenticationFailed;
        assert_eq!(err.to_string(), "authentication failed");
    }
}
