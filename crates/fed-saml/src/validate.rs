//! Assertion validation.
//!
//! The authorization-server side of the federation: verifies an incoming
//! SAML response and extracts the federated subject it asserts.

use std::sync::Arc;

use fed_core::{IdentityMap, TrustRegistry};

use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSignatureValidator;
use crate::types::constants::status_codes;
use crate::xml;

/// Validates incoming SAML responses.
///
/// Every check is mandatory; the cheap structural checks run before the
/// cryptographic one. The pipeline short-circuits on the first failure.
pub struct AssertionValidator {
    trusted_issuers: Arc<TrustRegistry>,
    identities: Arc<IdentityMap>,
    signature_validator: XmlSignatureValidator,
}

impl AssertionValidator {
    /// Creates a validator.
    ///
    /// `trusted_issuers` gates the response issuer; `identities` gates the
    /// asserted subject; `signature_validator` pins the verification
    /// certificate.
    #[must_use]
    pub fn new(
        trusted_issuers: Arc<TrustRegistry>,
        identities: Arc<IdentityMap>,
        signature_validator: XmlSignatureValidator,
    ) -> Self {
        Self {
            trusted_issuers,
            identities,
            signature_validator,
        }
    }

    /// Validates a signed response and returns the federated subject.
    ///
    /// Check order: structure, issuer trust, status, subject presence,
    /// subject federation, signature.
    ///
    /// # Errors
    ///
    /// Each check maps to one error variant; see [`SamlError`].
    pub fn validate(&self, signed_xml: &str) -> SamlResult<String> {
        let parsed = xml::parse_response_summary(signed_xml)?;

        if !self.trusted_issuers.is_trusted(&parsed.issuer) {
            return Err(SamlError::UntrustedIssuer(parsed.issuer));
        }

        if parsed.status_code != status_codes::SUCCESS {
            return Err(SamlError::AssertionDenied(parsed.status_code));
        }

        let subject = parsed.subject.ok_or(SamlError::MissingSubject)?;

        if !self.identities.is_federated(&subject) {
            return Err(SamlError::UnknownFederatedSubject(subject));
        }

        self.signature_validator.validate(signed_xml)?;

        tracing::debug!(subject = %subject, issuer = %parsed.issuer, "assertion validated");

        Ok(subject)
    }
}
