//! Assertion issuance.
//!
//! The identity-provider side of the federation: builds a signed SAML
//! response asserting a federated identity for an authenticated local
//! subject.

use std::sync::Arc;

use fed_core::IdentityMap;

use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSigner;
use crate::types::{
    Assertion, AuthnStatement, Conditions, NameId, ResponseBuilder, Subject, SubjectConfirmation,
    SubjectConfirmationData,
};
use crate::xml;

/// A freshly issued, signed assertion.
#[derive(Debug, Clone)]
pub struct IssuedAssertion {
    /// The signed response document.
    pub xml: String,
    /// The federated subject the assertion speaks for.
    pub federated_subject: String,
}

/// Builds signed SAML responses for authenticated local subjects.
///
/// Stateless: issuing an assertion stores nothing.
pub struct AssertionIssuer {
    entity_id: String,
    identities: Arc<IdentityMap>,
    signer: XmlSigner,
    validity_seconds: i64,
}

impl AssertionIssuer {
    /// Default assertion validity window in seconds.
    pub const DEFAULT_VALIDITY_SECONDS: i64 = 60;

    /// Creates an issuer for the given identity-provider entity ID.
    #[must_use]
    pub fn new(entity_id: impl Into<String>, identities: Arc<IdentityMap>, signer: XmlSigner) -> Self {
        Self {
            entity_id: entity_id.into(),
            identities,
            signer,
            validity_seconds: Self::DEFAULT_VALIDITY_SECONDS,
        }
    }

    /// Overrides the assertion validity window.
    #[must_use]
    pub const fn with_validity(mut self, validity_seconds: i64) -> Self {
        self.validity_seconds = validity_seconds;
        self
    }

    /// Returns the issuer entity ID.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Issues a signed assertion for an authenticated local subject.
    ///
    /// The credential check is delegated to the caller; `credentials_valid`
    /// reports its outcome. The requester becomes both the audience and the
    /// intended recipient of the response.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed` when `credentials_valid` is false
    /// - `UnknownSubject` when the local subject has no federated mapping
    /// - `SignatureCreation` when signing fails
    pub fn issue(
        &self,
        local_subject: &str,
        credentials_valid: bool,
        audience: &str,
        requester: &str,
    ) -> SamlResult<IssuedAssertion> {
        if !credentials_valid {
            return Err(SamlError::AuthenticationFailed);
        }

        let federated = self
            .identities
            .federated(local_subject)
            .ok_or_else(|| SamlError::UnknownSubject(local_subject.to_string()))?
            .to_string();

        let assertion = Assertion::new(&self.entity_id)
            .with_subject(
                Subject::new(NameId::new(&federated)).with_confirmation(
                    SubjectConfirmation::bearer()
                        .with_data(SubjectConfirmationData::for_request("", requester)),
                ),
            )
            .with_conditions(
                Conditions::with_validity(self.validity_seconds).with_audience(audience),
            )
            .with_authn_statement(AuthnStatement::password());

        let response = ResponseBuilder::new(&self.entity_id)
            .destination(requester)
            .assertion(assertion)
            .build();

        let response_id = response.id.clone();
        let unsigned_xml = xml::serialize_response(&response);

        let signed_xml = self.signer.sign(&unsigned_xml, &response_id)?;

        tracing::debug!(subject = %federated, requester, "issued signed assertion");

        Ok(IssuedAssertion {
            xml: signed_xml,
            federated_subject: federated,
        })
    }
}
