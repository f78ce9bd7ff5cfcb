//! # fed-saml
//!
//! SAML 2.0 support for the federation suite: the protocol data model,
//! XML serialization, enveloped XML-DSig signing and validation, the
//! HTTP-POST binding, and the two protocol operations built on top of them:
//!
//! - [`AssertionIssuer`] builds a signed response for an authenticated
//!   local subject (the identity provider side).
//! - [`AssertionValidator`] verifies an incoming response and extracts the
//!   federated subject (the authorization server side).
//!
//! XML handling is deliberately string-based and lenient: the documents are
//! produced by this suite itself, and the signature check is what carries
//! the integrity guarantee.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod bindings;
pub mod error;
pub mod issuer;
pub mod signature;
pub mod types;
pub mod validate;
pub mod xml;

pub use error::{SamlError, SamlResult};
pub use issuer::{AssertionIssuer, IssuedAssertion};
pub use validate::AssertionValidator;
