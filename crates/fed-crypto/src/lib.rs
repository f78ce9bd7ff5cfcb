//! # fed-crypto
//!
//! Cryptographic operations for the federation suite using aws-lc-rs.
//!
//! Signature algorithms are consumed from aws-lc-rs, never reimplemented;
//! this crate only maps the protocol's algorithm identifiers onto them and
//! provides the hash and random-generation helpers the services share.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod hash;
pub mod random;
pub mod rsa;

pub use hash::{sha256, sha384, sha512, HashAlgorithm};
pub use rsa::{pem_to_der, rsa_sign, rsa_verify, RsaAlgorithm, SignatureError};
