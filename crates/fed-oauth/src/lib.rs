//! # fed-oauth
//!
//! The authorization-server and resource-server core of the federation
//! suite: identity tickets, single-use authorization grants, bearer-token
//! issuance and validation, and the resource guard.
//!
//! Client authentication at the token endpoint is deliberately non-standard:
//! the client's secret is the fingerprint of the SAML response that signed
//! it in, binding token redemption to a specific completed SAML login. This
//! preserves the behavior of the system this suite interoperates with.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod error;
pub mod grants;
pub mod guard;
pub mod ticket;
pub mod token;

pub use error::{OAuthError, OAuthResult};
pub use grants::{GrantStore, PendingFlow, RefreshTokenCodec, TokenProvider};
pub use guard::ResourceGuard;
pub use ticket::{assertion_fingerprint, Claim, Ticket};
pub use token::{TokenIssuer, TokenResponse};
