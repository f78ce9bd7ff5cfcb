//! # fed-server
//!
//! One binary hosting the four cooperating parties of the federation demo,
//! each under its own route prefix:
//!
//! - `/saml`: the SAML identity provider
//! - `/oauth`: the OAuth 2.0 authorization server
//! - `/client`: the relying application driving the redirect chain
//! - `/api/resource`: the protected resource
//!
//! The parties talk to each other over real HTTP (browser redirects plus
//! the client's back-channel token exchange), so the trust boundaries of
//! the protocol are exercised even in a single process.

#![forbid(unsafe_code)]
#![deny(warnings)]

pub mod authz;
pub mod client;
pub mod config;
pub mod flow;
pub mod idp;
pub mod resource;
pub mod router;
pub mod state;
pub mod ui;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;
