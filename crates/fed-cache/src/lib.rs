//! # fed-cache
//!
//! Process-memory stores shared across concurrently executing request
//! handlers. Everything here is lost on restart; that property is part of
//! the protocol's contract, not an accident.
//!
//! The stores are the only cross-request mutable state in the system, so
//! they carry the concurrency invariants: a single-use entry is observed by
//! exactly one taker, and a losing concurrent taker sees absence, never a
//! stale value.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod fingerprint;
pub mod store;

pub use fingerprint::FingerprintCache;
pub use store::SingleUseStore;
