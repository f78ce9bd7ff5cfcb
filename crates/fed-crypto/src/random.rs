//! Cryptographically secure random number generation.
//!
//! This module provides secure random generation for flow-correlation state
//! identifiers and token-signing secrets.
//!
//! All functions use cryptographically secure random number generators
//! suitable for security-sensitive operations.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates a cryptographically secure random byte array.
///
/// Uses the thread-local random number generator which is cryptographically
/// secure by default.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a cryptographically secure random string.
///
/// The string contains alphanumeric characters (a-z, A-Z, 0-9) and is
/// suitable for authorization codes, state identifiers, and other tokens.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a secure random flow-state identifier.
///
/// Creates a 32-character alphanumeric identifier correlating the redirect
/// hops of a single login attempt.
///
/// # Security
///
/// The identifier has approximately 190 bits of entropy (log2(62^32)),
/// well beyond what an attacker could guess within one login attempt.
#[must_use]
pub fn generate_state_id() -> String {
    random_alphanumeric(32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_bytes_produces_correct_length() {
        assert_eq!(random_bytes(16).len(), 16);
        assert_eq!(random_bytes(32).len(), 32);
    }

    #[test]
    fn random_bytes_produces_different_values() {
        let a = random_bytes(32);
        let b = random_bytes(32);
        assert_ne!(a, b);
    }

    #[test]
    fn random_alphanumeric_only_contains_valid_chars() {
        let s = random_alphanumeric(1000);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generate_state_id_format() {
        let id = generate_state_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generate_state_id_uniqueness() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_state_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
