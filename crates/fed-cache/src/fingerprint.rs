//! Client-authentication fingerprint cache.
//!
//! When the authorization server accepts a SAML assertion it records the
//! assertion's fingerprint under the federated subject. The client later
//! presents that fingerprint as its secret at the token endpoint, which
//! binds token redemption to a specific completed SAML login.
//!
//! The original deployment used an ambient process-wide cache for this; here
//! it is an explicit store with a defined lifetime and an optional TTL. The
//! default configuration sets no TTL, preserving the observed behavior.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Cached fingerprint entry.
#[derive(Debug, Clone)]
struct Entry {
    secret: String,
    stored_at: DateTime<Utc>,
}

/// Short-lived verification cache for token-endpoint client authentication.
#[derive(Debug)]
pub struct FingerprintCache {
    entries: DashMap<String, Entry>,
    ttl: Option<Duration>,
}

impl FingerprintCache {
    /// Creates a cache whose entries never expire.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            ttl: None,
        }
    }

    /// Creates a cache whose entries expire after `ttl_seconds`.
    #[must_use]
    pub fn with_ttl(ttl_seconds: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Some(Duration::seconds(ttl_seconds)),
        }
    }

    /// Records the assertion fingerprint for a subject.
    ///
    /// A later login by the same subject replaces the previous entry, so the
    /// cache always reflects the most recent accepted assertion.
    pub fn insert(&self, subject: impl Into<String>, fingerprint: impl Into<String>) {
        self.entries.insert(
            subject.into(),
            Entry {
                secret: fingerprint.into(),
                stored_at: Utc::now(),
            },
        );
    }

    /// Compares a presented secret against the cached fingerprint.
    ///
    /// Returns `false` when no entry exists, the entry has expired, or the
    /// secret does not match.
    #[must_use]
    pub fn verify(&self, subject: &str, presented: &str) -> bool {
        let Some(entry) = self.entries.get(subject) else {
            return false;
        };

        if let Some(ttl) = self.ttl {
            if Utc::now() - entry.stored_at > ttl {
                drop(entry);
                self.entries.remove(subject);
                return false;
            }
        }

        entry.secret == presented
    }

    /// Returns whether a live entry exists for the subject.
    #[must_use]
    pub fn contains(&self, subject: &str) -> bool {
        let Some(entry) = self.entries.get(subject) else {
            return false;
        };

        match self.ttl {
            Some(ttl) => Utc::now() - entry.stored_at <= ttl,
            None => true,
        }
    }

    /// Drops the entry for a subject (consent declined, sign-out).
    pub fn remove(&self, subject: &str) {
        self.entries.remove(subject);
    }
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::new()
    }
}
