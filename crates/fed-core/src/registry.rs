//! Read-only trust and identity registries.
//!
//! The original deployment kept these as static in-process dictionaries; here
//! they are explicit registries injected into the services that need them,
//! populated once at startup and shared behind `Arc`.

use std::collections::HashMap;

/// Registry of trusted parties.
///
/// Maps a party identifier (a SAML issuer entity ID or an OAuth client ID) to
/// the single redirect/return URL registered for it. Lookup is the only
/// operation; there is no mutation after construction.
#[derive(Debug, Clone, Default)]
pub struct TrustRegistry {
    parties: HashMap<String, String>,
}

impl TrustRegistry {
    /// Builds a registry from `(party, redirect_uri)` pairs.
    #[must_use]
    pub fn new<I, S>(parties: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            parties: parties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Looks up the registered redirect URI for a party.
    #[must_use]
    pub fn lookup(&self, party: &str) -> Option<&str> {
        self.parties.get(party).map(String::as_str)
    }

    /// Returns whether the party is registered at all.
    #[must_use]
    pub fn is_trusted(&self, party: &str) -> bool {
        self.parties.contains_key(party)
    }
}

/// Mapping between local principals and federation-wide subject names.
///
/// The federated name is the identity agreed between the identity provider
/// and the authorization server; it is distinct from the local username and
/// fixed configuration, not user-editable at runtime.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    by_local: HashMap<String, String>,
}

impl IdentityMap {
    /// Builds a map from `(local, federated)` pairs.
    #[must_use]
    pub fn new<I, S>(mappings: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            by_local: mappings
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Resolves a local username to its federated subject name.
    #[must_use]
    pub fn federated(&self, local: &str) -> Option<&str> {
        self.by_local.get(local).map(String::as_str)
    }

    /// Returns whether a subject name is a known federated identity.
    #[must_use]
    pub fn is_federated(&self, subject: &str) -> bool {
        self.by_local.values().any(|v| v == subject)
    }

    /// Iterates over all `(local, federated)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_local.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_lookup() {
        let registry = TrustRegistry::new([("http://client.example", "http://client.example/acs")]);
        assert_eq!(
            registry.lookup("http://client.example"),
            Some("http://client.example/acs")
        );
        assert!(registry.lookup("http://other.example").is_none());
        assert!(registry.is_trusted("http://client.example"));
        assert!(!registry.is_trusted("http://other.example"));
    }

    #[test]
    fn identity_mapping_both_directions() {
        let map = IdentityMap::new([("user", "federatedusername")]);
        assert_eq!(map.federated("user"), Some("federatedusername"));
        assert!(map.federated("stranger").is_none());
        assert!(map.is_federated("federatedusername"));
        assert!(!map.is_federated("user"));
    }
}
