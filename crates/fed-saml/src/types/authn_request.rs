//! SAML AuthnRequest type.
//!
//! Authentication requests sent by a relying party to the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constants::name_id_formats;

/// SAML authentication request.
///
/// Created by the relying party, consumed once by the identity provider;
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the requesting party.
    pub issuer: String,

    /// Requested name identifier policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,
}

fn default_version() -> String {
    "2.0".to_string()
}

impl AuthnRequest {
    /// Creates a new request for the given issuer.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: "2.0".to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            name_id_policy: Some(NameIdPolicy::default()),
        }
    }
}

/// Name identifier policy requested by the relying party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// Requested name ID format.
    pub format: String,

    /// Whether the identity provider may create a new identifier.
    pub allow_create: bool,
}

impl Default for NameIdPolicy {
    fn default() -> Self {
        Self {
            format: name_id_formats::UNSPECIFIED.to_string(),
            allow_create: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_creation() {
        let request = AuthnRequest::new("http://client.example");
        assert!(request.id.starts_with("_id"));
        assert_eq!(request.version, "2.0");
        assert_eq!(request.issuer, "http://client.example");
        assert!(request.name_id_policy.is_some());
    }

    #[test]
    fn request_ids_are_unique() {
        let a = AuthnRequest::new("http://client.example");
        let b = AuthnRequest::new("http://client.example");
        assert_ne!(a.id, b.id);
    }
}
