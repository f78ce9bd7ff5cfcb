//! SAML NameID type.

use serde::{Deserialize, Serialize};

use super::constants::name_id_formats;

/// SAML name identifier.
///
/// Identifies a subject by name, optionally qualified with a format URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The identifier value.
    pub value: String,

    /// The format of the identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl NameId {
    /// Creates a name ID with the unspecified format.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: Some(name_id_formats::UNSPECIFIED.to_string()),
        }
    }

    /// Creates an email-format name ID.
    #[must_use]
    pub fn email(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: Some(name_id_formats::EMAIL.to_string()),
        }
    }

    /// Creates a persistent name ID.
    #[must_use]
    pub fn persistent(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: Some(name_id_formats::PERSISTENT.to_string()),
        }
    }
}
