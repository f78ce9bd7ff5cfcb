//! SAML Response types.
//!
//! Response messages sent by an identity provider to a relying party.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Assertion, Status};

/// SAML Response.
///
/// A response message sent from an identity provider containing
/// authentication results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this response.
    pub issuer: String,

    /// The ID of the request this response is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL where this response was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The status of the response.
    pub status: Status,

    /// The assertions in this response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
}

fn default_version() -> String {
    "2.0".to_string()
}

impl Response {
    /// Creates a new success response.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: "2.0".to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            in_response_to: None,
            destination: None,
            status: Status::success(),
            assertions: Vec::new(),
        }
    }

    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Gets the first assertion if present.
    #[must_use]
    pub fn first_assertion(&self) -> Option<&Assertion> {
        self.assertions.first()
    }
}

/// Builder for creating SAML responses with assertions.
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Creates a new response builder.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            response: Response::success(issuer),
        }
    }

    /// Sets the request ID this response is for.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.response.in_response_to = Some(request_id.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn destination(mut self, url: impl Into<String>) -> Self {
        self.response.destination = Some(url.into());
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.response.status = status;
        self
    }

    /// Adds an assertion.
    #[must_use]
    pub fn assertion(mut self, assertion: Assertion) -> Self {
        self.response.assertions.push(assertion);
        self
    }

    /// Builds the response.
    #[must_use]
    pub fn build(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_success() {
        let response = ResponseBuilder::new("federation-idp")
            .in_response_to("_req123")
            .destination("http://client.example/acs")
            .assertion(Assertion::new("federation-idp"))
            .build();

        assert!(response.is_success());
        assert!(!response.id.is_empty());
        assert_eq!(response.in_response_to.as_deref(), Some("_req123"));
        assert_eq!(response.assertions.len(), 1);
        assert!(response.first_assertion().is_some());
    }

    #[test]
    fn response_error_status() {
        let response = ResponseBuilder::new("federation-idp")
            .status(Status::authn_failed("Invalid credentials"))
            .build();

        assert!(!response.is_success());
        assert!(response.assertions.is_empty());
    }
}
