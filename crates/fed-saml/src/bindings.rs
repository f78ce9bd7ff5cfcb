//! SAML message transport bindings.
//!
//! Two transports are used by this suite:
//!
//! - query transport: the AuthnRequest rides base64-encoded in the
//!   `SAMLRequest` query parameter of a redirect;
//! - HTTP-POST binding: responses ride base64-encoded in an auto-submitting
//!   HTML form.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

/// Encodes a SAML message for query-parameter transport.
#[must_use]
pub fn encode_message(xml: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xml)
}

/// Decodes a base64 SAML message back to XML.
///
/// # Errors
///
/// Returns an error when the payload is not valid base64 or UTF-8.
pub fn decode_message(encoded: &str) -> SamlResult<String> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

    String::from_utf8(decoded)
        .map_err(|e| SamlError::InvalidRequest(format!("Invalid UTF-8 in message: {e}")))
}

/// HTTP-POST binding encoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a SAML response for HTTP-POST binding.
    ///
    /// Returns an HTML form that auto-submits the base64 payload to the
    /// destination as the `SAMLResponse` parameter.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str) -> String {
        Self::form(&encode_message(xml), destination)
    }

    /// Builds the auto-submit form for an already-encoded payload.
    #[must_use]
    pub fn form(encoded: &str, destination: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="SAMLResponse" value="{}"/>
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            html_escape(encoded)
        )
    }
}

/// Escapes HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
