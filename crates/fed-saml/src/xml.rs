//! XML serialization and extraction for SAML messages.
//!
//! Serialization is template-based; parsing is lenient string extraction.
//! The documents are produced by this suite itself and integrity is carried
//! by the XML signature, so a full XML stack is not required here.

use crate::error::{SamlError, SamlResult};
use crate::types::constants::{NS_ASSERTION, NS_PROTOCOL};
use crate::types::{AuthnRequest, Response};

/// Timestamp format used in SAML documents.
const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Serializes an authentication request to XML.
#[must_use]
pub fn serialize_authn_request(request: &AuthnRequest) -> String {
    let name_id_policy = request
        .name_id_policy
        .as_ref()
        .map(|policy| {
            format!(
                "\n<samlp:NameIDPolicy Format=\"{}\" AllowCreate=\"{}\"/>",
                policy.format, policy.allow_create
            )
        })
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:AuthnRequest xmlns:samlp="{}" xmlns:saml="{}" ID="{}" Version="{}" IssueInstant="{}">
<saml:Issuer>{}</saml:Issuer>{}
</samlp:AuthnRequest>"#,
        NS_PROTOCOL,
        NS_ASSERTION,
        request.id,
        request.version,
        request.issue_instant.format(INSTANT_FORMAT),
        request.issuer,
        name_id_policy
    )
}

/// Serializes a response, including its assertion, to XML.
#[must_use]
pub fn serialize_response(response: &Response) -> String {
    let in_response_to = response
        .in_response_to
        .as_deref()
        .map(|id| format!(" InResponseTo=\"{id}\""))
        .unwrap_or_default();

    let destination = response
        .destination
        .as_deref()
        .map(|url| format!(" Destination=\"{url}\""))
        .unwrap_or_default();

    let assertions: String = response.assertions.iter().map(serialize_assertion).collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:Response xmlns:samlp="{}" xmlns:saml="{}" ID="{}" Version="{}" IssueInstant="{}"{}{}>
<saml:Issuer>{}</saml:Issuer>
<samlp:Status>
<samlp:StatusCode Value="{}"/>
</samlp:Status>
{}</samlp:Response>"#,
        NS_PROTOCOL,
        NS_ASSERTION,
        response.id,
        response.version,
        response.issue_instant.format(INSTANT_FORMAT),
        in_response_to,
        destination,
        response.issuer,
        response.status.status_code.value,
        assertions
    )
}

fn serialize_assertion(assertion: &crate::types::Assertion) -> String {
    let subject = assertion
        .subject
        .as_ref()
        .map(|subject| {
            let name_id = format!(
                "<saml:NameID Format=\"{}\">{}</saml:NameID>",
                subject.name_id.format.as_deref().unwrap_or_default(),
                subject.name_id.value
            );

            let confirmations: String = subject
                .subject_confirmations
                .iter()
                .map(|confirmation| {
                    let data = confirmation
                        .subject_confirmation_data
                        .as_ref()
                        .map(|data| {
                            format!(
                                "\n<saml:SubjectConfirmationData InResponseTo=\"{}\" Recipient=\"{}\" NotOnOrAfter=\"{}\"/>",
                                data.in_response_to.as_deref().unwrap_or_default(),
                                data.recipient.as_deref().unwrap_or_default(),
                                data.not_on_or_after
                                    .map(|t| t.format(INSTANT_FORMAT).to_string())
                                    .unwrap_or_default()
                            )
                        })
                        .unwrap_or_default();
                    format!(
                        "\n<saml:SubjectConfirmation Method=\"{}\">{}\n</saml:SubjectConfirmation>",
                        confirmation.method, data
                    )
                })
                .collect();

            format!("\n<saml:Subject>\n{name_id}{confirmations}\n</saml:Subject>")
        })
        .unwrap_or_default();

    let conditions = assertion
        .conditions
        .as_ref()
        .map(|conditions| {
            let audiences: String = conditions
                .audience_restrictions
                .iter()
                .flat_map(|restriction| restriction.audiences.iter())
                .map(|audience| format!("\n<saml:Audience>{audience}</saml:Audience>"))
                .collect();

            format!(
                "\n<saml:Conditions NotBefore=\"{}\" NotOnOrAfter=\"{}\">\n<saml:AudienceRestriction>{}\n</saml:AudienceRestriction>\n</saml:Conditions>",
                conditions
                    .not_before
                    .map(|t| t.format(INSTANT_FORMAT).to_string())
                    .unwrap_or_default(),
                conditions
                    .not_on_or_after
                    .map(|t| t.format(INSTANT_FORMAT).to_string())
                    .unwrap_or_default(),
                audiences
            )
        })
        .unwrap_or_default();

    let authn_statement = assertion
        .authn_statement
        .as_ref()
        .map(|statement| {
            format!(
                "\n<saml:AuthnStatement AuthnInstant=\"{}\" SessionIndex=\"{}\">\n<saml:AuthnContext>\n<saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef>\n</saml:AuthnContext>\n</saml:AuthnStatement>",
                statement.authn_instant.format(INSTANT_FORMAT),
                statement.session_index.as_deref().unwrap_or_default(),
                statement.authn_context_class_ref
            )
        })
        .unwrap_or_default();

    format!(
        "<saml:Assertion ID=\"{}\" Version=\"{}\" IssueInstant=\"{}\">\n<saml:Issuer>{}</saml:Issuer>{}{}{}\n</saml:Assertion>\n",
        assertion.id,
        assertion.version,
        assertion.issue_instant.format(INSTANT_FORMAT),
        assertion.issuer,
        subject,
        conditions,
        authn_statement
    )
}

/// Parsed authentication request fields.
#[derive(Debug, Clone)]
pub struct ParsedAuthnRequest {
    /// The unique identifier of the request.
    pub id: String,
    /// The issuer (relying party entity ID).
    pub issuer: String,
    /// The requested NameID format.
    pub name_id_format: Option<String>,
}

/// Parses an authentication request from XML.
///
/// # Errors
///
/// Returns `XmlParse` when the document is not an AuthnRequest and
/// `MissingElement` when a required field is absent.
pub fn parse_authn_request(xml: &str) -> SamlResult<ParsedAuthnRequest> {
    if !xml.contains("<samlp:AuthnRequest") && !xml.contains("<AuthnRequest") {
        return Err(SamlError::XmlParse("not a SAML AuthnRequest".to_string()));
    }

    let id = extract_attribute(xml, "AuthnRequest", "ID")
        .ok_or_else(|| SamlError::MissingElement("AuthnRequest ID".to_string()))?;

    let issuer = extract_element_content(xml, "Issuer")
        .filter(|issuer| !issuer.is_empty())
        .ok_or_else(|| SamlError::MissingElement("Issuer".to_string()))?;

    let name_id_format = extract_attribute(xml, "NameIDPolicy", "Format");

    Ok(ParsedAuthnRequest {
        id,
        issuer,
        name_id_format,
    })
}

/// Structural summary of a SAML response.
///
/// Only the fields the validation pipeline inspects; the signature check
/// operates on the raw document.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    /// The response-level issuer.
    pub issuer: String,
    /// The top-level status code URI.
    pub status_code: String,
    /// The asserted subject NameID, when present and non-empty.
    pub subject: Option<String>,
}

/// Parses the fields of a response that validation inspects.
///
/// # Errors
///
/// Returns `XmlParse` when the document is not a Response and
/// `MissingElement` when issuer or status are absent.
pub fn parse_response_summary(xml: &str) -> SamlResult<ParsedResponse> {
    if !xml.contains("<samlp:Response") && !xml.contains("<Response") {
        return Err(SamlError::XmlParse("not a SAML Response".to_string()));
    }

    let issuer = extract_element_content(xml, "Issuer")
        .filter(|issuer| !issuer.is_empty())
        .ok_or_else(|| SamlError::MissingElement("Issuer".to_string()))?;

    let status_code = extract_attribute(xml, "StatusCode", "Value")
        .ok_or_else(|| SamlError::MissingElement("StatusCode".to_string()))?;

    let subject = extract_element_content(xml, "NameID").filter(|name| !name.is_empty());

    Ok(ParsedResponse {
        issuer,
        status_code,
        subject,
    })
}

/// Extracts an attribute value from an XML element.
///
/// Tries common namespace prefixes and requires the element name to match
/// exactly (not as a prefix of a longer name).
pub(crate) fn extract_attribute(xml: &str, element: &str, attribute: &str) -> Option<String> {
    for prefix in ["samlp:", "saml:", "ds:", ""] {
        let open = format!("<{prefix}{element}");
        let mut search = 0;
        while let Some(found) = xml[search..].find(&open) {
            let start = search + found;
            let after = xml.as_bytes().get(start + open.len()).copied();
            if !matches!(after, Some(b' ') | Some(b'>') | Some(b'/') | Some(b'\n') | Some(b'\t')) {
                search = start + open.len();
                continue;
            }

            let end = xml[start..].find('>')?;
            let element_str = &xml[start..start + end];

            let attr_pattern = format!(" {attribute}=\"");
            if let Some(attr_start) = element_str.find(&attr_pattern) {
                let value_start = attr_start + attr_pattern.len();
                let value_end = element_str[value_start..].find('"')?;
                return Some(element_str[value_start..value_start + value_end].to_string());
            }
            search = start + end;
        }
    }
    None
}

/// Extracts the text content of an XML element.
pub(crate) fn extract_element_content(xml: &str, element: &str) -> Option<String> {
    for prefix in ["saml:", "samlp:", "ds:", ""] {
        let open = format!("<{prefix}{element}");
        let close = format!("</{prefix}{element}>");
        let mut search = 0;
        while let Some(found) = xml[search..].find(&open) {
            let start = search + found;
            let after = xml.as_bytes().get(start + open.len()).copied();
            if !matches!(after, Some(b' ') | Some(b'>') | Some(b'/') | Some(b'\n') | Some(b'\t')) {
                search = start + open.len();
                continue;
            }

            let tag_end = start + xml[start..].find('>')?;
            if xml.as_bytes()[tag_end - 1] == b'/' {
                // Self-closing element carries no content.
                search = tag_end;
                continue;
            }

            let content_start = tag_end + 1;
            let end = xml[content_start..].find(&close)?;
            return Some(xml[content_start..content_start + end].trim().to_string());
        }
    }
    None
}
