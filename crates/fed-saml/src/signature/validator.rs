//! XML Signature validation.
//!
//! Validates enveloped signatures on SAML documents against pinned
//! certificates.

use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::xml::{extract_attribute, extract_element_content};

use super::{canonicalize, CanonicalizationAlgorithm, SignatureAlgorithm, XmlSignature};

/// XML signature validator.
///
/// Validates signatures on SAML documents using configured trusted
/// certificates (DER format).
pub struct XmlSignatureValidator {
    trusted_certificates: Vec<Vec<u8>>,
}

impl XmlSignatureValidator {
    /// Creates a new validator with the given trusted certificates.
    #[must_use]
    pub fn new(trusted_certificates: Vec<Vec<u8>>) -> Self {
        Self {
            trusted_certificates,
        }
    }

    /// Creates a validator from PEM-encoded certificates.
    ///
    /// # Errors
    ///
    /// Returns an error if any certificate PEM cannot be decoded.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let mut certs = Vec::new();
        for pem in certificates_pem {
            let der = fed_crypto::pem_to_der(pem, "CERTIFICATE")
                .ok_or_else(|| SamlError::Crypto("Invalid certificate PEM".to_string()))?;
            certs.push(der);
        }
        Ok(Self::new(certs))
    }

    /// Validates an XML signature.
    ///
    /// # Arguments
    ///
    /// * `xml` - The signed XML document
    ///
    /// # Errors
    ///
    /// Returns `SignatureInvalid` when the document carries no valid
    /// signature over the referenced element.
    pub fn validate(&self, xml: &str) -> SamlResult<XmlSignature> {
        // Extract the signature element
        let signature = extract_signature(xml)?;

        // Find the certificate to use for validation
        let cert = self.find_certificate(&signature)?;

        // Verify the digest over the referenced element
        verify_digest(xml, &signature)?;

        // Verify the signature over SignedInfo
        self.verify_signature(&signature, &cert)?;

        Ok(signature)
    }

    /// Finds a certificate for validation.
    ///
    /// An embedded certificate is only used when it matches a pinned one (or
    /// when no pins are configured at all, for tests).
    fn find_certificate(&self, signature: &XmlSignature) -> SamlResult<Vec<u8>> {
        if let Some(ref cert_b64) = signature.x509_certificate {
            let cert_der = base64::engine::general_purpose::STANDARD
                .decode(cert_b64)
                .map_err(|e| {
                    SamlError::SignatureInvalid(format!("Invalid certificate encoding: {e}"))
                })?;

            if self.trusted_certificates.iter().any(|tc| tc == &cert_der) {
                return Ok(cert_der);
            }

            if self.trusted_certificates.is_empty() {
                return Ok(cert_der);
            }
        }

        self.trusted_certificates
            .first()
            .cloned()
            .ok_or_else(|| SamlError::SignatureInvalid("No certificate available".to_string()))
    }

    /// Verifies the signature value over the rebuilt SignedInfo.
    fn verify_signature(&self, signature: &XmlSignature, cert_der: &[u8]) -> SamlResult<()> {
        let signed_info = rebuild_signed_info(signature);
        let canonical_signed_info = canonicalize(&signed_info);

        let signature_bytes = base64::engine::general_purpose::STANDARD
            .decode(&signature.signature_value)
            .map_err(|e| SamlError::SignatureInvalid(format!("Invalid signature encoding: {e}")))?;

        let public_key = extract_public_key_from_cert(cert_der)?;

        let valid = fed_crypto::rsa_verify(
            &public_key,
            canonical_signed_info.as_bytes(),
            &signature_bytes,
            signature.algorithm.rsa_algorithm(),
        )
        .map_err(|e| SamlError::SignatureInvalid(format!("Signature verification error: {e}")))?;

        if valid {
            Ok(())
        } else {
            Err(SamlError::SignatureInvalid(
                "Signature verification failed".to_string(),
            ))
        }
    }
}

/// Extracts signature information from an XML document.
fn extract_signature(xml: &str) -> SamlResult<XmlSignature> {
    if !xml.contains("<ds:Signature") && !xml.contains("<Signature") {
        return Err(SamlError::SignatureInvalid(
            "No Signature element found".to_string(),
        ));
    }

    let algorithm = extract_attribute(xml, "SignatureMethod", "Algorithm")
        .and_then(|uri| SignatureAlgorithm::from_uri(&uri))
        .ok_or_else(|| SamlError::SignatureInvalid("Invalid signature algorithm".to_string()))?;

    let canonicalization = extract_attribute(xml, "CanonicalizationMethod", "Algorithm")
        .and_then(|uri| CanonicalizationAlgorithm::from_uri(&uri))
        .unwrap_or_default();

    let reference_uri = extract_attribute(xml, "Reference", "URI")
        .ok_or_else(|| SamlError::SignatureInvalid("No Reference URI found".to_string()))?;

    let digest_value = extract_element_content(xml, "DigestValue")
        .ok_or_else(|| SamlError::SignatureInvalid("No DigestValue found".to_string()))?;

    let signature_value = extract_element_content(xml, "SignatureValue")
        .ok_or_else(|| SamlError::SignatureInvalid("No SignatureValue found".to_string()))?;

    let x509_certificate = extract_element_content(xml, "X509Certificate");

    Ok(XmlSignature {
        algorithm,
        canonicalization,
        reference_uri,
        digest_value: digest_value.chars().filter(|c| !c.is_whitespace()).collect(),
        signature_value: signature_value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
        x509_certificate: x509_certificate
            .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect()),
    })
}

/// Verifies the digest value in the signature.
fn verify_digest(xml: &str, signature: &XmlSignature) -> SamlResult<()> {
    let reference_id = signature
        .reference_uri
        .strip_prefix('#')
        .unwrap_or(&signature.reference_uri);

    let element = extract_referenced_element(xml, reference_id)?;

    // Remove the Signature element for digest calculation (enveloped profile)
    let element_without_sig = remove_signature_element(&element);

    let canonical = canonicalize(&element_without_sig);
    let calculated = calculate_digest(&canonical, signature.algorithm);
    let calculated_b64 = base64::engine::general_purpose::STANDARD.encode(&calculated);

    if calculated_b64 != signature.digest_value {
        return Err(SamlError::SignatureInvalid(
            "Digest value mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Extracts the referenced element from the document.
fn extract_referenced_element(xml: &str, reference_id: &str) -> SamlResult<String> {
    let id_pattern = format!("ID=\"{reference_id}\"");
    let alt_pattern = format!("Id=\"{reference_id}\"");

    let pos = xml
        .find(&id_pattern)
        .or_else(|| xml.find(&alt_pattern))
        .ok_or_else(|| {
            SamlError::SignatureInvalid(format!("Referenced element '{reference_id}' not found"))
        })?;

    // Find the start of the element
    let mut start = pos;
    while start > 0 && xml.as_bytes()[start - 1] != b'<' {
        start -= 1;
    }
    if start > 0 {
        start -= 1;
    }

    // Find the element name (with any namespace prefix)
    let mut name_end = start + 1;
    while name_end < xml.len() && xml.as_bytes()[name_end] != b' ' && xml.as_bytes()[name_end] != b'>'
    {
        name_end += 1;
    }
    let full_tag_name = &xml[start + 1..name_end];

    // Prefer the fully qualified closing tag, fall back to the local name
    let close_full = format!("</{full_tag_name}>");
    if let Some(close_pos) = xml[start..].find(&close_full) {
        return Ok(xml[start..start + close_pos + close_full.len()].to_string());
    }

    let local_name = full_tag_name.split(':').next_back().unwrap_or(full_tag_name);
    let close_local = format!("</{local_name}>");
    let close_pos = xml[start..].find(&close_local).ok_or_else(|| {
        SamlError::SignatureInvalid("Referenced element is not properly closed".to_string())
    })?;

    Ok(xml[start..start + close_pos + close_local.len()].to_string())
}

/// Removes the Signature element from XML content.
fn remove_signature_element(xml: &str) -> String {
    let patterns = [
        ("<ds:Signature", "</ds:Signature>"),
        ("<Signature", "</Signature>"),
    ];

    let mut result = xml.to_string();
    for (open, close) in &patterns {
        if let Some(start) = result.find(open) {
            if let Some(end_offset) = result[start..].find(close) {
                let end = start + end_offset + close.len();
                result = format!("{}{}", &result[..start], &result[end..]);
                break;
            }
        }
    }
    result
}

/// Calculates the digest of data.
fn calculate_digest(data: &str, algorithm: SignatureAlgorithm) -> Vec<u8> {
    match algorithm {
        SignatureAlgorithm::RsaSha256 => fed_crypto::sha256(data.as_bytes()),
        SignatureAlgorithm::RsaSha384 => fed_crypto::sha384(data.as_bytes()),
        SignatureAlgorithm::RsaSha512 => fed_crypto::sha512(data.as_bytes()),
    }
}

/// Rebuilds the SignedInfo element for verification.
///
/// Must stay byte-identical to the signer's `build_signed_info` template.
fn rebuild_signed_info(signature: &XmlSignature) -> String {
    format!(
        r#"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
<ds:CanonicalizationMethod Algorithm="{}"/>
<ds:SignatureMethod Algorithm="{}"/>
<ds:Reference URI="{}">
<ds:Transforms>
<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>
<ds:Transform Algorithm="{}"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="{}"/>
<ds:DigestValue>{}</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>"#,
        signature.canonicalization.uri(),
        signature.algorithm.uri(),
        signature.reference_uri,
        signature.canonicalization.uri(),
        signature.algorithm.digest_uri(),
        signature.digest_value
    )
}

/// Extracts the public key from an X.509 certificate.
fn extract_public_key_from_cert(cert_der: &[u8]) -> SamlResult<Vec<u8>> {
    use x509_parser::prelude::*;

    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| SamlError::Crypto(format!("Failed to parse certificate: {e}")))?;

    // The SubjectPublicKeyInfo as raw DER bytes
    let spki = cert.public_key().raw;
    Ok(spki.to_vec())
}
