//! XML Signature creation.
//!
//! Signs SAML documents using the enveloped XML-DSig profile.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{canonicalize, SignatureAlgorithm, SignatureConfig};

/// XML document signer.
///
/// Signs SAML documents using the configured private key.
pub struct XmlSigner {
    /// The private key in DER format.
    private_key_der: Vec<u8>,
    /// The X.509 certificate in DER format (optional).
    certificate_der: Option<Vec<u8>>,
    /// Signature configuration.
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a new signer with an RSA private key.
    ///
    /// # Arguments
    ///
    /// * `private_key_der` - The private key in DER format
    /// * `certificate_der` - Optional X.509 certificate in DER format
    #[must_use]
    pub fn new(private_key_der: Vec<u8>, certificate_der: Option<Vec<u8>>) -> Self {
        Self {
            private_key_der,
            certificate_der,
            config: SignatureConfig::default(),
        }
    }

    /// Creates a new signer from PEM-encoded key and certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the private key PEM cannot be decoded.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let private_key_der = fed_crypto::pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| fed_crypto::pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| SamlError::Crypto("Invalid private key PEM".to_string()))?;

        let certificate_der =
            certificate_pem.and_then(|pem| fed_crypto::pem_to_der(pem, "CERTIFICATE"));

        Ok(Self::new(private_key_der, certificate_der))
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Signs an XML document.
    ///
    /// # Arguments
    ///
    /// * `xml` - The XML document to sign
    /// * `reference_id` - The ID of the element to sign (without the '#' prefix)
    ///
    /// # Returns
    ///
    /// The signed XML document with the `<ds:Signature>` element inserted
    /// after the signed element's `Issuer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced element cannot be located or
    /// signing fails.
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        // Find the element to sign and where to insert the signature
        let (element_start, insert_position) = find_element_and_insert_position(xml, reference_id)?;

        // Canonicalize the element for digest calculation
        let element = extract_element(xml, element_start)?;
        let canonical_element = canonicalize(&element);

        // Calculate the digest
        let digest = calculate_digest(&canonical_element, self.config.algorithm);
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(&digest);

        // Build the SignedInfo element
        let signed_info = build_signed_info(
            reference_id,
            &digest_b64,
            self.config.algorithm,
            self.config.canonicalization,
        );

        // Sign the canonical SignedInfo
        let canonical_signed_info = canonicalize(&signed_info);
        let signature_value = fed_crypto::rsa_sign(
            &self.private_key_der,
            canonical_signed_info.as_bytes(),
            self.config.algorithm.rsa_algorithm(),
        )
        .map_err(|e| SamlError::SignatureCreation(format!("RSA signing failed: {e}")))?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(&signature_value);

        // Build the complete Signature element and insert it
        let signature_element = build_signature_element(
            &signed_info,
            &signature_b64,
            self.certificate_der.as_deref(),
            &self.config,
        );

        Ok(insert_signature(xml, insert_position, &signature_element))
    }
}

/// Finds the element to sign and determines where to insert the signature.
fn find_element_and_insert_position(xml: &str, reference_id: &str) -> SamlResult<(usize, usize)> {
    let id_pattern = format!("ID=\"{reference_id}\"");
    let alt_pattern = format!("Id=\"{reference_id}\"");

    let id_pos = xml
        .find(&id_pattern)
        .or_else(|| xml.find(&alt_pattern))
        .ok_or_else(|| {
            SamlError::SignatureCreation(format!("Element with ID '{reference_id}' not found"))
        })?;

    // Find the start of the element (go back to find '<')
    let mut tag_start = id_pos;
    while tag_start > 0 && xml.as_bytes()[tag_start - 1] != b'<' {
        tag_start -= 1;
    }
    if tag_start > 0 {
        tag_start -= 1;
    }

    // Find the end of the opening tag
    let tag_end = xml[id_pos..]
        .find('>')
        .map(|pos| id_pos + pos + 1)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;

    // For SAML, the signature is inserted after the Issuer element if present
    let insert_pos = find_issuer_end(xml, tag_end).unwrap_or(tag_end);

    Ok((tag_start, insert_pos))
}

/// Finds the end of the Issuer element after the given position.
fn find_issuer_end(xml: &str, after: usize) -> Option<usize> {
    let search_area = &xml[after..];

    for pattern in &["</saml:Issuer>", "</Issuer>", "</saml2:Issuer>"] {
        if let Some(pos) = search_area.find(pattern) {
            return Some(after + pos + pattern.len());
        }
    }
    None
}

/// Extracts a complete XML element starting at the given position.
fn extract_element(xml: &str, start: usize) -> SamlResult<String> {
    let xml_bytes = xml.as_bytes();

    // Find the tag name (including any namespace prefix)
    let mut tag_end = start + 1;
    while tag_end < xml.len() && xml_bytes[tag_end] != b' ' && xml_bytes[tag_end] != b'>' {
        tag_end += 1;
    }

    let full_tag_name = &xml[start + 1..tag_end];

    // Find the closing tag with the full name first (e.g. </samlp:Response>)
    let close_pattern = format!("</{full_tag_name}>");
    if let Some(close_pos) = xml[start..].find(&close_pattern) {
        let end_pos = start + close_pos + close_pattern.len();
        return Ok(xml[start..end_pos].to_string());
    }

    // Fall back to the local name
    let local_name = full_tag_name.split(':').next_back().unwrap_or(full_tag_name);
    let close_pattern = format!("</{local_name}>");
    let close_pos = xml[start..].find(&close_pattern).ok_or_else(|| {
        SamlError::SignatureCreation(format!("Unclosed XML element '{full_tag_name}'"))
    })?;

    Ok(xml[start..start + close_pos + close_pattern.len()].to_string())
}

/// Calculates the digest of data using the specified algorithm.
fn calculate_digest(data: &str, algorithm: SignatureAlgorithm) -> Vec<u8> {
    match algorithm {
        SignatureAlgorithm::RsaSha256 => fed_crypto::sha256(data.as_bytes()),
        SignatureAlgorithm::RsaSha384 => fed_crypto::sha384(data.as_bytes()),
        SignatureAlgorithm::RsaSha512 => fed_crypto::sha512(data.as_bytes()),
    }
}

/// Builds the SignedInfo element.
///
/// The validator rebuilds this block byte-for-byte from the extracted
/// signature fields, so the template must stay in sync with
/// `validator::rebuild_signed_info`.
fn build_signed_info(
    reference_id: &str,
    digest_b64: &str,
    algorithm: SignatureAlgorithm,
    canonicalization: super::CanonicalizationAlgorithm,
) -> String {
    format!(
        r##"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
<ds:CanonicalizationMethod Algorithm="{}"/>
<ds:SignatureMethod Algorithm="{}"/>
<ds:Reference URI="#{}">
<ds:Transforms>
<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>
<ds:Transform Algorithm="{}"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="{}"/>
<ds:DigestValue>{}</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>"##,
        canonicalization.uri(),
        algorithm.uri(),
        reference_id,
        canonicalization.uri(),
        algorithm.digest_uri(),
        digest_b64
    )
}

/// Builds the complete Signature element.
fn build_signature_element(
    signed_info: &str,
    signature_value: &str,
    certificate_der: Option<&[u8]>,
    config: &SignatureConfig,
) -> String {
    let mut signature = format!(
        r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
{signed_info}
<ds:SignatureValue>{signature_value}</ds:SignatureValue>"#
    );

    if config.include_certificate {
        if let Some(cert) = certificate_der {
            let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert);
            signature.push_str(&format!(
                r#"
<ds:KeyInfo>
<ds:X509Data>
<ds:X509Certificate>{cert_b64}</ds:X509Certificate>
</ds:X509Data>
</ds:KeyInfo>"#
            ));
        }
    }

    signature.push_str("\n</ds:Signature>");
    signature
}

/// Inserts the signature into the XML document.
fn insert_signature(xml: &str, position: usize, signature: &str) -> String {
    format!("{}{}{}", &xml[..position], signature, &xml[position..])
}
