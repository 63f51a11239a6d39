//! XML Signature verification.
//!
//! Only enveloped signatures over the document element are accepted: the
//! `ds:Signature` must be a direct child of the root, reference the root's
//! `ID`, and that `ID` must be unique in the document. Anything else is
//! reported as malformed rather than followed, which keeps signature
//! wrapping from moving the signed content away from what callers read.

use base64::Engine;
use idp_crypto::{rsa_sha256_verify, sha256, Certificate};

use super::XmlSignature;
use crate::error::{SamlError, SamlResult, SignatureFailure};
use crate::types::{
    canonicalization_algorithms, digest_algorithms, signature_algorithms, transform_algorithms,
    XMLDSIG_NS,
};
use crate::xml::{self, c14n::canonicalize, Element};

/// Verifies enveloped signatures on SAML documents.
#[derive(Debug, Clone, Default)]
pub struct XmlSignatureValidator {
    trusted: Option<Certificate>,
}

impl XmlSignatureValidator {
    /// Validator that trusts the certificate embedded in each signature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator that verifies against `certificate`, ignoring embedded ones.
    #[must_use]
    pub fn with_certificate(certificate: Certificate) -> Self {
        Self {
            trusted: Some(certificate),
        }
    }

    /// Validator that verifies against a PEM certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] if the PEM is not a certificate.
    pub fn from_pem(certificate_pem: &str) -> SamlResult<Self> {
        let certificate = Certificate::from_pem(certificate_pem)
            .map_err(|e| SamlError::Configuration(e.to_string()))?;
        Ok(Self::with_certificate(certificate))
    }

    /// Parses `xml` and verifies the signature on its document element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Parse`] for malformed XML and
    /// [`SamlError::SignatureInvalid`] when verification fails.
    pub fn validate(&self, xml: &str) -> SamlResult<XmlSignature> {
        let root = xml::parse(xml)?;
        self.validate_element(&root)
    }

    /// Verifies the signature on `root`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureInvalid`] when verification fails.
    pub fn validate_element(&self, root: &Element) -> SamlResult<XmlSignature> {
        let result = self.check(root);
        if let Err(SamlError::SignatureInvalid(failure)) = &result {
            tracing::warn!(%failure, "signature verification failed");
        }
        result
    }

    fn check(&self, root: &Element) -> SamlResult<XmlSignature> {
        let signature = root
            .find_child(XMLDSIG_NS, "Signature")
            .ok_or_else(|| malformed("no Signature on the document element"))?;
        let signed_info = signature
            .find_child(XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| malformed("Signature has no SignedInfo"))?;

        let c14n_method = signed_info
            .find_child(XMLDSIG_NS, "CanonicalizationMethod")
            .ok_or_else(|| malformed("SignedInfo has no CanonicalizationMethod"))?;
        require_exclusive_c14n(c14n_method)?;

        let signature_method = algorithm(signed_info, "SignatureMethod")?;
        if signature_method != signature_algorithms::RSA_SHA256 {
            return Err(unsupported(signature_method));
        }

        let mut references = signed_info
            .child_elements()
            .filter(|e| e.is(XMLDSIG_NS, "Reference"));
        let reference = references
            .next()
            .ok_or_else(|| malformed("SignedInfo has no Reference"))?;
        if references.next().is_some() {
            return Err(malformed("multiple References are not supported"));
        }

        let reference_id = reference
            .attribute("URI")
            .and_then(|uri| uri.strip_prefix('#'))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("Reference URI must be a same-document #id"))?;
        if root.attribute("ID") != Some(reference_id) {
            return Err(malformed("Reference does not point at the document element"));
        }
        if root.elements_with_id(reference_id).len() != 1 {
            return Err(malformed("referenced ID is not unique"));
        }

        check_transforms(reference)?;
        let digest_method = algorithm(reference, "DigestMethod")?;
        if digest_method != digest_algorithms::SHA256 {
            return Err(unsupported(digest_method));
        }

        let digest_value = compact_text(reference, "DigestValue")
            .ok_or_else(|| malformed("Reference has no DigestValue"))?;
        let expected_digest = decode(&digest_value, "DigestValue")?;

        let mut unsigned = root.clone();
        unsigned.remove_child(XMLDSIG_NS, "Signature");
        if sha256(canonicalize(&unsigned).as_bytes()) != expected_digest {
            return Err(SignatureFailure::DigestMismatch.into());
        }

        let certificate = match &self.trusted {
            Some(trusted) => trusted.clone(),
            None => embedded_certificate(signature)?,
        };
        let public_key = certificate
            .public_key_der()
            .map_err(|e| malformed(&e.to_string()))?;

        let signature_value = compact_text(signature, "SignatureValue")
            .ok_or_else(|| malformed("Signature has no SignatureValue"))?;
        let signature_bytes = decode(&signature_value, "SignatureValue")?;

        if !rsa_sha256_verify(
            &public_key,
            canonicalize(signed_info).as_bytes(),
            &signature_bytes,
        ) {
            return Err(SignatureFailure::SignatureMismatch.into());
        }

        tracing::debug!(reference_id, subject = %certificate.subject(), "signature verified");
        Ok(XmlSignature {
            reference_id: reference_id.to_string(),
            digest_value,
            signature_value,
            certificate,
        })
    }
}

fn require_exclusive_c14n(method: &Element) -> SamlResult<()> {
    let uri = method
        .attribute("Algorithm")
        .ok_or_else(|| malformed("canonicalization method has no Algorithm"))?;
    if uri != canonicalization_algorithms::EXCLUSIVE_C14N {
        return Err(unsupported(uri));
    }
    if method.child_elements().next().is_some() {
        return Err(unsupported("exclusive C14N with an inclusive namespace prefix list"));
    }
    Ok(())
}

fn check_transforms(reference: &Element) -> SamlResult<()> {
    let transforms = reference
        .find_child(XMLDSIG_NS, "Transforms")
        .ok_or_else(|| malformed("Reference has no Transforms"))?;

    let mut enveloped = false;
    let mut exclusive = false;
    for transform in transforms
        .child_elements()
        .filter(|e| e.is(XMLDSIG_NS, "Transform"))
    {
        match transform.attribute("Algorithm") {
            Some(transform_algorithms::ENVELOPED_SIGNATURE) => enveloped = true,
            Some(canonicalization_algorithms::EXCLUSIVE_C14N) => {
                require_exclusive_c14n(transform)?;
                exclusive = true;
            }
            Some(other) => return Err(unsupported(other)),
            None => return Err(malformed("Transform has no Algorithm")),
        }
    }
    if !enveloped {
        return Err(malformed("Reference lacks the enveloped-signature transform"));
    }
    if !exclusive {
        // Without an explicit transform the Reference defaults to inclusive C14N.
        return Err(unsupported(canonicalization_algorithms::INCLUSIVE_C14N));
    }
    Ok(())
}

fn embedded_certificate(signature: &Element) -> SamlResult<Certificate> {
    let encoded = signature
        .find_child(XMLDSIG_NS, "KeyInfo")
        .and_then(|k| k.find_child(XMLDSIG_NS, "X509Data"))
        .and_then(|d| compact_text(d, "X509Certificate"))
        .filter(|c| !c.is_empty())
        .ok_or(SamlError::SignatureInvalid(SignatureFailure::MissingCertificate))?;
    Certificate::from_base64(&encoded).map_err(|e| malformed(&e.to_string()))
}

fn algorithm<'a>(parent: &'a Element, name: &str) -> SamlResult<&'a str> {
    parent
        .find_child(XMLDSIG_NS, name)
        .and_then(|e| e.attribute("Algorithm"))
        .ok_or_else(|| malformed(&format!("{name} has no Algorithm")))
}

fn compact_text(parent: &Element, name: &str) -> Option<String> {
    parent.find_child(XMLDSIG_NS, name).map(|e| {
        e.text_content()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    })
}

fn decode(value: &str, what: &str) -> SamlResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| malformed(&format!("{what} is not base64: {e}")))
}

fn malformed(reason: &str) -> SamlError {
    SignatureFailure::Malformed(reason.to_string()).into()
}

fn unsupported(uri: &str) -> SamlError {
    SignatureFailure::UnsupportedAlgorithm(uri.to_string()).into()
}
