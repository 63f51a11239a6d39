//! XML Signature creation.

use base64::Engine;
use idp_crypto::{sha256, Certificate, RsaSigningKey};

use super::{ds, signed_info};
use crate::error::{SamlError, SamlResult};
use crate::types::{SamlResponse, DS_PREFIX, SAML_NS, XMLDSIG_NS};
use crate::xml::{c14n::canonicalize, Element};

/// Signs SAML documents with an RSA key and embeds its certificate.
#[derive(Debug)]
pub struct XmlSigner {
    key: RsaSigningKey,
    certificate: Certificate,
}

impl XmlSigner {
    /// Creates a signer from a parsed key and certificate.
    #[must_use]
    pub fn new(key: RsaSigningKey, certificate: Certificate) -> Self {
        Self { key, certificate }
    }

    /// Creates a signer from PEM-encoded key and certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Signing`] if either PEM does not decode.
    pub fn from_pem(private_key_pem: &str, certificate_pem: &str) -> SamlResult<Self> {
        let key = RsaSigningKey::from_pem(private_key_pem)?;
        let certificate = Certificate::from_pem(certificate_pem)?;
        Ok(Self::new(key, certificate))
    }

    /// The certificate embedded in signatures.
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Signs a response and serializes the signed document.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Signing`] if signing fails.
    pub fn sign_response(&self, response: &SamlResponse) -> SamlResult<String> {
        let signed = self.sign(response.to_element())?;
        tracing::debug!(response_id = %response.id, "signed response");
        Ok(signed.to_document())
    }

    /// Adds an enveloped signature over `root`, placed directly after its
    /// `saml:Issuer` child.
    ///
    /// An existing top-level signature is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Signing`] if `root` has no `ID` or no
    /// `saml:Issuer` child, or the RSA operation fails.
    pub fn sign(&self, mut root: Element) -> SamlResult<Element> {
        let id = root
            .attribute("ID")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SamlError::Signing("element to sign has no ID".to_string()))?
            .to_string();

        root.remove_child(XMLDSIG_NS, "Signature");
        let issuer_at = root
            .child_position(SAML_NS, "Issuer")
            .ok_or_else(|| SamlError::Signing("element to sign has no saml:Issuer".to_string()))?;

        let engine = base64::engine::general_purpose::STANDARD;
        let digest = sha256(canonicalize(&root).as_bytes());
        let signed_info = signed_info(&id, &engine.encode(digest));

        let signature_value = self.key.sign(canonicalize(&signed_info).as_bytes())?;

        let signature = ds("Signature")
            .declare(DS_PREFIX, XMLDSIG_NS)
            .child(signed_info)
            .child(ds("SignatureValue").text(engine.encode(signature_value)))
            .child(
                ds("KeyInfo").child(
                    ds("X509Data").child(ds("X509Certificate").text(self.certificate.to_base64())),
                ),
            );

        root.insert_child(issuer_at + 1, signature);
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SAMLP_NS, SAML_PREFIX};

    const KEY: &str = include_str!("../../tests/fixtures/idp.key");
    const CERT: &str = include_str!("../../tests/fixtures/idp.crt");

    fn signer() -> XmlSigner {
        XmlSigner::from_pem(KEY, CERT).unwrap()
    }

    fn document() -> Element {
        Element::new("samlp", "Response", SAMLP_NS)
            .declare("samlp", SAMLP_NS)
            .attr("ID", "_resp")
            .child(Element::new(SAML_PREFIX, "Issuer", SAML_NS).text("urn:example:idp"))
            .child(Element::new("samlp", "Status", SAMLP_NS))
    }

    #[test]
    fn signature_follows_issuer() {
        let signed = signer().sign(document()).unwrap();
        let names: Vec<&str> = signed.child_elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Issuer", "Signature", "Status"]);

        let signature = signed.find_child(XMLDSIG_NS, "Signature").unwrap();
        let reference = signature.find_descendant(XMLDSIG_NS, "Reference").unwrap();
        assert_eq!(reference.attribute("URI"), Some("#_resp"));

        let embedded = signature.find_descendant(XMLDSIG_NS, "X509Certificate").unwrap();
        assert_eq!(
            embedded.text_content(),
            idp_crypto::pem::strip_certificate_armor(CERT)
        );
        assert!(!embedded.text_content().contains('\n'));
    }

    #[test]
    fn resigning_replaces_signature() {
        let once = signer().sign(document()).unwrap();
        let twice = signer().sign(once).unwrap();
        let count = twice
            .child_elements()
            .filter(|e| e.is(XMLDSIG_NS, "Signature"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn requires_id_and_issuer() {
        let mut no_id = document();
        no_id.attributes.clear();
        assert!(matches!(signer().sign(no_id), Err(SamlError::Signing(_))));

        let mut no_issuer = document();
        no_issuer.remove_child(SAML_NS, "Issuer");
        assert!(matches!(signer().sign(no_issuer), Err(SamlError::Signing(_))));
    }

    #[test]
    fn bad_pem_is_signing_error() {
        assert!(matches!(XmlSigner::from_pem("nope", CERT), Err(SamlError::Signing(_))));
        assert!(matches!(XmlSigner::from_pem(KEY, "nope"), Err(SamlError::Signing(_))));
    }
}
