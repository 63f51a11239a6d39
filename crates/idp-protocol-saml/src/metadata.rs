//! IdP metadata generation.
//!
//! Produces the `md:EntityDescriptor` a service provider imports to trust
//! this identity provider.

use idp_crypto::Certificate;

use crate::types::{NameIdFormat, SamlBinding, DS_PREFIX, MD_NS, SAMLP_NS, XMLDSIG_NS};
use crate::xml::Element;
use crate::{SamlError, SamlResult};

/// Media type of the metadata document.
pub const METADATA_CONTENT_TYPE: &str = "application/samlmetadata+xml";

const MD_PREFIX: &str = "md";

/// Builds IdP metadata documents.
pub struct MetadataGenerator;

impl MetadataGenerator {
    /// Generates metadata for the IdP at `endpoint` identified by `entity_id`.
    ///
    /// Both SSO bindings point at `{endpoint}/sso`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] if the certificate is missing,
    /// empty or not a parseable X.509 certificate.
    pub fn generate(
        endpoint: &str,
        entity_id: &str,
        certificate_pem: Option<&str>,
    ) -> SamlResult<String> {
        let certificate = match certificate_pem.map(str::trim) {
            Some(pem) if !pem.is_empty() => Certificate::from_pem(pem)
                .map_err(|e| SamlError::Configuration(format!("signing certificate: {e}")))?,
            _ => {
                return Err(SamlError::Configuration(
                    "no signing certificate available for metadata".to_string(),
                ))
            }
        };

        Ok(Self::descriptor(endpoint, entity_id, &certificate).to_document())
    }

    /// Builds the `md:EntityDescriptor` element.
    #[must_use]
    pub fn descriptor(endpoint: &str, entity_id: &str, certificate: &Certificate) -> Element {
        let sso_url = format!("{}/sso", endpoint.trim_end_matches('/'));

        let key_descriptor = md("KeyDescriptor").attr("use", "signing").child(
            Element::new(DS_PREFIX, "KeyInfo", XMLDSIG_NS)
                .declare(DS_PREFIX, XMLDSIG_NS)
                .child(
                    Element::new(DS_PREFIX, "X509Data", XMLDSIG_NS).child(
                        Element::new(DS_PREFIX, "X509Certificate", XMLDSIG_NS)
                            .text(certificate.to_base64()),
                    ),
                ),
        );

        let mut idp = md("IDPSSODescriptor")
            .attr("WantAuthnRequestsSigned", "false")
            .attr("protocolSupportEnumeration", SAMLP_NS)
            .child(key_descriptor)
            .child(md("NameIDFormat").text(NameIdFormat::Email.uri()));
        for binding in [SamlBinding::HttpPost, SamlBinding::HttpRedirect] {
            idp = idp.child(
                md("SingleSignOnService")
                    .attr("Binding", binding.uri())
                    .attr("Location", sso_url.as_str()),
            );
        }

        md("EntityDescriptor")
            .declare(MD_PREFIX, MD_NS)
            .attr("entityID", entity_id)
            .child(idp)
    }
}

fn md(name: &str) -> Element {
    Element::new(MD_PREFIX, name, MD_NS)
}
