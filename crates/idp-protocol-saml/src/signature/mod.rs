//! XML Signature support for SAML responses.
//!
//! Responses are signed with an enveloped XML-DSig signature:
//!
//! - canonicalization: exclusive C14N without comments
//! - reference: `#<Response ID>` with enveloped-signature then exclusive C14N
//! - digest: SHA-256
//! - signature: RSA PKCS#1 v1.5 with SHA-256
//! - key info: the X.509 signing certificate
//!
//! No other algorithm is produced or accepted.

mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use idp_crypto::Certificate;

use crate::types::{
    canonicalization_algorithms, digest_algorithms, signature_algorithms, transform_algorithms,
    DS_PREFIX, XMLDSIG_NS,
};
use crate::xml::Element;

/// A verified `<ds:Signature>`.
#[derive(Debug, Clone)]
pub struct XmlSignature {
    /// ID of the signed element (the reference URI without `#`).
    pub reference_id: String,
    /// The digest value (base64 encoded).
    pub digest_value: String,
    /// The signature value (base64 encoded).
    pub signature_value: String,
    /// Certificate whose key verified the signature.
    pub certificate: Certificate,
}

fn ds(name: &str) -> Element {
    Element::new(DS_PREFIX, name, XMLDSIG_NS)
}

/// Builds `ds:SignedInfo` for a reference to `#reference_id`.
fn signed_info(reference_id: &str, digest_b64: &str) -> Element {
    ds("SignedInfo")
        .child(ds("CanonicalizationMethod").attr("Algorithm", canonicalization_algorithms::EXCLUSIVE_C14N))
        .child(ds("SignatureMethod").attr("Algorithm", signature_algorithms::RSA_SHA256))
        .child(
            ds("Reference")
                .attr("URI", format!("#{reference_id}"))
                .child(
                    ds("Transforms")
                        .child(ds("Transform").attr("Algorithm", transform_algorithms::ENVELOPED_SIGNATURE))
                        .child(ds("Transform").attr("Algorithm", canonicalization_algorithms::EXCLUSIVE_C14N)),
                )
                .child(ds("DigestMethod").attr("Algorithm", digest_algorithms::SHA256))
                .child(ds("DigestValue").text(digest_b64)),
        )
}
