//! Hash functions.

use aws_lc_rs::digest;

/// Computes a SHA-256 hash of the input data.
///
/// SHA-256 is the digest XML-DSig deployments of SAML 2.0 expect for
/// reference digests.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}
