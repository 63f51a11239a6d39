//! # idp-crypto
//!
//! Cryptographic operations for the SAML identity provider, built on aws-lc-rs.
//!
//! SAML 2.0 interoperability pins the algorithm suite to RSA PKCS#1 v1.5 with
//! SHA-256 for signatures and SHA-256 for reference digests. Nothing else is
//! offered here.
//!
//! ## Modules
//!
//! - [`hash`]: SHA-256 digests
//! - [`rsa`]: RSA-SHA256 signing and verification
//! - [`pem`]: PEM armour handling
//! - [`certificate`]: X.509 certificate parsing and public key extraction
//! - [`random`]: CSPRNG-backed identifiers and constant-time comparison

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod certificate;
pub mod hash;
pub mod pem;
pub mod random;
pub mod rsa;

pub use certificate::Certificate;
pub use hash::sha256;
pub use random::{constant_time_eq, new_ncname_id, random_bytes};
pub use rsa::{rsa_sha256_verify, RsaSigningKey};

use thiserror::Error;

/// Error type for cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The private key could not be decoded.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// The certificate could not be decoded.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),
}
