//! RSA PKCS#1 v1.5 SHA-256 signatures.
//!
//! This is the `http://www.w3.org/2001/04/xmldsig-more#rsa-sha256` suite used
//! by SAML 2.0 deployments. Keys are accepted as PKCS#8 (`PRIVATE KEY`) or
//! PKCS#1 (`RSA PRIVATE KEY`) PEM.

use std::fmt;

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair, UnparsedPublicKey},
};

use crate::{pem::pem_to_der, CryptoError};

/// RSA private key used to produce RSA-SHA256 signatures.
pub struct RsaSigningKey {
    key_pair: RsaKeyPair,
}

impl RsaSigningKey {
    /// Loads a key from DER, trying PKCS#8 first and then PKCS#1.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if neither encoding parses.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key_pair = RsaKeyPair::from_pkcs8(der)
            .or_else(|_| RsaKeyPair::from_der(der))
            .map_err(|e| CryptoError::InvalidKey(format!("invalid RSA key: {e}")))?;
        Ok(Self { key_pair })
    }

    /// Loads a key from PEM.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if no private key block is present
    /// or the key does not parse.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let der = pem_to_der(pem, "PRIVATE KEY")
            .or_else(|| pem_to_der(pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| CryptoError::InvalidKey("no private key PEM block".to_string()))?;
        Self::from_der(&der)
    }

    /// Modulus length in bytes, which is also the signature length.
    #[must_use]
    pub fn modulus_len(&self) -> usize {
        self.key_pair.public_modulus_len()
    }

    /// Signs `data` with RSA PKCS#1 v1.5 over SHA-256.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Signing`] if the underlying primitive fails.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let rng = SystemRandom::new();
        let mut sig = vec![0u8; self.key_pair.public_modulus_len()];

        self.key_pair
            .sign(&signature::RSA_PKCS1_SHA256, &rng, data, &mut sig)
            .map_err(|e| CryptoError::Signing(format!("RSA signing failed: {e}")))?;

        Ok(sig)
    }
}

impl fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSigningKey")
            .field("modulus_len", &self.modulus_len())
            .finish_non_exhaustive()
    }
}

/// Verifies an RSA PKCS#1 v1.5 SHA-256 signature.
///
/// `public_key_der` is the PKCS#1 `RSAPublicKey` carried in a certificate's
/// subject public key bit string (see [`crate::Certificate::public_key_der`]).
#[must_use]
pub fn rsa_sha256_verify(public_key_der: &[u8], data: &[u8], sig: &[u8]) -> bool {
    UnparsedPublicKey::new(&signature::RSA_PKCS1_2048_8192_SHA256, public_key_der)
        .verify(data, sig)
        .is_ok()
}
