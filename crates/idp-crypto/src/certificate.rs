//! X.509 certificate handling.

use base64::{engine::general_purpose::STANDARD, Engine};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::{pem::pem_to_der, CryptoError};

/// A DER-encoded X.509 certificate that is known to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wraps DER bytes after checking they parse as X.509.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if parsing fails.
    pub fn from_der(der: Vec<u8>) -> Result<Self, CryptoError> {
        X509Certificate::from_der(&der)
            .map_err(|e| CryptoError::InvalidCertificate(format!("X.509 parse failed: {e}")))?;
        Ok(Self { der })
    }

    /// Parses a PEM `CERTIFICATE` block.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if the block is missing or
    /// does not parse.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let der = pem_to_der(pem, "CERTIFICATE")
            .ok_or_else(|| CryptoError::InvalidCertificate("no CERTIFICATE PEM block".to_string()))?;
        Self::from_der(der)
    }

    /// Parses the bare base64 form found in `ds:X509Certificate`.
    ///
    /// Embedded whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] on invalid base64 or DER.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let der = STANDARD
            .decode(compact)
            .map_err(|e| CryptoError::InvalidCertificate(format!("invalid base64: {e}")))?;
        Self::from_der(der)
    }

    /// Raw DER bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Single-line base64 of the DER bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.der)
    }

    /// Returns the subject public key as a PKCS#1 `RSAPublicKey`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if the certificate no longer
    /// parses.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        let (_, cert) = X509Certificate::from_der(&self.der)
            .map_err(|e| CryptoError::InvalidCertificate(format!("X.509 parse failed: {e}")))?;
        Ok(cert.public_key().subject_public_key.data.to_vec())
    }

    /// Subject distinguished name, for logging.
    #[must_use]
    pub fn subject(&self) -> String {
        X509Certificate::from_der(&self.der)
            .map(|(_, cert)| cert.subject().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pem::strip_certificate_armor;

    const CERT: &str = include_str!("../../idp-protocol-saml/tests/fixtures/idp.crt");

    #[test]
    fn parses_fixture_certificate() {
        let cert = Certificate::from_pem(CERT).unwrap();
        assert!(cert.subject().contains("idp.example.test"));
        assert!(!cert.public_key_der().unwrap().is_empty());
    }

    #[test]
    fn base64_form_matches_stripped_pem() {
        let cert = Certificate::from_pem(CERT).unwrap();
        assert_eq!(cert.to_base64(), strip_certificate_armor(CERT));

        let again = Certificate::from_base64(&strip_certificate_armor(CERT)).unwrap();
        assert_eq!(again, cert);
    }

    #[test]
    fn rejects_non_certificates() {
        assert!(Certificate::from_pem("").is_err());
        assert!(Certificate::from_base64("!!!").is_err());
        assert!(Certificate::from_der(vec![1, 2, 3]).is_err());
    }
}
