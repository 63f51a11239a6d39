//! SAML error types.
//!
//! Every failure in the request-to-response pipeline is one of these; a
//! response is either fully built and signed or not produced at all.

use thiserror::Error;

use crate::secrets::SecretError;
use crate::types::status_codes;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Percent, base64, DEFLATE or UTF-8 decoding failed.
    #[error("decode error: {0}")]
    Decode(String),

    /// XML is not well-formed or uses forbidden constructs.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Well-formed input that violates protocol rules.
    #[error("validation error: {0}")]
    Validation(String),

    /// The request forbids user interaction but the user must log in.
    #[error("passive authentication requested but no session exists")]
    NoPassive,

    /// Producing a signature failed (bad key, bad certificate).
    #[error("signing error: {0}")]
    Signing(String),

    /// A signature did not verify.
    #[error("signature invalid: {0}")]
    SignatureInvalid(SignatureFailure),

    /// Signing material could not be fetched.
    #[error("secret retrieval failed: {0}")]
    SecretRetrieval(#[from] SecretError),

    /// Configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Reason a signature failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureFailure {
    /// The referenced content does not hash to the signed digest.
    #[error("digest mismatch")]
    DigestMismatch,

    /// The signature value does not verify over `SignedInfo`.
    #[error("signature value mismatch")]
    SignatureMismatch,

    /// No certificate was supplied or embedded.
    #[error("no certificate available")]
    MissingCertificate,

    /// The signature structure is incomplete or inconsistent.
    #[error("malformed signature: {0}")]
    Malformed(String),

    /// An algorithm other than exc-c14n / RSA-SHA256 / SHA-256 was named.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl SamlError {
    /// Returns the most specific SAML status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::NoPassive => status_codes::NO_PASSIVE,
            Self::Decode(_) | Self::Parse(_) | Self::Validation(_) | Self::SignatureInvalid(_) => {
                status_codes::REQUESTER
            }
            Self::Signing(_) | Self::SecretRetrieval(_) | Self::Configuration(_) => {
                status_codes::RESPONDER
            }
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Decode(_) | Self::Parse(_) | Self::Validation(_) | Self::NoPassive => 400,
            Self::SignatureInvalid(_) => 401,
            Self::SecretRetrieval(SecretError::Transient(_)) => 503,
            Self::Signing(_) | Self::SecretRetrieval(_) | Self::Configuration(_) => 500,
        }
    }

    /// Returns whether the caller, not this provider, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

impl From<SignatureFailure> for SamlError {
    fn from(failure: SignatureFailure) -> Self {
        Self::SignatureInvalid(failure)
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<idp_crypto::CryptoError> for SamlError {
    fn from(err: idp_crypto::CryptoError) -> Self {
        Self::Signing(err.to_string())
    }
}
