//! SAML 2.0 identity provider message engine.
//!
//! This crate turns an HTTP-Redirect `AuthnRequest` into a signed SAML
//! `Response` delivered over HTTP-POST, and describes the provider in
//! metadata:
//!
//! - **Request decoding** - percent, base64 and DEFLATE layers ([`bindings::redirect`])
//! - **AuthnRequest parsing** - namespace-aware extraction ([`parser`])
//! - **Response generation** - Response/Assertion trees ([`builder`])
//! - **XML signature** - exclusive C14N, RSA-SHA256 signing and verification ([`signature`])
//! - **Metadata** - `EntityDescriptor` for service providers ([`metadata`])
//! - **Delivery** - auto-submitting POST form ([`bindings::post`])
//!
//! [`sso::SsoService`] wires these together with a [`secrets::SecretProvider`]
//! supplying key material per request.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use idp_protocol_saml::{secrets::EnvSecretProvider, sso::SsoService};
//!
//! let service = SsoService::new(Arc::new(config), Arc::new(EnvSecretProvider));
//! let request = service.decode_request(&saml_request)?;
//! let signed = service.issue_response(&request, &profile, relay_state).await?;
//! let html = signed.post_form();
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod builder;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod secrets;
pub mod signature;
pub mod sso;
pub mod types;
pub mod xml;

pub use error::{SamlError, SamlResult, SignatureFailure};
pub use types::*;
