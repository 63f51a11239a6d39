//! SAML bindings implementation.
//!
//! This module implements the two SAML 2.0 bindings the provider speaks:
//!
//! - **HTTP-Redirect Binding** - inbound `AuthnRequest`s arrive deflated,
//!   base64-encoded and URL-encoded in the `SAMLRequest` query parameter
//! - **HTTP-POST Binding** - outbound `Response`s leave base64-encoded in an
//!   auto-submitting HTML form
//!
//! # Usage
//!
//! ```rust,ignore
//! use idp_protocol_saml::bindings::{HttpPostBinding, RequestCodec};
//!
//! let xml = RequestCodec::decode(&saml_request)?;
//! let html = HttpPostBinding::encode_response(&signed_xml, acs_url, relay_state.as_deref());
//! ```

pub mod post;
pub mod redirect;

pub use post::HttpPostBinding;
pub use redirect::{DeflateVariant, RequestCodec};

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Name of the opaque state parameter echoed back to the SP.
pub const RELAY_STATE_PARAM: &str = "RelayState";
