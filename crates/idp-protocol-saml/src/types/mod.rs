//! SAML 2.0 types and data structures.
//!
//! Requests are parsed into [`AuthnRequest`]; responses are assembled as
//! [`SamlResponse`] values and turned into XML element trees with
//! `to_element`, which is the only place element and attribute names are
//! spelled out.

mod assertion;
mod authn_request;
mod constants;
mod response;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use response::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// Namespace prefix used for the protocol namespace.
pub const SAMLP_PREFIX: &str = "samlp";

/// Namespace prefix used for the assertion namespace.
pub const SAML_PREFIX: &str = "saml";

/// Namespace prefix used for XML-DSig.
pub const DS_PREFIX: &str = "ds";

/// Formats an instant as `xs:dateTime` in UTC with millisecond precision.
#[must_use]
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
