//! SAML AuthnRequest types.
//!
//! Authentication request message sent by a service provider to this
//! identity provider.

use chrono::{DateTime, Utc};

use super::{NameIdFormat, SamlBinding, SAMLP_NS, SAMLP_PREFIX, SAML_NS, SAML_PREFIX, SAML_VERSION};
use crate::xml::Element;
use crate::{SamlError, SamlResult};

/// SAML Authentication Request.
///
/// Every field other than `id` and `version` mirrors presence in the XML:
/// an attribute that was not sent is `None`, never a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0" once parsed).
    pub version: String,

    /// `IssueInstant` as sent.
    pub issue_instant: Option<String>,

    /// The URL the SP addressed the request to.
    pub destination: Option<String>,

    /// The URL where the response should be sent.
    pub assertion_consumer_service_url: Option<String>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: Option<String>,

    /// `NameIDPolicy/@Format`.
    pub name_id_format: Option<String>,

    /// Binding requested for the response.
    pub protocol_binding: Option<String>,

    /// Whether the IdP must authenticate the user directly.
    pub force_authn: Option<bool>,

    /// Whether the IdP must not interact with the user.
    pub is_passive: Option<bool>,
}

impl AuthnRequest {
    /// Creates a request with only the required fields.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: SAML_VERSION.to_string(),
            issue_instant: None,
            destination: None,
            assertion_consumer_service_url: None,
            issuer: None,
            name_id_format: None,
            protocol_binding: None,
            force_authn: None,
            is_passive: None,
        }
    }

    /// Sets the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the issue instant.
    #[must_use]
    pub fn with_issue_instant(mut self, instant: impl Into<String>) -> Self {
        self.issue_instant = Some(instant.into());
        self
    }

    /// Sets the requested name ID format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: NameIdFormat) -> Self {
        self.name_id_format = Some(format.uri().to_string());
        self
    }

    /// Sets the protocol binding for the response.
    #[must_use]
    pub fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.protocol_binding = Some(binding.uri().to_string());
        self
    }

    /// Parses `IssueInstant` as an `xs:dateTime`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if present but not a valid
    /// timestamp.
    pub fn issue_instant_utc(&self) -> SamlResult<Option<DateTime<Utc>>> {
        self.issue_instant
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| SamlError::Validation(format!("invalid IssueInstant {raw:?}: {e}")))
            })
            .transpose()
    }

    /// The requested name ID format, when it is one this crate knows.
    #[must_use]
    pub fn requested_name_id_format(&self) -> Option<NameIdFormat> {
        self.name_id_format.as_deref().and_then(NameIdFormat::from_uri)
    }

    /// The requested response binding, when it is one this crate knows.
    #[must_use]
    pub fn requested_binding(&self) -> Option<SamlBinding> {
        self.protocol_binding.as_deref().and_then(SamlBinding::from_uri)
    }

    /// Builds the request XML tree, as an SP would send it.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut root = Element::new(SAMLP_PREFIX, "AuthnRequest", SAMLP_NS)
            .declare(SAMLP_PREFIX, SAMLP_NS)
            .declare(SAML_PREFIX, SAML_NS)
            .attr("ID", &self.id)
            .attr("Version", &self.version)
            .opt_attr("IssueInstant", self.issue_instant.as_deref())
            .opt_attr("Destination", self.destination.as_deref())
            .opt_attr(
                "AssertionConsumerServiceURL",
                self.assertion_consumer_service_url.as_deref(),
            )
            .opt_attr("ProtocolBinding", self.protocol_binding.as_deref())
            .opt_attr("ForceAuthn", self.force_authn.map(bool_str))
            .opt_attr("IsPassive", self.is_passive.map(bool_str));

        if let Some(issuer) = &self.issuer {
            root = root.child(Element::new(SAML_PREFIX, "Issuer", SAML_NS).text(issuer));
        }
        if let Some(format) = &self.name_id_format {
            root = root.child(
                Element::new(SAMLP_PREFIX, "NameIDPolicy", SAMLP_NS)
                    .attr("Format", format)
                    .attr("AllowCreate", "true"),
            );
        }
        root
    }
}

const fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
