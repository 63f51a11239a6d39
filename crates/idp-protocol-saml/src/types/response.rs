//! SAML Response types.
//!
//! Response message sent by this identity provider to a service provider.

use chrono::{DateTime, Utc};

use super::{
    format_instant, status_codes, Assertion, SAMLP_NS, SAMLP_PREFIX, SAML_NS, SAML_PREFIX,
    SAML_VERSION,
};
use crate::xml::Element;

/// SAML Response carrying a single assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlResponse {
    /// Unique identifier for this response.
    pub id: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this response.
    pub issuer: String,

    /// The ID of the request this response is for.
    pub in_response_to: String,

    /// The ACS URL this response is delivered to.
    pub destination: String,

    /// Top-level status code URI.
    pub status: String,

    /// The assertion.
    pub assertion: Assertion,
}

impl SamlResponse {
    /// Whether the status is `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == status_codes::SUCCESS
    }

    /// Builds the unsigned `samlp:Response` tree.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element::new(SAMLP_PREFIX, "Response", SAMLP_NS)
            .declare(SAMLP_PREFIX, SAMLP_NS)
            .declare(SAML_PREFIX, SAML_NS)
            .attr("ID", &self.id)
            .attr("Version", SAML_VERSION)
            .attr("IssueInstant", format_instant(&self.issue_instant))
            .attr("Destination", &self.destination)
            .attr("InResponseTo", &self.in_response_to)
            .child(Element::new(SAML_PREFIX, "Issuer", SAML_NS).text(&self.issuer))
            .child(
                Element::new(SAMLP_PREFIX, "Status", SAMLP_NS).child(
                    Element::new(SAMLP_PREFIX, "StatusCode", SAMLP_NS).attr("Value", &self.status),
                ),
            )
            .child(self.assertion.to_element())
    }
}
