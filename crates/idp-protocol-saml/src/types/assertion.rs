//! SAML Assertion types.
//!
//! An assertion carries the authenticated subject, the validity window, the
//! authentication statement and the user's attributes.

use chrono::{DateTime, Utc};

use super::{
    format_instant, NameIdFormat, ATTRNAME_FORMAT_BASIC, CM_BEARER, SAML_NS,
    SAML_PREFIX, SAML_VERSION, XSI_NS, XS_NS,
};
use crate::xml::Element;

/// SAML Assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Unique identifier, independent of the enclosing response's.
    pub id: String,
    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,
    /// Entity ID of the asserting party.
    pub issuer: String,
    /// The authenticated subject.
    pub subject: Subject,
    /// Validity window and audience.
    pub conditions: Conditions,
    /// How and when the subject authenticated.
    pub authn_statement: AuthnStatement,
    /// Attributes of the subject.
    pub attribute_statement: AttributeStatement,
}

impl Assertion {
    /// Builds the `saml:Assertion` tree.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut element = saml("Assertion")
            .attr("ID", &self.id)
            .attr("IssueInstant", format_instant(&self.issue_instant))
            .attr("Version", SAML_VERSION)
            .child(saml("Issuer").text(&self.issuer))
            .child(self.subject.to_element())
            .child(self.conditions.to_element())
            .child(self.authn_statement.to_element());

        if !self.attribute_statement.attributes.is_empty() {
            element = element.child(self.attribute_statement.to_element());
        }
        element
    }
}

/// The subject of an assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// The subject's name identifier.
    pub name_id: NameId,
    /// Bearer confirmation tying the assertion to a request.
    pub confirmation: SubjectConfirmation,
}

impl Subject {
    fn to_element(&self) -> Element {
        saml("Subject")
            .child(
                saml("NameID")
                    .attr("Format", self.name_id.format.uri())
                    .text(&self.name_id.value),
            )
            .child(self.confirmation.to_element())
    }
}

/// A name identifier and its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId {
    /// Identifier value.
    pub value: String,
    /// Identifier format.
    pub format: NameIdFormat,
}

/// Subject confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmation {
    /// Confirmation method URI.
    pub method: String,
    /// Confirmation constraints.
    pub data: SubjectConfirmationData,
}

impl SubjectConfirmation {
    /// Bearer confirmation with the given data.
    #[must_use]
    pub fn bearer(data: SubjectConfirmationData) -> Self {
        Self {
            method: CM_BEARER.to_string(),
            data,
        }
    }

    fn to_element(&self) -> Element {
        let data = &self.data;
        saml("SubjectConfirmation")
            .attr("Method", &self.method)
            .child(
                saml("SubjectConfirmationData")
                    .attr("InResponseTo", &data.in_response_to)
                    .attr("NotOnOrAfter", format_instant(&data.not_on_or_after))
                    .attr("Recipient", &data.recipient),
            )
    }
}

/// Constraints on a bearer confirmation.
///
/// Bearer confirmations carry no `NotBefore`; their window opens at the
/// assertion's `IssueInstant`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmationData {
    /// ID of the request being answered.
    pub in_response_to: String,
    /// End of the confirmation window.
    pub not_on_or_after: DateTime<Utc>,
    /// ACS URL the assertion must be delivered to.
    pub recipient: String,
}

/// Assertion validity conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditions {
    /// Start of the validity window.
    pub not_before: DateTime<Utc>,
    /// End of the validity window.
    pub not_on_or_after: DateTime<Utc>,
    /// The single intended audience.
    pub audience: String,
}

impl Conditions {
    fn to_element(&self) -> Element {
        saml("Conditions")
            .attr("NotBefore", format_instant(&self.not_before))
            .attr("NotOnOrAfter", format_instant(&self.not_on_or_after))
            .child(saml("AudienceRestriction").child(saml("Audience").text(&self.audience)))
    }
}

/// Authentication statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnStatement {
    /// When the subject authenticated.
    pub authn_instant: DateTime<Utc>,
    /// When the resulting session ends.
    pub session_not_on_or_after: DateTime<Utc>,
    /// Session identifier.
    pub session_index: String,
    /// Authentication context class reference URI.
    pub context_class: String,
}

impl AuthnStatement {
    fn to_element(&self) -> Element {
        saml("AuthnStatement")
            .attr("AuthnInstant", format_instant(&self.authn_instant))
            .attr("SessionIndex", &self.session_index)
            .attr(
                "SessionNotOnOrAfter",
                format_instant(&self.session_not_on_or_after),
            )
            .child(
                saml("AuthnContext")
                    .child(saml("AuthnContextClassRef").text(&self.context_class)),
            )
    }
}

/// Attribute statement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeStatement {
    /// Attributes in output order.
    pub attributes: Vec<Attribute>,
}

impl AttributeStatement {
    fn to_element(&self) -> Element {
        self.attributes
            .iter()
            .fold(saml("AttributeStatement"), |statement, attribute| {
                statement.child(attribute.to_element())
            })
    }
}

/// A named, possibly multi-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute name format URI.
    pub name_format: String,
    /// Values, each emitted as an `xs:string`.
    pub values: Vec<String>,
}

impl Attribute {
    /// Single-valued attribute with the basic name format.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_format: ATTRNAME_FORMAT_BASIC.to_string(),
            values: vec![value.into()],
        }
    }

    fn to_element(&self) -> Element {
        self.values.iter().fold(
            saml("Attribute")
                .attr("Name", &self.name)
                .attr("NameFormat", &self.name_format),
            |attribute, value| {
                attribute.child(
                    saml("AttributeValue")
                        .declare("xs", XS_NS)
                        .declare("xsi", XSI_NS)
                        .attr_ns("xsi", "type", XSI_NS, "xs:string")
                        .text(value),
                )
            },
        )
    }
}

fn saml(name: &str) -> Element {
    Element::new(SAML_PREFIX, name, SAML_NS)
}
