//! AuthnRequest extraction.
//!
//! Fields are located structurally: the root must be `{protocol}AuthnRequest`
//! and children are matched by namespace and local name, so prefixes chosen
//! by the SP are irrelevant and look-alike elements elsewhere are ignored.

use crate::types::{AuthnRequest, SAMLP_NS, SAML_NS, SAML_VERSION};
use crate::xml::{self, Element};
use crate::{SamlError, SamlResult};

/// Parses `AuthnRequest` XML.
pub struct AuthnRequestParser;

impl AuthnRequestParser {
    /// Parses request XML into an [`AuthnRequest`].
    ///
    /// # Errors
    ///
    /// - [`SamlError::Parse`] if the XML is malformed
    /// - [`SamlError::Validation`] if the root is not a protocol
    ///   `AuthnRequest`, `ID` or `Version` is missing, or the version is not
    ///   2.0
    pub fn parse(xml: &str) -> SamlResult<AuthnRequest> {
        let root = xml::parse(xml)?;
        Self::from_element(&root)
    }

    /// Extracts an [`AuthnRequest`] from an already parsed tree.
    ///
    /// # Errors
    ///
    /// See [`AuthnRequestParser::parse`].
    pub fn from_element(root: &Element) -> SamlResult<AuthnRequest> {
        if !root.is(SAMLP_NS, "AuthnRequest") {
            return Err(SamlError::Validation(format!(
                "expected AuthnRequest in {SAMLP_NS}, found <{}>",
                root.qualified_name()
            )));
        }

        let id = required(root, "ID")?;
        let version = required(root, "Version")?;
        if version != SAML_VERSION {
            return Err(SamlError::Validation(format!(
                "unsupported SAML version {version:?}"
            )));
        }

        let issuer = root
            .find_child(SAML_NS, "Issuer")
            .map(|e| e.text_content().trim().to_string());
        let name_id_format = root
            .find_child(SAMLP_NS, "NameIDPolicy")
            .and_then(|e| e.attribute("Format"))
            .map(str::to_string);

        let request = AuthnRequest {
            id,
            version,
            issue_instant: optional(root, "IssueInstant"),
            destination: optional(root, "Destination"),
            assertion_consumer_service_url: optional(root, "AssertionConsumerServiceURL"),
            issuer,
            name_id_format,
            protocol_binding: optional(root, "ProtocolBinding"),
            force_authn: boolean(root, "ForceAuthn")?,
            is_passive: boolean(root, "IsPassive")?,
        };

        tracing::debug!(
            id = %request.id,
            issuer = ?request.issuer,
            acs = ?request.assertion_consumer_service_url,
            "parsed AuthnRequest"
        );
        Ok(request)
    }
}

fn required(element: &Element, name: &str) -> SamlResult<String> {
    match element.attribute(name) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(SamlError::Validation(format!(
            "AuthnRequest is missing required attribute {name}"
        ))),
    }
}

fn optional(element: &Element, name: &str) -> Option<String> {
    element.attribute(name).map(str::to_string)
}

fn boolean(element: &Element, name: &str) -> SamlResult<Option<bool>> {
    match element.attribute(name) {
        None => Ok(None),
        Some("true" | "1") => Ok(Some(true)),
        Some("false" | "0") => Ok(Some(false)),
        Some(other) => Err(SamlError::Validation(format!(
            "{name} must be a boolean, got {other:?}"
        ))),
    }
}
