//! End-to-end request handling: an SP redirect in, a signed POST out.

mod common;

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use common::{IDP_SSO_URL, SP_ACS_URL, SP_ENTITY_ID};
use idp_protocol_saml::bindings::{DeflateVariant, HttpPostBinding, RequestCodec};
use idp_protocol_saml::builder::{FixedClock, ResponseBuilder};
use idp_protocol_saml::parser::AuthnRequestParser;
use idp_protocol_saml::signature::XmlSignatureValidator;
use idp_protocol_saml::types::{
    format_instant, status_codes, AuthnRequest, NameIdFormat, SAMLP_NS, SAML_NS,
};
use idp_protocol_saml::xml;
use idp_protocol_saml::SamlError;

fn authn_request(acs_url: &str) -> AuthnRequest {
    AuthnRequest::new("req-1")
        .with_issuer(SP_ENTITY_ID)
        .with_acs_url(acs_url)
        .with_destination(IDP_SSO_URL)
        .with_issue_instant("2024-05-01T11:59:58Z")
}

/// The `SAMLRequest` and `RelayState` an SP redirect would carry.
fn sp_redirect(request: &AuthnRequest, relay_state: Option<&str>) -> anyhow::Result<(String, Option<String>)> {
    let location = RequestCodec::redirect_url(IDP_SSO_URL, &request.to_element().to_xml(), relay_state)?;
    let url = url::Url::parse(&location)?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };
    let saml_request = param("SAMLRequest").ok_or_else(|| anyhow::anyhow!("no SAMLRequest"))?;
    Ok((saml_request, param("RelayState")))
}

#[tokio::test]
async fn redirect_to_signed_post() -> anyhow::Result<()> {
    let service = common::service(Some(SP_ACS_URL));
    let (saml_request, relay_state) = sp_redirect(&authn_request(SP_ACS_URL), Some("/dashboard?a=1&b=2"))?;
    assert_eq!(relay_state.as_deref(), Some("/dashboard?a=1&b=2"));

    let request = service.decode_request(&saml_request)?;
    assert_eq!(request.id, "req-1");
    assert_eq!(request.issuer.as_deref(), Some(SP_ENTITY_ID));

    let signed = service
        .issue_response(&request, &common::user(), relay_state)
        .await?;

    let form = signed.post_form();
    assert!(form.contains(r#"action="https://sp.example/acs""#));
    assert!(form.contains(r#"name="SAMLResponse""#));
    assert!(form.contains(r#"value="/dashboard?a=1&amp;b=2""#));

    let xml = HttpPostBinding::decode_response(&signed.encoded())?;
    assert_eq!(xml, signed.xml);
    XmlSignatureValidator::from_pem(common::CERT)?.validate(&xml)?;

    let root = xml::parse(&xml)?;
    assert!(root.is(SAMLP_NS, "Response"));
    assert_eq!(root.attribute("InResponseTo"), Some("req-1"));
    assert_eq!(root.attribute("Destination"), Some(SP_ACS_URL));
    assert_eq!(root.attribute("IssueInstant"), Some("2024-05-01T12:00:00.000Z"));

    let status = root.find_descendant(SAMLP_NS, "StatusCode").expect("status code");
    assert_eq!(status.attribute("Value"), Some(status_codes::SUCCESS));

    let assertion = root.find_child(SAML_NS, "Assertion").expect("assertion");
    let name_id = assertion.find_descendant(SAML_NS, "NameID").expect("name id");
    assert_eq!(name_id.text_content(), "user1@example.com");
    assert_eq!(name_id.attribute("Format"), Some(NameIdFormat::Email.uri()));

    let audience = assertion.find_descendant(SAML_NS, "Audience").expect("audience");
    assert_eq!(audience.text_content(), SP_ENTITY_ID);

    let confirmation = assertion
        .find_descendant(SAML_NS, "SubjectConfirmationData")
        .expect("confirmation data");
    assert_eq!(confirmation.attribute("InResponseTo"), Some("req-1"));
    assert_eq!(confirmation.attribute("Recipient"), Some(SP_ACS_URL));
    assert_eq!(confirmation.attribute("NotOnOrAfter"), Some("2024-05-01T12:05:00.000Z"));

    let names: Vec<String> = assertion
        .find_descendant(SAML_NS, "AttributeStatement")
        .expect("attribute statement")
        .child_elements()
        .filter_map(|a| a.attribute("Name").map(str::to_string))
        .collect();
    assert_eq!(names, ["displayName", "email", "grafana_role"]);
    assert!(xml.contains("User &lt;One&gt; &amp; Co"));
    Ok(())
}

#[tokio::test]
async fn zlib_wrapped_requests_are_accepted() -> anyhow::Result<()> {
    let service = common::service(None);
    let encoded = RequestCodec::encode(&authn_request(SP_ACS_URL).to_element().to_xml(), DeflateVariant::Zlib)?;
    let request = service.decode_request(&encoded)?;
    assert_eq!(request.assertion_consumer_service_url.as_deref(), Some(SP_ACS_URL));
    Ok(())
}

#[tokio::test]
async fn foreign_acs_url_is_refused() -> anyhow::Result<()> {
    let request = authn_request("https://evil.example/acs");

    let err = common::service(Some(SP_ACS_URL))
        .issue_response(&request, &common::user(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SamlError::Validation(_)));
    assert_eq!(err.http_status(), 400);

    let signed = common::service(None)
        .issue_response(&request, &common::user(), None)
        .await?;
    assert_eq!(signed.acs_url, "https://evil.example/acs");
    Ok(())
}

#[tokio::test]
async fn configured_acs_url_fills_in_missing_one() -> anyhow::Result<()> {
    let request = AuthnRequest::new("req-1").with_issuer(SP_ENTITY_ID);

    let signed = common::service(Some(SP_ACS_URL))
        .issue_response(&request, &common::user(), None)
        .await?;
    assert_eq!(signed.acs_url, SP_ACS_URL);

    let err = common::service(None)
        .issue_response(&request, &common::user(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SamlError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn identifiers_are_fresh_per_response() -> anyhow::Result<()> {
    let service = common::service(Some(SP_ACS_URL));
    let request = authn_request(SP_ACS_URL);

    let first = xml::parse(&service.issue_response(&request, &common::user(), None).await?.xml)?;
    let second = xml::parse(&service.issue_response(&request, &common::user(), None).await?.xml)?;

    let assertion_id = |root: &xml::Element| {
        root.find_child(SAML_NS, "Assertion")
            .and_then(|a| a.attribute("ID"))
            .map(str::to_string)
    };
    assert_ne!(first.attribute("ID"), second.attribute("ID"));
    assert_ne!(assertion_id(&first), assertion_id(&second));
    assert_ne!(first.attribute("ID").map(str::to_string), assertion_id(&first));
    Ok(())
}

#[test]
fn validity_windows_are_ordered_for_any_clock() {
    let config = common::config(Some(SP_ACS_URL));
    let request = authn_request(SP_ACS_URL);
    let clocks: [DateTime<Utc>; 5] = [
        Utc.timestamp_opt(0, 0).unwrap(),
        Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 1).unwrap(),
        common::instant(),
        Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap(),
        DateTime::<Utc>::MAX_UTC,
    ];

    for now in clocks {
        let result = ResponseBuilder::new(&config)
            .with_clock(Arc::new(FixedClock(now)))
            .with_id_generator(Arc::new(common::SequentialIds::default()))
            .build(&request, &common::user());
        match result {
            Ok(response) => {
                let assertion = &response.assertion;
                assert!(assertion.conditions.not_on_or_after > assertion.conditions.not_before);
                let data = &assertion.subject.confirmation.data;
                assert!(data.not_on_or_after > assertion.issue_instant);
                assert!(assertion.authn_statement.session_not_on_or_after > assertion.issue_instant);
                assert_eq!(format_instant(&assertion.conditions.not_before), format_instant(&now));
            }
            Err(err) => assert!(matches!(err, SamlError::Validation(_)), "{now}: {err}"),
        }
    }
}

#[test]
fn parser_reports_only_present_fields() -> anyhow::Result<()> {
    let minimal = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="req-9" Version="2.0"/>"#;
    let request = AuthnRequestParser::parse(minimal)?;
    assert_eq!(request.id, "req-9");
    assert!(request.issuer.is_none());
    assert!(request.issue_instant.is_none());
    assert!(request.destination.is_none());
    assert!(request.assertion_consumer_service_url.is_none());
    assert!(request.name_id_format.is_none());

    let full = AuthnRequestParser::parse(&authn_request(SP_ACS_URL).to_element().to_xml())?;
    assert_eq!(full.destination.as_deref(), Some(IDP_SSO_URL));
    assert_eq!(full.issue_instant.as_deref(), Some("2024-05-01T11:59:58Z"));
    assert!(full.issue_instant_utc()?.is_some());

    let partial = format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="req-7" Version="2.0" AssertionConsumerServiceURL="{SP_ACS_URL}"><samlp:NameIDPolicy Format="{}"/></samlp:AuthnRequest>"#,
        NameIdFormat::Email.uri()
    );
    let partial = AuthnRequestParser::parse(&partial)?;
    assert_eq!(partial.id, "req-7");
    assert_eq!(partial.assertion_consumer_service_url.as_deref(), Some(SP_ACS_URL));
    assert_eq!(partial.name_id_format.as_deref(), Some(NameIdFormat::Email.uri()));
    assert_eq!(partial.issuer, None);
    assert_eq!(partial.issue_instant, None);
    assert_eq!(partial.destination, None);
    assert_eq!(partial.protocol_binding, None);
    assert_eq!(partial.force_authn, None);
    assert_eq!(partial.is_passive, None);
    Ok(())
}
