//! Single sign-on pipeline.
//!
//! [`SsoService`] owns the startup configuration and the secret source and
//! drives one request from the encoded `SAMLRequest` to a signed response
//! ready for HTTP-POST delivery. It holds no per-request state and is shared
//! behind an `Arc`.

use std::sync::Arc;

use base64::Engine;
use idp_core::{IdpConfig, UserProfile};

use crate::bindings::{HttpPostBinding, RequestCodec};
use crate::builder::{Clock, IdGenerator, RandomIdGenerator, ResponseBuilder, SystemClock};
use crate::metadata::MetadataGenerator;
use crate::parser::AuthnRequestParser;
use crate::secrets::{fetch_secret, RetryPolicy, SecretProvider, SigningMaterial};
use crate::types::{AuthnRequest, SamlBinding};
use crate::{SamlError, SamlResult};

/// A signed response and where to deliver it.
#[derive(Debug, Clone)]
pub struct SignedResponse {
    /// The signed `samlp:Response` document.
    pub xml: String,
    /// `ID` of the response.
    pub response_id: String,
    /// ACS URL the response is posted to.
    pub acs_url: String,
    /// `RelayState` echoed back to the service provider.
    pub relay_state: Option<String>,
}

impl SignedResponse {
    /// Base64 of the signed document, as carried in `SAMLResponse`.
    #[must_use]
    pub fn encoded(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.xml)
    }

    /// Auto-submitting HTML form delivering the response.
    #[must_use]
    pub fn post_form(&self) -> String {
        HttpPostBinding::encode_response(&self.xml, &self.acs_url, self.relay_state.as_deref())
    }
}

/// Request-to-response pipeline for one identity provider.
pub struct SsoService {
    config: Arc<IdpConfig>,
    secrets: Arc<dyn SecretProvider>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl SsoService {
    /// Creates a service with the system clock and random identifiers.
    pub fn new(config: Arc<IdpConfig>, secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            config,
            secrets,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdGenerator),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the identifier source.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Decodes and parses an HTTP-Redirect `SAMLRequest` value.
    ///
    /// Requests this provider cannot answer interactively over HTTP-POST are
    /// refused here, before the login form is shown.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Decode`], [`SamlError::Parse`] or
    /// [`SamlError::Validation`] for the respective layer, and
    /// [`SamlError::NoPassive`] when the request sets `IsPassive`.
    pub fn decode_request(&self, saml_request: &str) -> SamlResult<AuthnRequest> {
        let xml = RequestCodec::decode(saml_request)?;
        let request = AuthnRequestParser::parse(&xml)?;
        check_answerable(&request)?;
        tracing::debug!(
            request_id = %request.id,
            issuer = request.issuer.as_deref().unwrap_or_default(),
            "decoded AuthnRequest"
        );
        Ok(request)
    }

    /// Builds and signs the response to `request` for `user`.
    ///
    /// The response is validated and built before any key material is
    /// fetched; the key is dropped once the document is signed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::Validation`] from building,
    /// [`crate::SamlError::SecretRetrieval`] if key material cannot be
    /// fetched, and [`crate::SamlError::Signing`] if it cannot be used.
    pub async fn issue_response(
        &self,
        request: &AuthnRequest,
        user: &UserProfile,
        relay_state: Option<String>,
    ) -> SamlResult<SignedResponse> {
        let response = ResponseBuilder::new(&self.config)
            .with_clock(Arc::clone(&self.clock))
            .with_id_generator(Arc::clone(&self.ids))
            .build(request, user)?;

        let retry = RetryPolicy::default();
        let material = SigningMaterial::load(self.secrets.as_ref(), &self.config.secrets, retry).await?;
        let xml = material.into_signer()?.sign_response(&response)?;

        tracing::info!(
            response_id = %response.id,
            assertion_id = %response.assertion.id,
            in_response_to = %response.in_response_to,
            acs_url = %response.destination,
            "issued SAML response"
        );
        Ok(SignedResponse {
            xml,
            response_id: response.id,
            acs_url: response.destination,
            relay_state: relay_state.filter(|rs| !rs.is_empty()),
        })
    }

    /// Generates metadata with the current signing certificate.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::SecretRetrieval`] if the certificate
    /// cannot be fetched and [`crate::SamlError::Configuration`] if it is
    /// unusable.
    pub async fn metadata(&self) -> SamlResult<String> {
        let certificate = fetch_secret(
            self.secrets.as_ref(),
            &self.config.secrets.certificate,
            RetryPolicy::default(),
        )
        .await?;
        MetadataGenerator::generate(&self.config.endpoint, &self.config.entity_id, Some(&certificate))
    }
}

fn check_answerable(request: &AuthnRequest) -> SamlResult<()> {
    request.issue_instant_utc()?;
    if let Some(binding) = &request.protocol_binding {
        if request.requested_binding() != Some(SamlBinding::HttpPost) {
            return Err(SamlError::Validation(format!(
                "responses cannot be delivered over {binding}"
            )));
        }
    }
    if request.is_passive == Some(true) {
        tracing::info!(request_id = %request.id, "refusing passive request");
        return Err(SamlError::NoPassive);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::DeflateVariant;
    use crate::secrets::StaticSecretProvider;
    use crate::signature::XmlSignatureValidator;

    const KEY: &str = include_str!("../tests/fixtures/idp.key");
    const CERT: &str = include_str!("../tests/fixtures/idp.crt");

    fn secrets() -> StaticSecretProvider {
        StaticSecretProvider::new()
            .with_secret("PRIVATE_KEY", KEY)
            .with_secret("PUBLIC_CRT", CERT)
    }

    fn service(secrets: StaticSecretProvider) -> SsoService {
        let config = IdpConfig {
            expected_acs_url: Some("https://sp.example/acs".to_string()),
            ..IdpConfig::default()
        };
        SsoService::new(Arc::new(config), Arc::new(secrets))
    }

    fn sp_request() -> AuthnRequest {
        AuthnRequest::new("req-1")
            .with_issuer("https://sp.example/metadata")
            .with_acs_url("https://sp.example/acs")
    }

    fn encode(request: &AuthnRequest) -> String {
        RequestCodec::encode(&request.to_element().to_xml(), DeflateVariant::Raw).unwrap()
    }

    fn encoded_request() -> String {
        encode(&sp_request())
    }

    #[tokio::test]
    async fn issues_signed_response() {
        let service = service(secrets());
        let request = service.decode_request(&encoded_request()).unwrap();
        let user = UserProfile::new("user1");

        let signed = service
            .issue_response(&request, &user, Some("state-1".to_string()))
            .await
            .unwrap();

        assert_eq!(signed.acs_url, "https://sp.example/acs");
        assert_eq!(signed.relay_state.as_deref(), Some("state-1"));
        let verified = XmlSignatureValidator::new().validate(&signed.xml).unwrap();
        assert_eq!(verified.reference_id, signed.response_id);

        let form = signed.post_form();
        assert!(form.contains(r#"action="https://sp.example/acs""#));
        assert!(form.contains(&signed.encoded()));
        assert!(form.contains(r#"value="state-1""#));
    }

    #[tokio::test]
    async fn missing_key_is_secret_error() {
        let service = service(StaticSecretProvider::new().with_secret("PUBLIC_CRT", CERT));
        let request = service.decode_request(&encoded_request()).unwrap();
        let err = service
            .issue_response(&request, &UserProfile::new("user1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::SecretRetrieval(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn validation_happens_before_secrets() {
        let service = service(StaticSecretProvider::new());
        let request = AuthnRequest::new("req-1")
            .with_issuer("https://sp.example/metadata")
            .with_acs_url("https://evil.example/acs");
        let err = service
            .issue_response(&request, &UserProfile::new("user1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SamlError::Validation(_)));
    }

    #[tokio::test]
    async fn metadata_uses_certificate_secret() {
        let document = service(secrets()).metadata().await.unwrap();
        assert!(document.contains("IDPSSODescriptor"));

        let err = service(StaticSecretProvider::new()).metadata().await.unwrap_err();
        assert!(matches!(err, SamlError::SecretRetrieval(_)));
    }

    #[test]
    fn garbage_request_is_decode_error() {
        let err = service(secrets()).decode_request("%%%").unwrap_err();
        assert!(matches!(err, SamlError::Decode(_)));
    }

    #[test]
    fn passive_requests_are_refused() {
        let service = service(secrets());
        let passive = AuthnRequest {
            is_passive: Some(true),
            ..sp_request()
        };
        let err = service.decode_request(&encode(&passive)).unwrap_err();
        assert!(matches!(err, SamlError::NoPassive));

        let interactive = AuthnRequest {
            is_passive: Some(false),
            ..sp_request()
        };
        assert!(service.decode_request(&encode(&interactive)).is_ok());
    }

    #[test]
    fn only_post_responses_are_deliverable() {
        let service = service(secrets());
        let post = sp_request().with_binding(SamlBinding::HttpPost);
        assert!(service.decode_request(&encode(&post)).is_ok());

        for binding in [
            SamlBinding::HttpRedirect.uri(),
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact",
        ] {
            let request = AuthnRequest {
                protocol_binding: Some(binding.to_string()),
                ..sp_request()
            };
            let err = service.decode_request(&encode(&request)).unwrap_err();
            assert!(matches!(err, SamlError::Validation(_)), "{binding}");
        }
    }

    #[test]
    fn malformed_issue_instant_is_refused() {
        let request = sp_request().with_issue_instant("yesterday");
        let err = service(secrets()).decode_request(&encode(&request)).unwrap_err();
        assert!(matches!(err, SamlError::Validation(_)));
    }
}
