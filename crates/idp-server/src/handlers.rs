//! SSO, login and metadata handlers.
//!
//! The service provider redirects the browser to `/sso`, which forwards the
//! query to the login page. The login form posts back with the same query;
//! on success the browser receives an auto-submitting form carrying the
//! signed response to the ACS URL.

use axum::{
    extract::{Query, RawQuery, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;

use idp_protocol_saml::bindings::SamlMessageType;
use idp_protocol_saml::metadata::METADATA_CONTENT_TYPE;
use idp_protocol_saml::SamlError;

use crate::state::AppState;
use crate::ui::{login_page, INVALID_CREDENTIALS};

/// Banner returned at the root path.
pub const BANNER: &str = "<Response><Message>saml idp with lambda!</Message></Response>";

/// Query parameters of the HTTP-Redirect binding.
#[derive(Debug, Default, Deserialize)]
pub struct SsoParams {
    /// Encoded `AuthnRequest`.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
    /// Opaque SP state.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// Login form submission.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

/// GET `/`.
pub async fn banner() -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], BANNER).into_response()
}

/// GET `/metadata`.
pub async fn metadata(State(state): State<AppState>) -> Response {
    match state.sso.metadata().await {
        Ok(document) => ([(header::CONTENT_TYPE, METADATA_CONTENT_TYPE)], document).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/sso`: forwards the binding parameters to the login page.
pub async fn sso_redirect(RawQuery(query): RawQuery) -> Response {
    let location = format!("/login?{}", query.unwrap_or_default());
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// GET `/login`: checks the request is usable, then shows the form.
pub async fn login_form(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Query(params): Query<SsoParams>,
) -> Response {
    if let Err(e) = decode(&state, &params) {
        return error_response(&e);
    }
    login_page(&query.unwrap_or_default(), None)
}

/// POST `/login`: authenticates and answers the SP.
pub async fn login_submit(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Query(params): Query<SsoParams>,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(user) = state.authenticator.authenticate(&form.username, &form.password) else {
        tracing::warn!(username = %form.username, "login failed");
        return login_page(&query.unwrap_or_default(), Some(INVALID_CREDENTIALS));
    };
    tracing::debug!(username = %user.username, "login succeeded");

    let request = match decode(&state, &params) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };
    match state.sso.issue_response(&request, &user, params.relay_state).await {
        Ok(signed) => Html(signed.post_form()).into_response(),
        Err(e) => error_response(&e),
    }
}

fn decode(
    state: &AppState,
    params: &SsoParams,
) -> Result<idp_protocol_saml::AuthnRequest, SamlError> {
    let saml_request = params
        .saml_request
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            SamlError::Decode(format!(
                "missing {} parameter",
                SamlMessageType::Request.form_param()
            ))
        })?;
    state.sso.decode_request(saml_request)
}

/// Maps a pipeline error to an HTTP response. Server-side failures are not
/// described to the client; the SAML status code is always included.
pub fn error_response(err: &SamlError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let saml_status = err.status_code();
    if err.is_client_error() {
        tracing::warn!(%status, saml_status, error = %err, "rejected SAML request");
        (status, format!("{err}\n{saml_status}")).into_response()
    } else {
        tracing::error!(%status, saml_status, error = %err, "SAML processing failed");
        let reason = status.canonical_reason().unwrap_or("error");
        (status, format!("{reason}\n{saml_status}")).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_protocol_saml::secrets::SecretError;

    #[test]
    fn client_errors_are_described() {
        let response = error_response(&SamlError::Validation("bad ACS".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn transient_secret_failure_is_unavailable() {
        let err = SamlError::SecretRetrieval(SecretError::Transient("throttled".to_string()));
        assert_eq!(error_response(&err).status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
