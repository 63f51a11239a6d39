//! Login page rendering.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Message shown when credentials are rejected.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Form action URL, carrying the original SSO query.
    pub action: String,
    /// Error message to display.
    pub error: Option<String>,
}

/// Renders the login page posting back to `/login?{query}`.
pub fn login_page(query: &str, error: Option<&str>) -> Response {
    let template = LoginTemplate {
        action: format!("/login?{query}"),
        error: error.map(String::from),
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}
