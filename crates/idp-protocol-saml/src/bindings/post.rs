//! HTTP-POST binding for outbound responses.
//!
//! The signed response is base64-encoded into a hidden form field and the
//! browser is made to submit it to the SP's assertion consumer service.

use base64::Engine;

use super::{SamlMessageType, RELAY_STATE_PARAM};
use crate::error::{SamlError, SamlResult};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a SAML response for HTTP-POST binding.
    ///
    /// Returns an HTML page whose form auto-submits to `destination`. Every
    /// interpolated value is HTML-escaped.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
        let param_name = SamlMessageType::Response.form_param();

        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="{RELAY_STATE_PARAM}" value="{}"/>"#,
                    html_escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            param_name,
            html_escape(&encoded),
            relay_state_input
        )
    }

    /// Decodes a `SAMLResponse` form value back to XML.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Decode`] on invalid base64 or UTF-8.
    pub fn decode_response(encoded: &str) -> SamlResult<String> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(compact)?;
        String::from_utf8(decoded)
            .map_err(|e| SamlError::Decode(format!("invalid UTF-8 in message: {e}")))
    }
}

/// Escapes text for use in HTML content and double- or single-quoted
/// attributes.
#[must_use]
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_posts_response_to_destination() {
        let html = HttpPostBinding::encode_response("<Response/>", "https://sp.example/acs", Some("rs"));
        assert!(html.contains(r#"action="https://sp.example/acs""#));
        assert!(html.contains(r#"name="SAMLResponse" value="PFJlc3BvbnNlLz4=""#));
        assert!(html.contains(r#"name="RelayState" value="rs""#));
        assert!(html.contains("document.forms[0].submit()"));
    }

    #[test]
    fn relay_state_is_optional() {
        let html = HttpPostBinding::encode_response("<Response/>", "https://sp.example/acs", None);
        assert!(!html.contains("RelayState"));
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let html = HttpPostBinding::encode_response(
            "<Response/>",
            r#"https://sp.example/acs?a=1&b="><script>"#,
            Some(r#""><script>alert(1)</script>"#),
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("a=1&amp;b=&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn decode_reverses_encoding() {
        assert_eq!(
            HttpPostBinding::decode_response("PFJlc3Bv\nbnNlLz4=").unwrap(),
            "<Response/>"
        );
        assert!(matches!(
            HttpPostBinding::decode_response("@@"),
            Err(SamlError::Decode(_))
        ));
    }

    #[test]
    fn html_escape_covers_quotes() {
        assert_eq!(html_escape(r#"<a href='x'>"&"#), "&lt;a href=&#x27;x&#x27;&gt;&quot;&amp;");
    }
}
