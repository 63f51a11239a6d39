//! HTTP-Redirect binding codec for inbound requests.
//!
//! Decoding runs percent-decoding, base64 and decompression. SPs disagree on
//! whether the DEFLATE stream is zlib-wrapped, so decompression walks
//! [`DECODE_STRATEGIES`] in order and takes the first that succeeds.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;

use super::{SamlMessageType, RELAY_STATE_PARAM};
use crate::error::{SamlError, SamlResult};

/// Upper bound on decompressed request size.
pub const MAX_INFLATED_BYTES: u64 = 1024 * 1024;

/// DEFLATE framing of an encoded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeflateVariant {
    /// Raw DEFLATE (RFC 1951), what the binding specifies.
    #[default]
    Raw,
    /// zlib-wrapped DEFLATE (RFC 1950), sent by some SPs.
    Zlib,
}

/// Decompression strategies, tried in order.
pub const DECODE_STRATEGIES: [DeflateVariant; 2] = [DeflateVariant::Zlib, DeflateVariant::Raw];

impl DeflateVariant {
    fn inflate(self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Self::Raw => DeflateDecoder::new(data)
                .take(MAX_INFLATED_BYTES + 1)
                .read_to_end(&mut out)?,
            Self::Zlib => ZlibDecoder::new(data)
                .take(MAX_INFLATED_BYTES + 1)
                .read_to_end(&mut out)?,
        };
        if out.len() as u64 > MAX_INFLATED_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "decompressed request exceeds size limit",
            ));
        }
        Ok(out)
    }

    fn deflate(self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Raw => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Self::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
        }
    }
}

/// Encoder/decoder for the `SAMLRequest` parameter.
pub struct RequestCodec;

impl RequestCodec {
    /// Decodes a `SAMLRequest` value into request XML.
    ///
    /// The value may or may not already be percent-decoded by the web
    /// framework; base64 never contains `%`, so decoding twice is harmless.
    /// Spaces are read as `+`; line breaks are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Decode`] if any layer fails, including when
    /// every decompression strategy fails or the output is not UTF-8.
    pub fn decode(encoded: &str) -> SamlResult<String> {
        let url_decoded = urlencoding::decode(encoded)
            .map_err(|e| SamlError::Decode(format!("URL decode error: {e}")))?;

        // Form decoding turns an unescaped `+` into a space.
        let compact: String = url_decoded
            .chars()
            .map(|c| if c == ' ' { '+' } else { c })
            .filter(|c| !c.is_whitespace())
            .collect();
        if compact.is_empty() {
            return Err(SamlError::Decode("empty SAMLRequest".to_string()));
        }
        let compressed = base64::engine::general_purpose::STANDARD.decode(compact)?;

        let mut failures = Vec::new();
        for variant in DECODE_STRATEGIES {
            match variant.inflate(&compressed) {
                Ok(bytes) => {
                    tracing::debug!(?variant, len = bytes.len(), "inflated SAMLRequest");
                    return String::from_utf8(bytes)
                        .map_err(|e| SamlError::Decode(format!("invalid UTF-8 in request: {e}")));
                }
                Err(e) => failures.push(format!("{variant:?}: {e}")),
            }
        }

        Err(SamlError::Decode(format!(
            "decompression failed ({})",
            failures.join("; ")
        )))
    }

    /// Encodes request XML for a `SAMLRequest` query parameter
    /// (compressed, base64, percent-encoded).
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Decode`] if compression fails.
    pub fn encode(xml: &str, variant: DeflateVariant) -> SamlResult<String> {
        let compressed = variant
            .deflate(xml.as_bytes())
            .map_err(|e| SamlError::Decode(format!("deflate error: {e}")))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(compressed);
        Ok(urlencoding::encode(&encoded).into_owned())
    }

    /// Builds an HTTP-Redirect URL carrying `xml` to `destination`, as an SP
    /// would.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `destination` is not an absolute
    /// URL.
    pub fn redirect_url(destination: &str, xml: &str, relay_state: Option<&str>) -> SamlResult<String> {
        let mut url = url::Url::parse(destination)
            .map_err(|e| SamlError::Validation(format!("invalid destination URL: {e}")))?;

        let compressed = DeflateVariant::Raw
            .deflate(xml.as_bytes())
            .map_err(|e| SamlError::Decode(format!("deflate error: {e}")))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(compressed);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair(SamlMessageType::Request.form_param(), &encoded);
            if let Some(rs) = relay_state {
                query.append_pair(RELAY_STATE_PARAM, rs);
            }
        }
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="req-1" Version="2.0"/>"#;

    #[test]
    fn roundtrip_both_variants() {
        for variant in [DeflateVariant::Raw, DeflateVariant::Zlib] {
            let encoded = RequestCodec::encode(XML, variant).unwrap();
            assert_eq!(RequestCodec::decode(&encoded).unwrap(), XML, "{variant:?}");
        }
    }

    #[test]
    fn accepts_already_percent_decoded_input() {
        let encoded = RequestCodec::encode(XML, DeflateVariant::Raw).unwrap();
        let decoded_once = urlencoding::decode(&encoded).unwrap().into_owned();
        assert_eq!(RequestCodec::decode(&decoded_once).unwrap(), XML);
    }

    #[test]
    fn tolerates_wrapped_base64() {
        let encoded = RequestCodec::encode(XML, DeflateVariant::Raw).unwrap();
        let b64 = urlencoding::decode(&encoded).unwrap().into_owned();
        let wrapped: String = b64
            .as_bytes()
            .chunks(16)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        assert_eq!(RequestCodec::decode(&wrapped).unwrap(), XML);
    }

    #[test]
    fn unescaped_plus_read_back_as_space_still_decodes() {
        let (xml, b64) = (0..1000)
            .map(|i| format!(r#"<a n="{i}" m="{}"/>"#, i * 7919))
            .map(|xml| {
                let encoded = RequestCodec::encode(&xml, DeflateVariant::Raw).unwrap();
                let b64 = urlencoding::decode(&encoded).unwrap().into_owned();
                (xml, b64)
            })
            .find(|(_, b64)| b64.contains('+'))
            .unwrap();

        let form_decoded = b64.replace('+', " ");
        assert_eq!(RequestCodec::decode(&form_decoded).unwrap(), xml);
    }

    #[test]
    fn garbage_is_decode_error() {
        for input in ["", "%%%", "not base64!", "aGVsbG8gd29ybGQ="] {
            assert!(
                matches!(RequestCodec::decode(input), Err(SamlError::Decode(_))),
                "expected decode error for {input:?}"
            );
        }
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let compressed = DeflateVariant::Raw.deflate(&[0xff, 0xfe, 0xfd]).unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(compressed);
        assert!(matches!(
            RequestCodec::decode(&encoded),
            Err(SamlError::Decode(_))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let big = "a".repeat(MAX_INFLATED_BYTES as usize + 10);
        let encoded = RequestCodec::encode(&big, DeflateVariant::Raw).unwrap();
        assert!(matches!(
            RequestCodec::decode(&encoded),
            Err(SamlError::Decode(_))
        ));
    }

    #[test]
    fn redirect_url_carries_request_and_relay_state() {
        let url = RequestCodec::redirect_url("https://idp.example/sso", XML, Some("state 1")).unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert_eq!(pairs[0].0, "SAMLRequest");
        assert_eq!(RequestCodec::decode(&pairs[0].1).unwrap(), XML);
        assert_eq!(pairs[1], ("RelayState".to_string(), "state 1".to_string()));
    }

    #[test]
    fn redirect_url_requires_absolute_destination() {
        assert!(matches!(
            RequestCodec::redirect_url("/sso", XML, None),
            Err(SamlError::Validation(_))
        ));
    }
}
