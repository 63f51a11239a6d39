//! PEM armour helpers.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Returns the base64 body of the first PEM block with the given label,
/// with armour lines and all whitespace removed.
///
/// `label` is the text between `BEGIN ` and the trailing dashes, for example
/// `CERTIFICATE` or `PRIVATE KEY`.
#[must_use]
pub fn pem_body(pem: &str, label: &str) -> Option<String> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let stop = start + pem[start..].find(&end)?;

    let body: String = pem[start..stop]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

/// Decodes the first PEM block with the given label to DER.
#[must_use]
pub fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    pem_body(pem, label).and_then(|body| STANDARD.decode(body).ok())
}

/// Strips PEM armour and line breaks from a certificate, leaving the
/// single-line base64 form embedded in `ds:X509Certificate`.
///
/// Input without armour is returned with whitespace removed.
#[must_use]
pub fn strip_certificate_armor(pem: &str) -> String {
    pem_body(pem, "CERTIFICATE").unwrap_or_else(|| {
        pem.chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "-----BEGIN CERTIFICATE-----\nTUlJ\nQkFB\n-----END CERTIFICATE-----\n";

    #[test]
    fn body_drops_armour_and_newlines() {
        assert_eq!(pem_body(SAMPLE, "CERTIFICATE").as_deref(), Some("TUlJQkFB"));
    }

    #[test]
    fn wrong_label_is_none() {
        assert!(pem_body(SAMPLE, "PRIVATE KEY").is_none());
    }

    #[test]
    fn der_decodes_body() {
        assert_eq!(pem_to_der(SAMPLE, "CERTIFICATE").unwrap(), b"MIIBAA".to_vec());
    }

    #[test]
    fn strip_accepts_bare_base64() {
        assert_eq!(strip_certificate_armor("TUlJ\r\nQkFB "), "TUlJQkFB");
        assert_eq!(strip_certificate_armor(SAMPLE), "TUlJQkFB");
    }

    #[test]
    fn empty_block_is_none() {
        let pem = "-----BEGIN CERTIFICATE-----\n\n-----END CERTIFICATE-----";
        assert!(pem_body(pem, "CERTIFICATE").is_none());
    }
}
