//! Cryptographically secure random generation.

use std::fmt::Write;

use aws_lc_rs::constant_time::verify_slices_are_equal;
use rand::Rng;

/// Number of random bytes behind each generated identifier.
pub const ID_ENTROPY_BYTES: usize = 20;

/// Generates `len` bytes from the thread-local CSPRNG.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates an XML NCName-valid identifier: `_` followed by lowercase hex
/// of [`ID_ENTROPY_BYTES`] random bytes.
///
/// The leading underscore keeps the value legal even when the first hex
/// digit is numeric.
#[must_use]
pub fn new_ncname_id() -> String {
    let bytes = random_bytes(ID_ENTROPY_BYTES);
    let mut id = String::with_capacity(1 + bytes.len() * 2);
    id.push('_');
    for b in bytes {
        let _ = write!(id, "{b:02x}");
    }
    id
}

/// Compares two byte strings in time independent of where they differ.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    verify_slices_are_equal(a, b).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_bytes_have_requested_length() {
        assert_eq!(random_bytes(16).len(), 16);
        assert!(random_bytes(0).is_empty());
    }

    #[test]
    fn ids_are_ncnames() {
        let id = new_ncname_id();
        assert_eq!(id.len(), 1 + ID_ENTROPY_BYTES * 2);
        assert!(id.starts_with('_'));
        assert!(id[1..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_ncname_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn constant_time_eq_behaves_like_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret-longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
