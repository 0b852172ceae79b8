//! Subresource-integrity strings as published in `dist.integrity`.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const SHA512_PREFIX: &str = "sha512-";
const SHA512_LEN: usize = 64;

/// A SHA-512 tarball digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Integrity {
    digest: Vec<u8>,
}

impl Integrity {
    /// Wrap a raw SHA-512 digest.
    pub fn from_sha512(digest: &[u8]) -> Self {
        Self {
            digest: digest.to_vec(),
        }
    }

    /// Parse an SRI string, picking the first well-formed `sha512-` entry.
    ///
    /// Other algorithms (`sha1-`, which older packages publish) are ignored,
    /// so `None` means the caller has nothing strong enough to verify with.
    pub fn parse(sri: &str) -> Option<Self> {
        sri.split_whitespace()
            .filter_map(|entry| entry.strip_prefix(SHA512_PREFIX))
            .map(|encoded| encoded.split('?').next().unwrap_or(encoded))
            .find_map(|encoded| {
                let digest = STANDARD.decode(encoded).ok()?;
                (digest.len() == SHA512_LEN).then_some(Self { digest })
            })
    }

    /// Lowercase hex form, used to name cached tarballs.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHA512_PREFIX}{}", STANDARD.encode(&self.digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha512};

    #[test]
    fn display_roundtrips_through_parse() {
        let integrity = Integrity::from_sha512(&Sha512::digest(b"tarball"));
        let sri = integrity.to_string();
        assert!(sri.starts_with("sha512-"));
        assert_eq!(Integrity::parse(&sri), Some(integrity));
    }

    #[test]
    fn picks_sha512_among_several() {
        let integrity = Integrity::from_sha512(&Sha512::digest(b"tarball"));
        let sri = format!("sha1-2jmj7l5rSw0yVb/vlWAYkK/YBwk= {integrity}");
        assert_eq!(Integrity::parse(&sri), Some(integrity));
    }

    #[test]
    fn sha1_only_is_not_enough() {
        assert_eq!(Integrity::parse("sha1-2jmj7l5rSw0yVb/vlWAYkK/YBwk="), None);
    }

    #[test]
    fn malformed_entries_are_ignored() {
        assert_eq!(Integrity::parse("sha512-!!!"), None);
        assert_eq!(Integrity::parse("sha512-aGVsbG8="), None);
        assert_eq!(Integrity::parse(""), None);
    }

    #[test]
    fn hex_is_128_chars() {
        let integrity = Integrity::from_sha512(&Sha512::digest(b""));
        assert_eq!(integrity.to_hex().len(), 128);
    }
}
