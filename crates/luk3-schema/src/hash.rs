use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Number of hex characters in an MD5 digest.
pub const MD5_HEX_LEN: usize = 32;

/// Errors produced when validating a digest string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The digest does not have exactly [`MD5_HEX_LEN`] characters.
    #[error("Invalid MD5 digest: expected 32 hex characters, got {len} in '{value}'")]
    InvalidLength {
        /// Length of the rejected input.
        len: usize,
        /// The rejected input.
        value: String,
    },

    /// The digest contains characters outside `[0-9a-fA-F]`.
    #[error("Invalid MD5 digest: contains non-hex characters in '{0}'")]
    NonHex(String),
}

/// A validated MD5 digest (32 hex characters, stored lowercase).
///
/// Every package file digest in a configuration uses this one scheme, so two
/// digests compare equal regardless of the case they were written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Md5Digest(String);

impl Md5Digest {
    /// Create a new `Md5Digest`, validating and lowercasing the input.
    ///
    /// Accepts strings with or without an `md5:` prefix.
    pub fn new(s: impl Into<String>) -> Result<Self, DigestError> {
        let s = s.into();
        let hex = s.strip_prefix("md5:").unwrap_or(&s).trim();

        if hex.len() != MD5_HEX_LEN {
            return Err(DigestError::InvalidLength {
                len: hex.len(),
                value: s.clone(),
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NonHex(s.clone()));
        }

        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Build a digest from raw digest bytes (as produced by a hasher).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Get the digest as a lowercase hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Md5Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for Md5Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Md5Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Md5Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
