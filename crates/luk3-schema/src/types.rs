use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Name of a bundle, doubling as its registry package name (without scope).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleName(String);

impl BundleName {
    /// Create a new bundle name (stored as-is).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BundleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for BundleName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for BundleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for BundleName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl Borrow<str> for BundleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for BundleName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for BundleName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BundleName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Name of a target directory directly under the installation root (e.g. `main`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetName(String);

impl TargetName {
    /// Create a new target name (stored as-is).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TargetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<std::path::Path> for TargetName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl PartialEq<&str> for TargetName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for TargetName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A published package version string, stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` is a strictly newer semver release than `other`.
    ///
    /// Returns `false` when either side is not valid semver.
    pub fn is_newer_than(&self, other: &Version) -> bool {
        match (
            semver::Version::parse(self.0.trim_start_matches('v')),
            semver::Version::parse(other.0.trim_start_matches('v')),
        ) {
            (Ok(a), Ok(b)) => a > b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_newer_than_compares_by_semver() {
        assert!(Version::from("1.10.0").is_newer_than(&Version::from("1.9.0")));
        assert!(Version::from("2.0.0").is_newer_than(&Version::from("2.0.0-rc.1")));
        assert!(!Version::from("0.1.0-3-gabc123").is_newer_than(&Version::from("0.1.0")));
    }

    #[test]
    fn is_newer_than_ignores_v_prefix_and_garbage() {
        assert!(Version::from("v1.2.0").is_newer_than(&Version::from("1.1.9")));
        assert!(!Version::from("1.1.9").is_newer_than(&Version::from("1.1.9")));
        assert!(!Version::from("latest").is_newer_than(&Version::from("1.0.0")));
    }
}
