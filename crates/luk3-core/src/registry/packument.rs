//! Registry package documents.

use std::collections::BTreeMap;

use luk3_schema::Version;
use serde::{Deserialize, Serialize};

use super::RegistryError;
use super::integrity::Integrity;

/// Abbreviated package document (`application/vnd.npm.install-v1+json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packument {
    /// Fully qualified package name, e.g. `@a4t1/skinpack-01`.
    pub name: String,
    /// Tag to version mapping.
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    /// Every published version.
    #[serde(default)]
    pub versions: BTreeMap<String, PackumentVersion>,
}

/// One published version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackumentVersion {
    /// Version string.
    pub version: String,
    /// Tarball metadata.
    pub dist: Dist,
}

/// Where to get a version's tarball and how to check it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dist {
    /// Absolute tarball URL.
    pub tarball: String,
    /// SRI string, typically `sha512-<base64>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    /// Legacy SHA-1 hex digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
}

/// A tag resolved to a concrete tarball.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// Fully qualified package name.
    pub name: String,
    /// Version the tag points at.
    pub version: Version,
    /// Tarball URL.
    pub tarball: String,
    /// SHA-512 integrity, when the registry published one.
    pub integrity: Option<Integrity>,
}

impl Packument {
    /// The version a tag currently points at.
    pub fn tagged_version(&self, tag: &str) -> Result<Version, RegistryError> {
        self.dist_tags
            .get(tag)
            .map(String::as_str)
            .map(Version::new)
            .ok_or_else(|| RegistryError::UnknownTag {
                package: self.name.clone(),
                tag: tag.to_string(),
            })
    }

    /// Resolve `tag` to a downloadable tarball.
    pub fn resolve(&self, tag: &str) -> Result<ResolvedPackage, RegistryError> {
        let version = self.tagged_version(tag)?;
        let entry =
            self.versions
                .get(version.as_str())
                .ok_or_else(|| RegistryError::MissingVersion {
                    package: self.name.clone(),
                    version: version.to_string(),
                })?;

        Ok(ResolvedPackage {
            name: self.name.clone(),
            version,
            tarball: entry.dist.tarball.clone(),
            integrity: entry.dist.integrity.as_deref().and_then(Integrity::parse),
        })
    }
}
