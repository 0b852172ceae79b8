//! The configuration document.
//!
//! A configuration declares an ordered list of bundles. Each bundle is one
//! registry package whose `dist/` directory ships a set of package files
//! ("pak3ts"), and lists the target directories those files belong in:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "bundles": [
//!     {
//!       "name": "skinpack-01",
//!       "targets": ["main", "mainta", "maintt"],
//!       "pak3ts": [
//!         { "name": "A4T1-skinpack-01.pk3", "hash": "490644880834e8c19dca5605cc4fba28" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! The document comes from the network and is untrusted: names end up as
//! path components, so they are validated here before anything touches disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::Md5Digest;
use crate::types::{BundleName, TargetName};

/// Bundle names taken by the working directory layout: the registry transfer
/// cache and the extracted configuration package live next to the bundles.
pub const RESERVED_BUNDLE_NAMES: [&str; 2] = ["cache", "luk3-config"];

/// Errors raised while loading or validating a configuration document.
#[derive(Error, Debug)]
pub enum ManifestParseError {
    /// The document could not be read from disk.
    #[error("Failed to read configuration {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not JSON of the expected shape.
    #[error("Malformed configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// Two bundles share the same name.
    #[error("Duplicate bundle '{0}'")]
    DuplicateBundle(BundleName),

    /// A bundle lists the same target twice.
    #[error("Bundle '{bundle}' lists target '{target}' more than once")]
    DuplicateTarget {
        /// Owning bundle.
        bundle: BundleName,
        /// Repeated target.
        target: TargetName,
    },

    /// A bundle lists the same package file twice.
    #[error("Bundle '{bundle}' lists package file '{file}' more than once")]
    DuplicatePackageFile {
        /// Owning bundle.
        bundle: BundleName,
        /// Repeated file name.
        file: String,
    },

    /// A name cannot be used as a single path component.
    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        /// What was being named (`bundle`, `target`, `package file`).
        kind: &'static str,
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// A validated configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Version of the configuration document itself.
    pub version: String,
    /// Bundles in processing order.
    pub bundles: Vec<Bundle>,
}

/// A named group of package files shipped together as one registry package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Registry package name of the bundle.
    pub name: BundleName,
    /// Target directories the package files are installed into, in order.
    pub targets: Vec<TargetName>,
    /// Package files shipped by the bundle, in order.
    pub pak3ts: Vec<PackageFile>,
}

/// A single installable file and the digest it must have once installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    /// File name, both inside the bundle's `dist/` and inside each target.
    pub name: String,
    /// Expected MD5 digest of the installed file.
    pub hash: Md5Digest,
}

impl Configuration {
    /// Parse and validate a configuration from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestParseError> {
        let config: Configuration = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ManifestParseError> {
        let bytes = std::fs::read(path).map_err(|source| ManifestParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&bytes)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ManifestParseError> {
        let mut seen = HashSet::new();

        for bundle in &self.bundles {
            validate_component("bundle", bundle.name.as_str())?;
            if RESERVED_BUNDLE_NAMES.contains(&bundle.name.as_str()) {
                return Err(ManifestParseError::InvalidName {
                    kind: "bundle",
                    name: bundle.name.to_string(),
                    reason: "is reserved for the working directory",
                });
            }
            if !seen.insert(bundle.name.as_str()) {
                return Err(ManifestParseError::DuplicateBundle(bundle.name.clone()));
            }
            bundle.validate()?;
        }

        Ok(())
    }

    /// Total number of `(target, file)` pairs the configuration manages.
    pub fn managed_file_count(&self) -> usize {
        self.bundles
            .iter()
            .map(|b| b.targets.len() * b.pak3ts.len())
            .sum()
    }
}

impl Bundle {
    fn validate(&self) -> Result<(), ManifestParseError> {
        let mut targets = HashSet::new();
        for target in &self.targets {
            validate_component("target", target.as_str())?;
            if !targets.insert(target) {
                return Err(ManifestParseError::DuplicateTarget {
                    bundle: self.name.clone(),
                    target: target.clone(),
                });
            }
        }

        let mut files = HashSet::new();
        for pak3t in &self.pak3ts {
            validate_component("package file", &pak3t.name)?;
            if !files.insert(pak3t.name.as_str()) {
                return Err(ManifestParseError::DuplicatePackageFile {
                    bundle: self.name.clone(),
                    file: pak3t.name.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Names become path components under the installation root, so anything that
/// could climb out of it or address a different drive is rejected.
fn validate_component(kind: &'static str, name: &str) -> Result<(), ManifestParseError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.starts_with('.') {
        Some("must not start with '.'")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name.contains(':') || name.contains('\0') {
        Some("contains a reserved character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ManifestParseError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
