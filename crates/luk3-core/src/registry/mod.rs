//! Remote package fetching.
//!
//! Bundles are published as packages on an npm-protocol registry (GitHub
//! Packages by default). Fetching a bundle resolves its `latest` tag, pulls
//! the tarball through the transfer cache and extracts it into
//! `<root>/.cache/<bundle>`.

mod cache;
mod client;
mod integrity;
mod packument;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use luk3_schema::Version;
use thiserror::Error;

use crate::io::ExtractError;

pub use cache::{TransferCache, encode_package};
pub use client::RegistryClient;
pub use integrity::Integrity;
pub use packument::{Dist, Packument, PackumentVersion, ResolvedPackage};

/// Registry used when none is configured.
pub const DEFAULT_REGISTRY: &str = "https://npm.pkg.github.com/";
/// Scope every luk3 package is published under.
pub const DEFAULT_SCOPE: &str = "@a4t1";
/// Tag resolved for every package.
pub const DEFAULT_TAG: &str = "latest";

/// Connection settings for [`RegistryClient`].
#[derive(Clone)]
pub struct RegistryOptions {
    /// Registry base URL.
    pub registry: String,
    /// Scope prepended to bare package names (`@a4t1`).
    pub scope: Option<String>,
    /// Bearer token for the registry.
    pub token: Option<String>,
    /// Serve recently cached packuments without asking the registry.
    pub prefer_offline: bool,
    /// Dist-tag to resolve.
    pub tag: String,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            scope: Some(DEFAULT_SCOPE.to_string()),
            token: None,
            prefer_offline: true,
            tag: DEFAULT_TAG.to_string(),
        }
    }
}

impl std::fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("registry", &self.registry)
            .field("scope", &self.scope)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("prefer_offline", &self.prefer_offline)
            .field("tag", &self.tag)
            .finish()
    }
}

/// A package that was resolved and extracted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBundle {
    /// Package name as requested (unscoped).
    pub name: String,
    /// Version that was extracted.
    pub version: Version,
    /// `<cache>/<name>`, the extracted package root.
    pub package_dir: PathBuf,
    /// `<cache>/<name>/dist`, where installable files live.
    pub dist_dir: PathBuf,
}

/// Talking to the registry failed.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The package document could not be parsed.
    #[error("Invalid package document from {url}: {source}")]
    Json {
        /// Requested URL.
        url: String,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The package has no such dist-tag.
    #[error("{package} has no '{tag}' tag")]
    UnknownTag {
        /// Fully qualified package name.
        package: String,
        /// Requested tag.
        tag: String,
    },

    /// A dist-tag points at a version that is not listed.
    #[error("{package}@{version} is not published")]
    MissingVersion {
        /// Fully qualified package name.
        package: String,
        /// Version the tag points at.
        version: String,
    },
}

impl RegistryError {
    /// Whether the registry could not be reached at all, as opposed to
    /// answering with something unusable.
    pub fn is_offline(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Fetching a package failed. Scoped to one bundle.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The package could not be resolved or downloaded.
    #[error("Failed to fetch {package}: {source}")]
    RegistryUnreachable {
        /// Package name as requested.
        package: String,
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },

    /// The tarball was obtained but could not be verified or unpacked.
    #[error("Failed to extract {package}: {source}")]
    ExtractionFailed {
        /// Package name as requested.
        package: String,
        /// Underlying extraction error.
        #[source]
        source: ExtractError,
    },
}

/// Source of extracted packages.
#[async_trait]
pub trait PackageFetcher: Send + Sync {
    /// Obtain the latest archive of `package` and extract it into
    /// `<cache_dir>/<package>`, replacing whatever was there.
    async fn fetch(&self, package: &str, cache_dir: &Path) -> Result<FetchedBundle, FetchError>;
}
