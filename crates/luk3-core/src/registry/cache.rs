//! On-disk transfer cache for registry responses.
//!
//! ```text
//! <cache>/
//! ├── packuments/@a4t1%2fskinpack-01.json
//! └── content/<sha512 hex>.tgz
//! ```
//!
//! Tarballs are content-addressed, so a cached entry is reused only after
//! its digest re-verifies.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::integrity::Integrity;
use super::packument::Packument;
use crate::io::file_integrity;

const PACKUMENTS_DIR: &str = "packuments";
const CONTENT_DIR: &str = "content";

/// Registry transfer cache rooted at `<root>/.cache/cache`.
#[derive(Debug, Clone)]
pub struct TransferCache {
    root: PathBuf,
}

impl TransferCache {
    /// Use `root` as cache directory. Nothing is created until first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn packument_path(&self, package: &str) -> PathBuf {
        self.root
            .join(PACKUMENTS_DIR)
            .join(format!("{}.json", encode_package(package)))
    }

    /// Content-addressed location of a tarball.
    pub fn tarball_path(&self, integrity: &Integrity) -> PathBuf {
        self.root
            .join(CONTENT_DIR)
            .join(format!("{}.tgz", integrity.to_hex()))
    }

    /// Location for a tarball the registry published no integrity for.
    /// Never reused across runs.
    pub fn unverified_tarball_path(&self, package: &str, version: &str) -> PathBuf {
        self.root
            .join(CONTENT_DIR)
            .join(format!("{}-{version}.tgz", encode_package(package)))
    }

    /// Load a cached packument.
    ///
    /// With `max_age`, entries older than that are ignored. Unreadable or
    /// corrupt entries are treated as absent.
    pub async fn load_packument(&self, package: &str, max_age: Option<Duration>) -> Option<Packument> {
        let path = self.packument_path(package);

        if let Some(max_age) = max_age {
            let modified = tokio::fs::metadata(&path).await.ok()?.modified().ok()?;
            let age = modified.elapsed().unwrap_or(Duration::MAX);
            if age > max_age {
                debug!(package, age_secs = age.as_secs(), "cached packument is stale");
                return None;
            }
        }

        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(packument) => Some(packument),
            Err(e) => {
                warn!(path = %path.display(), "ignoring corrupt cached packument: {e}");
                None
            }
        }
    }

    /// Store a packument, replacing any previous entry atomically.
    pub async fn store_packument(&self, packument: &Packument) -> io::Result<()> {
        let path = self.packument_path(&packument.name);
        let dir = self.root.join(PACKUMENTS_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let content = serde_json::to_vec(packument).map_err(io::Error::other)?;
        let temp = path.with_extension("json.tmp");
        tokio::fs::write(&temp, content).await?;
        tokio::fs::rename(&temp, &path).await
    }

    /// A cached tarball whose contents still match `integrity`.
    ///
    /// An entry that fails verification is removed.
    pub async fn cached_tarball(&self, integrity: &Integrity) -> Option<PathBuf> {
        let path = self.tarball_path(integrity);
        let actual = file_integrity(&path).await.ok()?;
        if &actual == integrity {
            Some(path)
        } else {
            warn!(path = %path.display(), "cached tarball failed verification, discarding");
            tokio::fs::remove_file(&path).await.ok();
            None
        }
    }

    /// Make sure the content directory exists.
    pub async fn prepare_content_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.root.join(CONTENT_DIR)).await
    }
}

/// `@scope/name` -> `@scope%2fname`, the registry's own escaping.
pub fn encode_package(package: &str) -> String {
    package.replace('/', "%2f")
}
