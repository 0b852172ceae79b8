//! Filesystem layout of an installation.
//!
//! ```text
//! <root>/
//! ├── MOHAA.exe               # installation marker
//! ├── LUK3_TOK3N              # registry credential (optional, see --token)
//! ├── main/                   # targets: installed package files
//! ├── mainta/
//! ├── maintt/
//! └── .cache/
//!     ├── cache/              # registry transfer cache (packuments, tarballs)
//!     ├── luk3-config/        # extracted configuration package
//!     └── <bundle>/dist/      # extracted bundle archives
//! ```

use std::path::{Path, PathBuf};

use luk3_schema::TargetName;

/// Hidden working directory under the installation root.
pub const CACHE_DIR: &str = ".cache";
/// Registry transfer cache, inside [`CACHE_DIR`].
pub const TRANSFER_CACHE_DIR: &str = "cache";
/// Directory inside an extracted bundle that holds the installable files.
pub const DIST_DIR: &str = "dist";
/// Executable whose presence marks a real game installation.
pub const MARKER_FILE: &str = "MOHAA.exe";
/// File holding the registry credential when none is given on the command line.
pub const TOKEN_FILE: &str = "LUK3_TOK3N";

/// The base directory of one game installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoot {
    path: PathBuf,
}

impl InstallRoot {
    /// Wrap an already resolved installation directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve a user-supplied path: absolute paths are taken as-is, relative
    /// ones are joined onto `cwd`.
    pub fn resolve(path: &Path, cwd: &Path) -> Self {
        if path.is_absolute() {
            Self::new(path)
        } else {
            Self::new(cwd.join(path))
        }
    }

    /// The installation directory itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<root>/<target>`
    pub fn target_dir(&self, target: &TargetName) -> PathBuf {
        self.path.join(target)
    }

    /// `<root>/.cache`
    pub fn cache_dir(&self) -> PathBuf {
        self.path.join(CACHE_DIR)
    }

    /// `<root>/MOHAA.exe`
    pub fn marker_path(&self) -> PathBuf {
        self.path.join(MARKER_FILE)
    }

    /// `<root>/LUK3_TOK3N`
    pub fn token_path(&self) -> PathBuf {
        self.path.join(TOKEN_FILE)
    }
}

/// `<cache>/cache`, where `cache_dir` is [`InstallRoot::cache_dir`].
pub fn transfer_cache_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join(TRANSFER_CACHE_DIR)
}

/// `<cache>/<package>`, the extraction directory of one package.
pub fn package_dir(cache_dir: &Path, package: &str) -> PathBuf {
    cache_dir.join(package)
}

/// `<extracted>/dist`
pub fn dist_dir(extracted: &Path) -> PathBuf {
    extracted.join(DIST_DIR)
}
