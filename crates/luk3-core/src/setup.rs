//! Run preconditions: installation marker, credential, configuration.

use std::io;
use std::path::{Path, PathBuf};

use luk3_schema::{Configuration, ManifestParseError, Version};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::paths::InstallRoot;
use crate::registry::{FetchError, PackageFetcher, RegistryClient};

/// Registry package carrying the configuration document.
pub const CONFIG_PACKAGE: &str = "luk3-config";
/// Registry package of the tool itself, checked for newer releases.
pub const SELF_PACKAGE: &str = "luk3";
/// Where new releases of the tool are published.
pub const RELEASES_URL: &str = "https://github.com/a4t1/luk3/releases";
/// Configuration document inside [`CONFIG_PACKAGE`].
pub const CONFIG_FILE: &str = "config.json";

/// A precondition of the run is not met. Fatal.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The root does not look like a game installation.
    #[error("{} not found; this does not look like a game installation", .path.display())]
    MissingMarker {
        /// Expected marker path.
        path: PathBuf,
    },

    /// No registry credential was given or found.
    #[error("Registry token not available: none given and {} could not be read", .path.display())]
    MissingCredential {
        /// Token file that was tried.
        path: PathBuf,
        /// Why the token file could not be used, if it exists.
        #[source]
        source: Option<io::Error>,
    },

    /// The configuration package could not be fetched.
    #[error("Configuration unavailable: {0}")]
    ConfigUnreachable(#[from] FetchError),

    /// The configuration document is invalid.
    #[error("Invalid configuration: {0}")]
    Manifest(#[from] ManifestParseError),

    /// Filesystem failure while preparing the run.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Where the configuration document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A local JSON file.
    File(PathBuf),
    /// The latest [`CONFIG_PACKAGE`] on the registry.
    Registry,
}

/// Require the installation marker unless `force` is set.
pub fn check_marker(root: &InstallRoot, force: bool) -> Result<(), SetupError> {
    let path = root.marker_path();
    if path.is_file() {
        return Ok(());
    }
    if force {
        warn!(path = %path.display(), "installation marker missing, continuing because of --force");
        return Ok(());
    }
    Err(SetupError::MissingMarker { path })
}

/// The registry token: `explicit` if given, else the token file in the root.
///
/// Surrounding whitespace is trimmed; an empty token counts as missing.
pub fn read_token(root: &InstallRoot, explicit: Option<&str>) -> Result<String, SetupError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    let path = root.token_path();
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(SetupError::MissingCredential {
                path,
                source: Some(e),
            });
        }
    };

    let token = content.trim();
    if token.is_empty() {
        return Err(SetupError::MissingCredential { path, source: None });
    }
    debug!(path = %path.display(), "using token file");
    Ok(token.to_string())
}

/// Obtain and validate the configuration document.
pub async fn load_configuration(
    source: &ConfigSource,
    fetcher: &dyn PackageFetcher,
    root: &InstallRoot,
) -> Result<Configuration, SetupError> {
    let path = match source {
        ConfigSource::File(path) => path.clone(),
        ConfigSource::Registry => {
            let fetched = fetcher.fetch(CONFIG_PACKAGE, &root.cache_dir()).await?;
            info!(version = %fetched.version, "configuration package fetched");
            config_path(&fetched.package_dir, &fetched.dist_dir)
        }
    };

    debug!(path = %path.display(), "loading configuration");
    let config = Configuration::load(&path)?;
    info!(
        version = %config.version,
        bundles = config.bundles.len(),
        files = config.managed_file_count(),
        "configuration loaded"
    );
    Ok(config)
}

/// `config.json` at the package root, falling back to `dist/config.json`.
fn config_path(package_dir: &Path, dist_dir: &Path) -> PathBuf {
    let at_root = package_dir.join(CONFIG_FILE);
    if at_root.is_file() {
        at_root
    } else {
        dist_dir.join(CONFIG_FILE)
    }
}

/// Newer release of the tool, if the registry has one.
///
/// Any failure is logged and treated as "no update".
pub async fn check_for_update(client: &RegistryClient, current: &Version) -> Option<Version> {
    match client.latest_version(SELF_PACKAGE).await {
        Ok(latest) if latest.is_newer_than(current) => Some(latest),
        Ok(latest) => {
            debug!(%latest, %current, "no newer release");
            None
        }
        Err(e) => {
            debug!("update check failed: {e}");
            None
        }
    }
}

/// Delete the working directory (`.cache`). Returns the bytes freed.
pub fn remove_cache(root: &InstallRoot) -> io::Result<u64> {
    let dir = root.cache_dir();
    if !dir.exists() {
        return Ok(0);
    }

    let size = WalkDir::new(&dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|entry| entry.metadata().ok())
        .filter(std::fs::Metadata::is_file)
        .map(|meta| meta.len())
        .sum();

    std::fs::remove_dir_all(&dir)?;
    info!(path = %dir.display(), bytes = size, "removed cache");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths;
    use crate::registry::{FetchedBundle, RegistryError, RegistryOptions};
    use async_trait::async_trait;
    use mockito::Server;

    const CONFIG: &str = r#"{
        "version": "3",
        "bundles": [
            {
                "name": "skinpack-01",
                "targets": ["main", "mainta"],
                "pak3ts": [{ "name": "zzz-skins.pk3", "hash": "5eb63bbbe01eeed093cb22bb8f5acdc3" }]
            }
        ]
    }"#;

    /// Writes a configuration package with the document at `at`.
    struct ConfigFetcher {
        at: Option<&'static str>,
    }

    #[async_trait]
    impl PackageFetcher for ConfigFetcher {
        async fn fetch(&self, package: &str, cache_dir: &Path) -> Result<FetchedBundle, FetchError> {
            let Some(at) = self.at else {
                return Err(FetchError::RegistryUnreachable {
                    package: package.to_string(),
                    source: RegistryError::Status {
                        url: "https://registry.test".to_string(),
                        status: 503,
                    },
                });
            };
            let package_dir = paths::package_dir(cache_dir, package);
            let file = package_dir.join(at);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, CONFIG).unwrap();
            Ok(FetchedBundle {
                name: package.to_string(),
                version: Version::from("3.0.0"),
                dist_dir: paths::dist_dir(&package_dir),
                package_dir,
            })
        }
    }

    fn root() -> (tempfile::TempDir, InstallRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallRoot::new(dir.path());
        (dir, root)
    }

    #[test]
    fn configuration_package_is_not_a_valid_bundle_name() {
        assert!(luk3_schema::RESERVED_BUNDLE_NAMES.contains(&CONFIG_PACKAGE));
    }

    #[test]
    fn marker_required_unless_forced() {
        let (dir, root) = root();
        assert!(matches!(
            check_marker(&root, false),
            Err(SetupError::MissingMarker { .. })
        ));
        assert!(check_marker(&root, true).is_ok());

        std::fs::write(dir.path().join("MOHAA.exe"), b"").unwrap();
        assert!(check_marker(&root, false).is_ok());
    }

    #[test]
    fn explicit_token_wins_over_file() {
        let (dir, root) = root();
        std::fs::write(dir.path().join("LUK3_TOK3N"), "from-file").unwrap();
        assert_eq!(read_token(&root, Some(" explicit ")).unwrap(), "explicit");
    }

    #[test]
    fn token_file_is_trimmed() {
        let (dir, root) = root();
        std::fs::write(dir.path().join("LUK3_TOK3N"), "ghp_abc\n").unwrap();
        assert_eq!(read_token(&root, None).unwrap(), "ghp_abc");
        assert_eq!(read_token(&root, Some("  ")).unwrap(), "ghp_abc");
    }

    #[test]
    fn missing_or_empty_token_is_an_error() {
        let (dir, root) = root();
        assert!(matches!(
            read_token(&root, None),
            Err(SetupError::MissingCredential { source: None, .. })
        ));

        std::fs::write(dir.path().join("LUK3_TOK3N"), "\n").unwrap();
        assert!(matches!(
            read_token(&root, None),
            Err(SetupError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn configuration_from_package_root() {
        let (_dir, root) = root();
        let fetcher = ConfigFetcher {
            at: Some("config.json"),
        };
        let config = load_configuration(&ConfigSource::Registry, &fetcher, &root)
            .await
            .unwrap();
        assert_eq!(config.bundles[0].name, "skinpack-01");
    }

    #[tokio::test]
    async fn configuration_from_dist() {
        let (_dir, root) = root();
        let fetcher = ConfigFetcher {
            at: Some("dist/config.json"),
        };
        let config = load_configuration(&ConfigSource::Registry, &fetcher, &root)
            .await
            .unwrap();
        assert_eq!(config.version, "3");
    }

    #[tokio::test]
    async fn configuration_from_local_file_skips_registry() {
        let (dir, root) = root();
        let path = dir.path().join("local.json");
        std::fs::write(&path, CONFIG).unwrap();

        let fetcher = ConfigFetcher { at: None };
        let config = load_configuration(&ConfigSource::File(path), &fetcher, &root)
            .await
            .unwrap();
        assert_eq!(config.managed_file_count(), 2);
    }

    #[tokio::test]
    async fn unreachable_configuration_is_fatal() {
        let (_dir, root) = root();
        let fetcher = ConfigFetcher { at: None };
        let err = load_configuration(&ConfigSource::Registry, &fetcher, &root)
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::ConfigUnreachable(_)));
    }

    #[tokio::test]
    async fn package_without_document_is_a_manifest_error() {
        let (_dir, root) = root();
        let fetcher = ConfigFetcher {
            at: Some("README.md"),
        };
        let err = load_configuration(&ConfigSource::Registry, &fetcher, &root)
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::Manifest(ManifestParseError::Io { .. })));
    }

    #[tokio::test]
    async fn update_check_compares_semver() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/@a4t1%2fluk3")
            .with_status(200)
            .with_body(r#"{ "name": "@a4t1/luk3", "dist-tags": { "latest": "0.10.0" } }"#)
            .create_async()
            .await;

        let client = RegistryClient::new(RegistryOptions {
            registry: server.url(),
            ..RegistryOptions::default()
        })
        .unwrap();

        assert_eq!(
            check_for_update(&client, &Version::from("0.9.1")).await,
            Some(Version::from("0.10.0"))
        );
        assert_eq!(check_for_update(&client, &Version::from("0.10.0")).await, None);
    }

    #[tokio::test]
    async fn failed_update_check_is_silent() {
        let client = RegistryClient::new(RegistryOptions {
            registry: "http://127.0.0.1:1".to_string(),
            ..RegistryOptions::default()
        })
        .unwrap();
        assert_eq!(check_for_update(&client, &Version::from("0.1.0")).await, None);
    }

    #[test]
    fn remove_cache_reports_freed_bytes() {
        let (dir, root) = root();
        assert_eq!(remove_cache(&root).unwrap(), 0);

        let nested = dir.path().join(".cache/skinpack-01/dist");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("a.pk3"), b"12345").unwrap();
        std::fs::write(dir.path().join(".cache/x.json"), b"123").unwrap();

        assert_eq!(remove_cache(&root).unwrap(), 8);
        assert!(!dir.path().join(".cache").exists());
    }
}
