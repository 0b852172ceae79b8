use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use luk3_schema::Version;
use reqwest::{Client, header};
use tracing::{debug, info, warn};

use super::cache::{TransferCache, encode_package};
use super::packument::{Packument, ResolvedPackage};
use super::{FetchError, FetchedBundle, PackageFetcher, RegistryError, RegistryOptions};
use crate::io::{DownloadError, DownloadRequest, ExtractError, replace_with_tgz};
use crate::paths::{dist_dir, package_dir, transfer_cache_dir};

const PACKUMENT_ACCEPT: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

/// How long a cached packument is served without asking the registry.
const PACKUMENT_FRESHNESS: Duration = Duration::from_secs(300);

/// Client for an npm-protocol package registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    options: RegistryOptions,
}

impl RegistryClient {
    /// Build a client with its own connection pool.
    pub fn new(options: RegistryOptions) -> Result<Self, RegistryError> {
        let http = Client::builder()
            .user_agent(crate::USER_AGENT)
            .tcp_nodelay(true)
            .build()?;
        Ok(Self::with_client(http, options))
    }

    /// Reuse an existing HTTP client.
    pub fn with_client(http: Client, options: RegistryOptions) -> Self {
        Self { http, options }
    }

    /// `skinpack-01` -> `@a4t1/skinpack-01`. Already scoped names are kept.
    pub fn qualified_name(&self, package: &str) -> String {
        match &self.options.scope {
            Some(scope) if !package.starts_with('@') => {
                format!("{}/{package}", scope.trim_end_matches('/'))
            }
            _ => package.to_string(),
        }
    }

    fn packument_url(&self, qualified: &str) -> String {
        format!(
            "{}/{}",
            self.options.registry.trim_end_matches('/'),
            encode_package(qualified)
        )
    }

    /// Whether the token may be sent to `url`. Tarballs can be served from
    /// a different host than the registry.
    fn is_registry_url(&self, url: &str) -> bool {
        match (
            reqwest::Url::parse(&self.options.registry),
            reqwest::Url::parse(url),
        ) {
            (Ok(registry), Ok(url)) => registry.origin() == url.origin(),
            _ => false,
        }
    }

    /// GET the package document from the registry, bypassing the cache.
    pub async fn fetch_packument(&self, qualified: &str) -> Result<Packument, RegistryError> {
        let url = self.packument_url(qualified);
        debug!(%url, "fetching packument");

        let mut request = self
            .http
            .get(&url)
            .header(header::ACCEPT, PACKUMENT_ACCEPT);
        if let Some(token) = &self.options.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| RegistryError::Json { url, source })
    }

    /// Package document, going through the transfer cache.
    ///
    /// With `prefer_offline`, a recently cached document is used as-is. If
    /// the registry cannot be reached, any cached document is used instead.
    pub async fn packument(
        &self,
        qualified: &str,
        cache: &TransferCache,
    ) -> Result<Packument, RegistryError> {
        let fresh = if self.options.prefer_offline {
            cache
                .load_packument(qualified, Some(PACKUMENT_FRESHNESS))
                .await
        } else {
            None
        };
        if let Some(packument) = fresh {
            debug!(package = qualified, "using cached packument");
            return Ok(packument);
        }

        match self.fetch_packument(qualified).await {
            Ok(packument) => {
                if let Err(e) = cache.store_packument(&packument).await {
                    warn!(package = qualified, "failed to cache packument: {e}");
                }
                Ok(packument)
            }
            Err(e) if e.is_offline() => match cache.load_packument(qualified, None).await {
                Some(packument) => {
                    warn!(package = qualified, "registry unreachable ({e}), using cached packument");
                    Ok(packument)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Resolve the configured tag of `qualified` to a tarball.
    pub async fn resolve(
        &self,
        qualified: &str,
        cache: &TransferCache,
    ) -> Result<ResolvedPackage, RegistryError> {
        self.packument(qualified, cache)
            .await?
            .resolve(&self.options.tag)
    }

    /// The version the configured tag of `package` points at, straight from
    /// the registry.
    pub async fn latest_version(&self, package: &str) -> Result<Version, RegistryError> {
        let qualified = self.qualified_name(package);
        self.fetch_packument(&qualified)
            .await?
            .tagged_version(&self.options.tag)
    }

    /// Put the tarball of `resolved` into the transfer cache.
    ///
    /// Returns its path and whether it is content-addressed (and thus kept).
    async fn download(
        &self,
        resolved: &ResolvedPackage,
        cache: &TransferCache,
    ) -> Result<(PathBuf, bool), DownloadError> {
        cache.prepare_content_dir().await?;

        let token = self
            .options
            .token
            .as_deref()
            .filter(|_| self.is_registry_url(&resolved.tarball));

        let Some(integrity) = &resolved.integrity else {
            warn!(
                package = %resolved.name,
                version = %resolved.version,
                "no sha512 integrity published, tarball is not verified"
            );
            let dest = cache.unverified_tarball_path(&resolved.name, resolved.version.as_str());
            DownloadRequest::new(&self.http, &resolved.tarball, &dest)
                .with_token(token)
                .execute()
                .await?;
            return Ok((dest, false));
        };

        if let Some(path) = cache.cached_tarball(integrity).await {
            debug!(package = %resolved.name, path = %path.display(), "using cached tarball");
            return Ok((path, true));
        }

        let dest = cache.tarball_path(integrity);
        DownloadRequest::new(&self.http, &resolved.tarball, &dest)
            .with_token(token)
            .with_integrity(Some(integrity))
            .execute()
            .await?;
        Ok((dest, true))
    }
}

fn download_failure(package: &str, error: DownloadError) -> FetchError {
    let package = package.to_string();
    match error {
        DownloadError::Http(e) => FetchError::RegistryUnreachable {
            package,
            source: RegistryError::Http(e),
        },
        DownloadError::Io(e) => FetchError::ExtractionFailed {
            package,
            source: ExtractError::Io(e),
        },
        DownloadError::HashMismatch { expected, actual } => FetchError::ExtractionFailed {
            package,
            source: ExtractError::Integrity { expected, actual },
        },
    }
}

#[async_trait]
impl PackageFetcher for RegistryClient {
    async fn fetch(&self, package: &str, cache_dir: &Path) -> Result<FetchedBundle, FetchError> {
        let qualified = self.qualified_name(package);
        let cache = TransferCache::new(transfer_cache_dir(cache_dir));

        let resolved = self.resolve(&qualified, &cache).await.map_err(|source| {
            FetchError::RegistryUnreachable {
                package: package.to_string(),
                source,
            }
        })?;
        info!(package = %qualified, version = %resolved.version, "resolved");

        let (archive, keep) = self
            .download(&resolved, &cache)
            .await
            .map_err(|e| download_failure(package, e))?;

        let package_dir = package_dir(cache_dir, package);
        let extracted = {
            let archive = archive.clone();
            let package_dir = package_dir.clone();
            tokio::task::spawn_blocking(move || replace_with_tgz(&archive, &package_dir))
                .await
                .map_err(|e| ExtractError::Archive(format!("Extraction task failed: {e}")))
                .and_then(|result| result)
        };

        if !keep {
            tokio::fs::remove_file(&archive).await.ok();
        }

        extracted.map_err(|source| FetchError::ExtractionFailed {
            package: package.to_string(),
            source,
        })?;

        Ok(FetchedBundle {
            name: package.to_string(),
            version: resolved.version,
            dist_dir: dist_dir(&package_dir),
            package_dir,
        })
    }
}
