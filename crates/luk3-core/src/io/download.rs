//! Streaming download with SHA-512 verification.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha512};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::registry::Integrity;

#[derive(Error, Debug)]
/// Failure while transferring an artifact.
pub enum DownloadError {
    /// Transport failure or an error status from the server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the artifact to disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded bytes do not match the published integrity.
    #[error("Integrity mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Published integrity.
        expected: String,
        /// Integrity of the received bytes.
        actual: String,
    },
}

/// Request for a download operation
#[derive(Debug)]
pub struct DownloadRequest<'a> {
    /// HTTP client to use.
    pub client: &'a Client,
    /// Artifact URL.
    pub url: &'a str,
    /// Final location of the artifact.
    pub dest: &'a Path,
    /// Bearer token sent with the request, if any.
    pub token: Option<&'a str>,
    /// Expected integrity; `None` skips verification.
    pub expected: Option<&'a Integrity>,
}

impl<'a> DownloadRequest<'a> {
    /// Create a request without credentials or verification.
    pub fn new(client: &'a Client, url: &'a str, dest: &'a Path) -> Self {
        Self {
            client,
            url,
            dest,
            token: None,
            expected: None,
        }
    }

    /// Authenticate the request with a bearer token.
    pub fn with_token(mut self, token: Option<&'a str>) -> Self {
        self.token = token;
        self
    }

    /// Verify the downloaded bytes against `expected`.
    pub fn with_integrity(mut self, expected: Option<&'a Integrity>) -> Self {
        self.expected = expected;
        self
    }

    /// Execute the download.
    ///
    /// Bytes are streamed into `<dest>.partial` while being hashed; the file
    /// is renamed into place only once the digest has been checked, so `dest`
    /// never holds a truncated or corrupt artifact.
    pub async fn execute(self) -> Result<Integrity, DownloadError> {
        let mut request = self
            .client
            .get(self.url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT);
        if let Some(token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;

        let partial = partial_path(self.dest);
        let mut file = File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha512::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    tokio::fs::remove_file(&partial).await.ok();
                    return Err(e.into());
                }
            };
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
        }

        file.flush().await?;
        drop(file);

        let actual = Integrity::from_sha512(&hasher.finalize());

        if let Some(expected) = self.expected.filter(|expected| **expected != actual) {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(DownloadError::HashMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        tokio::fs::rename(&partial, self.dest).await?;
        Ok(actual)
    }
}

/// Compute the SHA-512 integrity of a file already on disk.
pub async fn file_integrity(path: &Path) -> std::io::Result<Integrity> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha512::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let count = file.read(&mut buffer).await?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(Integrity::from_sha512(&hasher.finalize()))
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn downloads_and_reports_integrity() {
        let mut server = Server::new_async().await;
        let body = b"tarball bytes".to_vec();
        let _m = server
            .mock("GET", "/a.tgz")
            .match_header("authorization", "Bearer s3cret")
            .with_status(200)
            .with_body(&body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.tgz");
        let url = format!("{}/a.tgz", server.url());
        let expected = Integrity::from_sha512(&Sha512::digest(&body));

        let client = Client::new();
        let actual = DownloadRequest::new(&client, &url, &dest)
            .with_token(Some("s3cret"))
            .with_integrity(Some(&expected))
            .execute()
            .await
            .unwrap();

        assert_eq!(actual, expected);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(file_integrity(&dest).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn integrity_mismatch_leaves_nothing_behind() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/a.tgz")
            .with_status(200)
            .with_body("tampered")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.tgz");
        let url = format!("{}/a.tgz", server.url());
        let expected = Integrity::from_sha512(&Sha512::digest(b"original"));

        let client = Client::new();
        let err = DownloadRequest::new(&client, &url, &dest)
            .with_integrity(Some(&expected))
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::HashMismatch { .. }));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn error_status_is_http_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/a.tgz")
            .with_status(401)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.tgz");
        let url = format!("{}/a.tgz", server.url());

        let client = Client::new();
        let err = DownloadRequest::new(&client, &url, &dest)
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Http(_)));
        assert!(!dest.exists());
    }
}
