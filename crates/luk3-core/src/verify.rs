//! Integrity verification of installed package files.
//!
//! Digests are computed by streaming the file through MD5; the file is only
//! ever read.

use std::io;
use std::path::{Path, PathBuf};

use luk3_schema::Md5Digest;
use md5::{Digest, Md5};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const READ_BUFFER: usize = 64 * 1024;

/// Result of comparing a file on disk with its expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The file exists and its digest matches.
    Verified,
    /// The file exists but its digest differs.
    Mismatched {
        /// Digest actually found on disk.
        actual: Md5Digest,
    },
    /// No file exists at the path.
    Absent,
}

/// Hashing failed for a reason other than the file being absent.
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// The file exists (or may exist) but could not be read.
    #[error("Failed to check integrity of {}: {source}", .path.display())]
    CheckFailed {
        /// File that was being hashed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Compute the MD5 digest of a file.
pub async fn file_digest(path: &Path) -> io::Result<Md5Digest> {
    let mut file = File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_BUFFER];

    loop {
        let count = file.read(&mut buffer).await?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(Md5Digest::from_bytes(&hasher.finalize()))
}

/// Compare the file at `path` with `expected`.
///
/// A missing file is [`Verification::Absent`]; any other I/O failure (a
/// directory in the way, permissions) is an [`IntegrityError`].
pub async fn verify(path: &Path, expected: &Md5Digest) -> Result<Verification, IntegrityError> {
    match file_digest(path).await {
        Ok(actual) if &actual == expected => Ok(Verification::Verified),
        Ok(actual) => Ok(Verification::Mismatched { actual }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Verification::Absent),
        Err(source) => Err(IntegrityError::CheckFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}
