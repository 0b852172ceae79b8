//! Package tarball extraction.
//!
//! Registry tarballs are gzip-compressed tar archives whose entries live
//! under a single top-level directory (`package/`). That directory is
//! stripped, so `package/dist/a.pk3` lands at `<dest>/dist/a.pk3`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
/// Failure while unpacking a package tarball.
pub enum ExtractError {
    /// Reading the archive or writing its contents failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive is malformed or contains an unsafe path.
    #[error("Archive error: {0}")]
    Archive(String),

    /// The tarball bytes do not match the published integrity.
    #[error("Integrity mismatch: expected {expected}, got {actual}")]
    Integrity {
        /// Published integrity.
        expected: String,
        /// Integrity of the bytes that were received.
        actual: String,
    },
}

/// Replace `dest` with the contents of the tarball at `archive_path`.
///
/// The archive is unpacked into a staging directory next to `dest` and only
/// swapped in once every entry was written; on failure `dest` is untouched.
/// Returns the number of files written.
pub fn replace_with_tgz(archive_path: &Path, dest: &Path) -> Result<usize, ExtractError> {
    let parent = dest
        .parent()
        .ok_or_else(|| ExtractError::Archive(format!("No parent for {}", dest.display())))?;
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".luk3-extract-")
        .tempdir_in(parent)?;

    let count = extract_tgz(archive_path, staging.path())?;

    fs::remove_dir_all(dest).or_else(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Ok(())
        } else {
            Err(e)
        }
    })?;
    fs::rename(staging.path(), dest)?;

    debug!(archive = %archive_path.display(), dest = %dest.display(), files = count, "extracted");
    Ok(count)
}

/// Extract a `.tgz` archive into `dest_dir`, stripping the first path component.
pub fn extract_tgz(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive_path)?;
    let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
    extract_tar(decoder, dest_dir)
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<usize, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut count = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        let entry_type = entry.header().entry_type();

        let Some(relative_path) = strip_first_component(&entry_path)? else {
            continue;
        };

        if entry_type.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        if !entry_type.is_file() {
            warn!(entry = %entry_path.display(), "skipping non-regular archive entry");
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&absolute_path)?;
        io::copy(&mut entry, &mut out)?;
        count += 1;
    }

    Ok(count)
}

/// Drop the top-level directory of an archive path.
///
/// Returns `None` for the top-level entry itself and an error for any path
/// that could escape the destination.
fn strip_first_component(path: &Path) -> Result<Option<PathBuf>, ExtractError> {
    let mut stripped = PathBuf::new();
    let mut first = true;

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if first {
                    first = false;
                } else {
                    stripped.push(part);
                }
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::Archive(format!(
                    "Invalid path in archive: {}",
                    path.display()
                )));
            }
        }
    }

    Ok((!stripped.as_os_str().is_empty()).then_some(stripped))
}
