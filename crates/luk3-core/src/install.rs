//! Installation of package files from an extracted bundle.
//!
//! Files are copied into a hidden sibling first and renamed over the
//! destination, so a failed copy never leaves a truncated package file behind.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::plan::InstallTask;

/// A single task could not be completed. Scoped to one file.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The extracted archive does not contain the file the configuration names.
    #[error("{file} not found in downloaded archive ({})", .archive_path.display())]
    NotFoundInArchive {
        /// Package file name.
        file: String,
        /// Where the file was expected inside the extraction.
        archive_path: PathBuf,
    },

    /// Copying into the target failed.
    #[error("Failed to install {file} to {}: {source}", .destination.display())]
    CopyFailed {
        /// Package file name.
        file: String,
        /// Destination that could not be written.
        destination: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Copy `dist_dir/<file>` to the task's destination, replacing any existing file.
///
/// The target directory must already exist.
pub async fn install(task: &InstallTask, dist_dir: &Path) -> Result<(), TaskError> {
    let archive_path = dist_dir.join(&task.file_name);
    let destination = task.destination();

    let is_file = match tokio::fs::metadata(&archive_path).await {
        Ok(meta) => meta.is_file(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(source) => {
            return Err(TaskError::CopyFailed {
                file: task.file_name.clone(),
                destination,
                source,
            });
        }
    };
    if !is_file {
        return Err(TaskError::NotFoundInArchive {
            file: task.file_name.clone(),
            archive_path,
        });
    }

    let staging = task
        .target_dir
        .join(format!(".{}.partial", task.file_name));

    let result = async {
        tokio::fs::copy(&archive_path, &staging).await?;
        tokio::fs::rename(&staging, &destination).await
    }
    .await;

    if let Err(source) = result {
        tokio::fs::remove_file(&staging).await.ok();
        return Err(TaskError::CopyFailed {
            file: task.file_name.clone(),
            destination,
            source,
        });
    }

    debug!(
        from = %archive_path.display(),
        to = %destination.display(),
        "installed"
    );
    Ok(())
}
