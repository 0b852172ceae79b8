//! Update planning.
//!
//! Cross-references every target of a bundle with every package file it
//! ships and keeps the pairs whose installed copy is absent or stale.

use std::path::PathBuf;

use luk3_schema::{Bundle, TargetName};
use tracing::debug;

use crate::paths::InstallRoot;
use crate::verify::{IntegrityError, Verification, verify};

/// Why a file was scheduled for installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanReason {
    /// No file exists at the destination.
    Missing,
    /// A file exists but its digest differs from the expected one.
    Outdated,
}

/// A `(target, file)` pair that has to be installed or replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTask {
    /// Target the file belongs to.
    pub target: TargetName,
    /// `<root>/<target>`
    pub target_dir: PathBuf,
    /// Package file name, both in the archive's `dist/` and in the target.
    pub file_name: String,
    /// Why the task exists.
    pub reason: PlanReason,
}

impl InstallTask {
    /// Where the file ends up.
    pub fn destination(&self) -> PathBuf {
        self.target_dir.join(&self.file_name)
    }

    /// `<target>/<file>`, for messages.
    pub fn display_path(&self) -> String {
        format!("{}/{}", self.target, self.file_name)
    }
}

/// Build the install tasks for `bundle`.
///
/// Output is target-major, file-minor, both in configuration order. An empty
/// plan means every installed copy already verifies.
pub async fn plan(bundle: &Bundle, root: &InstallRoot) -> Result<Vec<InstallTask>, IntegrityError> {
    let mut tasks = Vec::new();

    for target in &bundle.targets {
        let target_dir = root.target_dir(target);

        for pak3t in &bundle.pak3ts {
            let candidate = target_dir.join(&pak3t.name);

            let reason = match verify(&candidate, &pak3t.hash).await? {
                Verification::Verified => {
                    debug!(bundle = %bundle.name, file = %candidate.display(), "up to date");
                    continue;
                }
                Verification::Absent => PlanReason::Missing,
                Verification::Mismatched { actual } => {
                    debug!(
                        bundle = %bundle.name,
                        file = %candidate.display(),
                        expected = %pak3t.hash,
                        %actual,
                        "digest mismatch"
                    );
                    PlanReason::Outdated
                }
            };

            tasks.push(InstallTask {
                target: target.clone(),
                target_dir: target_dir.clone(),
                file_name: pak3t.name.clone(),
                reason,
            });
        }
    }

    Ok(tasks)
}
