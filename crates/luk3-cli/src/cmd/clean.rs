//! Clean command

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use luk3_core::setup::remove_cache;
use luk3_core::{InstallRoot, Reporter};

use crate::ui::ConsoleReporter;
use crate::ui::theme::format_size;

/// Remove the `.cache` working directory of the installation at `path`.
pub fn clean(path: &Path) -> Result<ExitCode> {
    let output = ConsoleReporter::new();
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let root = InstallRoot::resolve(path, &cwd);

    let freed = remove_cache(&root)
        .with_context(|| format!("Failed to remove {}", root.cache_dir().display()))?;

    if freed == 0 {
        output.info("Nothing to clean.");
    } else {
        output.success(&format!("Removed cache ({} freed)", format_size(freed)));
    }
    Ok(ExitCode::SUCCESS)
}
