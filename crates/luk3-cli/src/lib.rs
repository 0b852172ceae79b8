//! luk3 - keeps a game installation's package files in sync
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Reads the published configuration, checks every managed package file
//! against its MD5 digest and pulls replacements for missing or outdated
//! files from the registry.
//!
//! # Directory Layout
//!
//! ```text
//! <installation>/
//! ├── MOHAA.exe       # marker, required unless --force
//! ├── LUK3_TOK3N      # registry token, unless --token is given
//! ├── main/ mainta/ maintt/
//! └── .cache/         # working directory, removed by `luk3 clean`
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use luk3_core::registry::{DEFAULT_REGISTRY, DEFAULT_SCOPE};

/// Version reported by `--version` and compared by the update notice.
pub const VERSION: &str = env!("LUK3_VERSION");

#[derive(Debug, Parser)]
#[command(name = "luk3")]
#[command(author, version = VERSION, about = "luk3 - keeps game package files in sync")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // Running without a subcommand bootstraps.
    #[command(flatten)]
    pub bootstrap: BootstrapArgs,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Verify every managed file and install what is missing or outdated (default)
    Bootstrap(BootstrapArgs),
    /// Remove the working directory (.cache) of an installation
    Clean {
        /// Installation directory
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct BootstrapArgs {
    /// Installation directory
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Registry token (defaults to the contents of LUK3_TOK3N in the installation)
    #[arg(short, long, env = "LUK3_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Run even if the installation marker (MOHAA.exe) is missing
    #[arg(short, long)]
    pub force: bool,

    /// Read the configuration from a local JSON file instead of the registry
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Registry base URL
    #[arg(long, env = "LUK3_REGISTRY", default_value = DEFAULT_REGISTRY)]
    pub registry: String,

    /// Scope of the published packages
    #[arg(long, env = "LUK3_SCOPE", default_value = DEFAULT_SCOPE)]
    pub scope: String,

    /// Always ask the registry instead of using recently cached package documents
    #[arg(long)]
    pub online: bool,

    /// Exit with a failure code if any bundle or file could not be synced
    #[arg(long)]
    pub strict: bool,

    /// Only report what would be installed
    #[arg(long)]
    pub dry_run: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pub pause: bool,
}
