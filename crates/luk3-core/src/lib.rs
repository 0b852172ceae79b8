//! Core library for luk3.
//!
//! Keeps the package files of a game installation in sync with a remote
//! configuration document. The pipeline for each bundle is:
//!
//! ```text
//! Configuration ──> plan (verify digests on disk) ──> fetch (registry, once per bundle)
//!                                                        │
//!                                                        ▼
//!                                        install (copy dist/<file> into each target)
//! ```
//!
//! Failures are scoped: a bundle that cannot be fetched is reported and the
//! next bundle still runs; a file that cannot be installed is reported and the
//! rest of its bundle still installs. See [`sync::Synchronizer`].

pub mod install;
pub mod io;
pub mod paths;
pub mod plan;
pub mod registry;
pub mod reporter;
pub mod setup;
pub mod sync;
pub mod verify;

pub use paths::InstallRoot;
pub use plan::{InstallTask, PlanReason};
pub use registry::{FetchError, FetchedBundle, PackageFetcher, RegistryClient, RegistryOptions};
pub use reporter::{NullReporter, Reporter};
pub use sync::{BundleOutcome, BundleReport, ExitPolicy, SyncReport, Synchronizer};
pub use verify::Verification;

/// User Agent string for registry requests
pub const USER_AGENT: &str = concat!("luk3-core/", env!("CARGO_PKG_VERSION"));
