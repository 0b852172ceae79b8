//! Shared types for luk3.
//!
//! The configuration document published alongside the game content describes
//! which bundles exist, which target directories each bundle is installed
//! into, and the MD5 digest every installed package file must have. This crate
//! turns that untrusted JSON into a validated [`Configuration`].

/// MD5 digest type and parsing.
pub mod hash;
pub mod manifest;
/// Validated name and version newtypes.
pub mod types;

// Re-exports
pub use hash::{DigestError, Md5Digest};
pub use manifest::{Bundle, Configuration, ManifestParseError, PackageFile, RESERVED_BUNDLE_NAMES};
pub use types::{BundleName, TargetName, Version};
