//! IO modules - side effects against the network and the filesystem.

pub mod download;
pub mod extract;

pub use download::{DownloadError, DownloadRequest, file_integrity};
pub use extract::{ExtractError, extract_tgz, replace_with_tgz};
