//! Collaborator abstraction
//!
//! The orchestrator never runs a tool itself; it asks a [`Toolchain`]. The
//! Debian implementation shells out to `dch`, `dpkg-buildpackage`, `dput` and
//! `wget`; tests substitute a recording double.

use crate::core::error::UploadError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How `copy_tree` treats an existing destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Copy into the destination, overwriting files with the same name
    Merge,
    /// Remove the destination first so no stale file survives
    Replace,
}

/// Changelog entry appended before each build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// Target distribution codename (`dch -D`)
    pub distribution: String,
    /// Full Debian version (`dch -v`)
    pub version: String,
    pub message: String,
}

/// External tools used by an upload cycle
///
/// Every method blocks the workflow until the tool finishes. Failures of
/// `append_changelog`, `build_source_package` and `upload` are errors;
/// `fetch` reports "not available yet" as `Ok(false)`.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Tool name for logs
    fn name(&self) -> &str;

    /// Recursively copy `from` to `to`, preserving file metadata
    async fn copy_tree(&self, from: &Path, to: &Path, mode: CopyMode) -> Result<(), UploadError>;

    /// Append a changelog entry to `<staging>/debian/changelog`
    async fn append_changelog(
        &self,
        staging: &Path,
        entry: &ChangelogEntry,
    ) -> Result<(), UploadError>;

    /// Build a signed source-only package; the `.changes` lands in the parent directory
    async fn build_source_package(
        &self,
        staging: &Path,
        signing_key: &str,
    ) -> Result<(), UploadError>;

    /// Upload a `.changes` file to the named target
    async fn upload(&self, staging: &Path, target: &str, changes: &Path)
    -> Result<(), UploadError>;

    /// Try to download `url`; `Ok(true)` once it is available
    async fn fetch(&self, staging: &Path, url: &str) -> Result<bool, UploadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changelog_entry_serialization() {
        let entry = ChangelogEntry {
            distribution: "gutsy".to_string(),
            version: "20081015-0amarok2".to_string(),
            message: "Nightly Build".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"version\":\"20081015-0amarok2\""));

        let back: ChangelogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_copy_mode_serialization() {
        assert_eq!(serde_json::to_string(&CopyMode::Replace).unwrap(), r#""replace""#);
    }
}
