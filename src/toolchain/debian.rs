//! Debian/Launchpad toolchain: devscripts, dpkg-dev and dput
//!
//! Every tool runs through [`SafeCommandExecutor`] with the staging
//! directory as working directory, so the process-wide current directory is
//! never changed.

use crate::core::config::{FetcherKind, UploadConfig};
use crate::core::error::UploadError;
use crate::core::traits::{ChangelogEntry, CopyMode, Toolchain};
use crate::security::{CommandError, SafeCommandExecutor};
use crate::toolchain::fs_copy;
use crate::toolchain::http_probe::HttpProbe;
use async_trait::async_trait;
use log::debug;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

/// Toolchain backed by the real Debian packaging tools
pub struct DebianToolchain {
    timeout: Option<Duration>,
    fetcher: FetcherKind,
    http: HttpProbe,
}

impl DebianToolchain {
    pub fn new(fetcher: FetcherKind, timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            fetcher,
            http: HttpProbe::new(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.fetcher, config.command_timeout())
    }

    fn executor(&self, staging: &Path) -> Result<SafeCommandExecutor, UploadError> {
        let mut executor = SafeCommandExecutor::new(staging)?;
        executor.set_timeout(self.timeout);
        Ok(executor)
    }
}

/// `dch -D <distribution> -v <version> <message>`
pub fn changelog_args(entry: &ChangelogEntry) -> Vec<String> {
    vec![
        "-D".to_string(),
        entry.distribution.clone(),
        "-v".to_string(),
        entry.version.clone(),
        entry.message.clone(),
    ]
}

/// `dpkg-buildpackage -S -sa -rfakeroot -k<key>`
pub fn build_args(signing_key: &str) -> Vec<String> {
    vec![
        "-S".to_string(),
        "-sa".to_string(),
        "-rfakeroot".to_string(),
        format!("-k{}", signing_key),
    ]
}

/// `dput <target> <changes>`
pub fn upload_args(target: &str, changes: &Path) -> Vec<String> {
    vec![target.to_string(), changes.display().to_string()]
}

/// Interpret a `wget` run: a download that fails or hangs past the
/// command timeout is "not yet available"; a `wget` that cannot start is an error.
pub fn fetch_outcome(result: Result<Output, CommandError>) -> Result<bool, UploadError> {
    match result {
        Ok(output) => Ok(output.status.success()),
        Err(CommandError::Timeout(timeout)) => {
            debug!("wget gave no answer within {:?}", timeout);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

#[async_trait]
impl Toolchain for DebianToolchain {
    fn name(&self) -> &str {
        "debian"
    }

    async fn copy_tree(&self, from: &Path, to: &Path, mode: CopyMode) -> Result<(), UploadError> {
        let (from, to) = (from.to_path_buf(), to.to_path_buf());
        let stats = tokio::task::spawn_blocking(move || fs_copy::copy_tree(&from, &to, mode))
            .await
            .map_err(|e| UploadError::io("<copy task>", std::io::Error::other(e)))??;
        debug!(
            "copied {} files, {} directories, {} symlinks",
            stats.files, stats.dirs, stats.symlinks
        );
        Ok(())
    }

    async fn append_changelog(
        &self,
        staging: &Path,
        entry: &ChangelogEntry,
    ) -> Result<(), UploadError> {
        let args = changelog_args(entry);
        self.executor(staging)?
            .run_checked("dch", &as_strs(&args))
            .await?;
        Ok(())
    }

    async fn build_source_package(
        &self,
        staging: &Path,
        signing_key: &str,
    ) -> Result<(), UploadError> {
        let args = build_args(signing_key);
        self.executor(staging)?
            .run_checked("dpkg-buildpackage", &as_strs(&args))
            .await?;
        Ok(())
    }

    async fn upload(
        &self,
        staging: &Path,
        target: &str,
        changes: &Path,
    ) -> Result<(), UploadError> {
        let args = upload_args(target, changes);
        self.executor(staging)?
            .run_checked("dput", &as_strs(&args))
            .await?;
        Ok(())
    }

    async fn fetch(&self, staging: &Path, url: &str) -> Result<bool, UploadError> {
        match self.fetcher {
            FetcherKind::Wget => {
                let result = self.executor(staging)?.execute("wget", &[url]).await;
                fetch_outcome(result)
            }
            FetcherKind::Http => Ok(self.http.is_available(url).await),
        }
    }
}
