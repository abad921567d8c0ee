//! Configuration structures for nightly uploads
//!
//! Every constant of the upload workflow (product name, PPA, signing key,
//! package list, poll interval) lives here so the orchestrator only consumes
//! data. Defaults reproduce the Amarok nightly PPA setup.

use crate::core::error::UploadError;
use crate::security::Identity;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

lazy_static! {
    /// Debian source package names: lowercase alphanumerics plus `+`, `-` and `.`
    static ref PACKAGE_NAME: Regex = Regex::new(r"^[a-z0-9][a-z0-9+.-]*$").unwrap();
}

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Product name, used as prefix for every package and version
    pub product: String,

    /// Distro whose packaging metadata is used (names the run directory)
    pub distro: String,

    /// Target distribution codename written into the changelog
    pub distribution: String,

    /// Key id or uid passed to `dpkg-buildpackage -k`
    pub signing_key: String,

    /// dput host profile
    pub upload_target: String,

    /// Pool path prefix of the PPA; `-<package>/` is appended per component
    pub archive_base: String,

    /// Architecture of the binary package used to confirm availability
    pub artifact_arch: String,

    /// Changelog entry text
    pub changelog_message: String,

    /// Maintainer identity used while the run is active
    pub identity: Identity,

    /// Component packages, in processing order
    pub packages: Vec<String>,

    /// Availability polling
    pub poll: PollConfig,

    /// How availability is checked
    pub fetcher: FetcherKind,

    /// Optional per-command timeout in seconds (off by default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
}

/// Availability polling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds to sleep between failed fetch attempts
    pub interval_secs: u64,

    /// Give up after this many attempts. Unbounded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

/// Availability probe implementation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Download with `wget`; exit status 0 means available
    #[default]
    Wget,
    /// HTTP GET with reqwest; a 2xx status means available
    Http,
}

impl FetcherKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "wget" => Some(Self::Wget),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            max_attempts: None,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            product: "amarok".to_string(),
            distro: "ubuntu".to_string(),
            distribution: "gutsy".to_string(),
            signing_key: "Amarok Nightly Builds".to_string(),
            upload_target: "amarok-nightly".to_string(),
            archive_base:
                "http://ppa.launchpad.net/amarok-nightly/ubuntu/pool/main/a/amarok-nightly"
                    .to_string(),
            artifact_arch: "i386".to_string(),
            changelog_message: "Nightly Build".to_string(),
            identity: Identity::default(),
            packages: ["qt", "strigi", "kdelibs", "kdebase-runtime", "taglib"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            poll: PollConfig::default(),
            fetcher: FetcherKind::default(),
            command_timeout_secs: None,
        }
    }
}

impl UploadConfig {
    /// Per-command timeout, if configured
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Distro name as shown in progress messages ("Ubuntu")
    pub fn distro_label(&self) -> String {
        let mut chars = self.distro.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Check the configuration for values the workflow cannot use
    pub fn validate(&self) -> Result<(), UploadError> {
        let required = [
            ("product", &self.product),
            ("distro", &self.distro),
            ("distribution", &self.distribution),
            ("signing_key", &self.signing_key),
            ("upload_target", &self.upload_target),
            ("archive_base", &self.archive_base),
            ("artifact_arch", &self.artifact_arch),
            ("changelog_message", &self.changelog_message),
            ("identity.email", &self.identity.email),
            ("identity.name", &self.identity.name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(UploadError::ConfigError(format!("{} must not be empty", field)));
            }
        }

        if !is_valid_package_name(&self.product) {
            return Err(UploadError::ConfigError(format!(
                "product '{}' is not a valid package name",
                self.product
            )));
        }

        let mut seen = HashSet::new();
        for package in &self.packages {
            if !is_valid_package_name(package) {
                return Err(UploadError::ConfigError(format!(
                    "package '{}' is not a valid package name",
                    package
                )));
            }
            if package == &self.product {
                return Err(UploadError::ConfigError(format!(
                    "'{}' is the main package and cannot be listed as a component",
                    package
                )));
            }
            if !seen.insert(package) {
                return Err(UploadError::ConfigError(format!(
                    "package '{}' is listed twice",
                    package
                )));
            }
        }

        if self.poll.interval_secs == 0 {
            return Err(UploadError::ConfigError(
                "poll.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.poll.max_attempts == Some(0) {
            return Err(UploadError::ConfigError(
                "poll.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

pub fn is_valid_package_name(name: &str) -> bool {
    PACKAGE_NAME.is_match(name)
}
