//! Error handling for nightly uploads
//!
//! Every step of an upload run reports failures through [`UploadError`]. The
//! orchestrator never recovers from one: the first error ends the run.

use crate::security::CommandError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for upload operations
#[derive(Error, Debug)]
pub enum UploadError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid build context field '{field}': {message}")]
    InvalidContext { field: String, message: String },

    // Filesystem errors
    #[error("Base source tree not found: {}", .0.display())]
    BaseTreeMissing(PathBuf),

    #[error("Run directory already exists: {}", .0.display())]
    RunDirExists(PathBuf),

    #[error("[{package}] staging directory not found: {}", .path.display())]
    StagingMissing { package: String, path: PathBuf },

    #[error("[{package}] packaging metadata not found: {}", .path.display())]
    PackagingMissing { package: String, path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Tool errors
    #[error("[{package}] {step} failed: {source}")]
    StepFailed {
        package: String,
        step: String,
        #[source]
        source: CommandError,
    },

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    // Availability errors
    #[error("{url} still unavailable after {attempts} attempts")]
    AvailabilityExhausted { url: String, attempts: u32 },

    // Internal errors
    #[error("[{package}] invalid stage transition {from} -> {to}")]
    InvalidTransition {
        package: String,
        from: String,
        to: String,
    },
}

impl UploadError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the failing package and step to a command failure
    pub fn in_step(self, package: &str, step: &str) -> Self {
        match self {
            Self::Command(source) => Self::StepFailed {
                package: package.to_string(),
                step: step.to_string(),
                source,
            },
            other => other,
        }
    }

    /// Package this error belongs to, if it is tied to one
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::StagingMissing { package, .. }
            | Self::PackagingMissing { package, .. }
            | Self::StepFailed { package, .. }
            | Self::InvalidTransition { package, .. } => Some(package),
            _ => None,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::ConfigError(_) => vec!["Check .nightly-upload.yaml and NIGHTLY_* variables"],
            Self::InvalidContext { .. } => {
                vec!["Check the --date and --revision arguments"]
            }
            Self::BaseTreeMissing(_) => vec![
                "Run the source export step before uploading",
                "Check the --base argument",
            ],
            Self::RunDirExists(_) => vec![
                "Bump --revision or remove the previous run directory",
            ],
            Self::StagingMissing { .. } => {
                vec!["Check that the exported tree contains the package directory"]
            }
            Self::PackagingMissing { .. } => {
                vec!["Check the --packaging-dir argument"]
            }
            Self::Io { .. } => vec!["Check permissions and free space"],
            Self::StepFailed { .. } | Self::Command(_) => vec![
                "Rerun with --debug to see the full command output",
                "Make sure devscripts, dpkg-dev and dput are installed",
            ],
            Self::AvailabilityExhausted { .. } => vec![
                "Check the build status on Launchpad",
                "Raise poll.max_attempts or remove it to wait indefinitely",
            ],
            Self::InvalidTransition { .. } => vec!["This is a bug, please report it"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidContext { .. } => "INVALID_CONTEXT",
            Self::BaseTreeMissing(_) => "BASE_TREE_MISSING",
            Self::RunDirExists(_) => "RUN_DIR_EXISTS",
            Self::StagingMissing { .. } => "STAGING_MISSING",
            Self::PackagingMissing { .. } => "PACKAGING_MISSING",
            Self::Io { .. } => "IO_ERROR",
            Self::StepFailed { .. } => "STEP_FAILED",
            Self::Command(_) => "COMMAND_ERROR",
            Self::AvailabilityExhausted { .. } => "AVAILABILITY_EXHAUSTED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_error() {
        let error = UploadError::StepFailed {
            package: "qt".to_string(),
            step: "build".to_string(),
            source: CommandError::NonZeroExit {
                command: "dpkg-buildpackage".to_string(),
                code: Some(2),
                stderr: "signing failed".to_string(),
            },
        };

        assert_eq!(error.package(), Some("qt"));
        assert_eq!(error.code(), "STEP_FAILED");
        let message = error.to_string();
        assert!(message.contains("[qt] build failed"));
        assert!(message.contains("dpkg-buildpackage"));
    }

    #[test]
    fn test_staging_missing_error() {
        let error = UploadError::StagingMissing {
            package: "taglib".to_string(),
            path: PathBuf::from("/tmp/amarok-nightly-taglib-20081015"),
        };

        assert_eq!(error.package(), Some("taglib"));
        assert!(error.to_string().contains("amarok-nightly-taglib-20081015"));
        assert!(!error.suggested_actions().is_empty());
    }

    #[test]
    fn test_command_error_conversion() {
        let error: UploadError = CommandError::CommandNotAllowed("rm".to_string()).into();

        assert_eq!(error.code(), "COMMAND_ERROR");
        assert_eq!(error.package(), None);
    }

    #[test]
    fn test_in_step_wraps_command_errors_only() {
        let wrapped = UploadError::Command(CommandError::ExecutionFailed("dput: not found".into()))
            .in_step("kdelibs", "upload");
        assert!(matches!(wrapped, UploadError::StepFailed { ref step, .. } if step == "upload"));
        assert_eq!(wrapped.package(), Some("kdelibs"));

        let untouched = UploadError::RunDirExists(PathBuf::from("/srv/20081015-ubuntu"))
            .in_step("kdelibs", "stage");
        assert_eq!(untouched.code(), "RUN_DIR_EXISTS");
    }

    #[test]
    fn test_command_failure_points_to_debug_output() {
        let error = UploadError::Command(CommandError::NonZeroExit {
            command: "dch".to_string(),
            code: Some(255),
            stderr: String::new(),
        })
        .in_step("strigi", "changelog");

        let actions = error.suggested_actions();
        assert!(actions.iter().any(|a| a.contains("--debug")));
        assert!(!actions.iter().any(|a| a.contains("output above")));
    }

    #[test]
    fn test_availability_exhausted_error() {
        let error = UploadError::AvailabilityExhausted {
            url: "http://example.org/pkg.deb".to_string(),
            attempts: 5,
        };

        assert_eq!(error.code(), "AVAILABILITY_EXHAUSTED");
        assert!(error.to_string().contains("after 5 attempts"));
    }

    #[test]
    fn test_io_error_display() {
        let error = UploadError::io(
            "/root/nightly",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        let display = format!("{}", error);
        assert!(display.contains("/root/nightly"));
        assert!(display.contains("denied"));
    }
}
