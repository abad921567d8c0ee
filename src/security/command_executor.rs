//! SafeCommandExecutor: allowlisted execution of the Debian packaging tools
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only pre-approved commands can execute
//! - **Injection prevention**: Arguments are passed as a vector, never through a shell
//! - **Working directory validation**: Validates existence before execution
//! - **Timeout control**: Optional upper bound for a single command
//!
//! # Example
//!
//! ```rust,no_run
//! use nightly_ppa_upload::SafeCommandExecutor;
//!
//! # async fn example() -> Result<(), nightly_ppa_upload::CommandError> {
//! let executor = SafeCommandExecutor::new("/tmp/amarok-nightly-20081015")?;
//! executor.run_checked("dput", &["amarok-nightly", "../pkg_source.changes"]).await?;
//! # Ok(())
//! # }
//! ```

use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Allowed commands whitelist.
///
/// Only these commands can be executed via SafeCommandExecutor.
pub const ALLOWED_COMMANDS: &[&str] = &["dch", "dpkg-buildpackage", "dput", "wget"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command could not be started (e.g., binary not found, permission denied)
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Command ran but reported failure
    #[error("'{command}' exited with status {}: {stderr}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Command exceeded the timeout duration
    #[error("Command timeout after {0:?}")]
    Timeout(Duration),
}

/// Safe command executor bound to one working directory
#[derive(Debug, Clone)]
pub struct SafeCommandExecutor {
    /// Working directory where commands will be executed
    working_dir: PathBuf,
    /// Optional timeout for command execution
    timeout: Option<Duration>,
}

impl SafeCommandExecutor {
    /// Create a new SafeCommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.is_dir() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self {
            working_dir,
            timeout: None,
        })
    }

    /// Set command execution timeout.
    ///
    /// Commands exceeding this duration are killed.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Execute a command and return its captured output, whatever the exit status.
    ///
    /// # Errors
    ///
    /// - `CommandError::CommandNotAllowed` - Command not in whitelist
    /// - `CommandError::ExecutionFailed` - Binary not found or execution error
    /// - `CommandError::Timeout` - Command ran longer than the configured timeout
    pub async fn execute(&self, command: &str, args: &[&str]) -> Result<Output, CommandError> {
        if !ALLOWED_COMMANDS.contains(&command) {
            return Err(CommandError::CommandNotAllowed(command.to_string()));
        }

        debug!(
            "running `{} {}` in {}",
            command,
            args.join(" "),
            self.working_dir.display()
        );

        let child = Command::new(command)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child)
                .await
                .map_err(|_| CommandError::Timeout(timeout))?,
            None => child.await,
        };

        let output =
            output.map_err(|e| CommandError::ExecutionFailed(format!("{}: {}", command, e)))?;
        log_output(command, &output);

        Ok(output)
    }

    /// Execute a command and treat a non-zero exit status as an error.
    pub async fn run_checked(&self, command: &str, args: &[&str]) -> Result<Output, CommandError> {
        let output = self.execute(command, args).await?;

        if !output.status.success() {
            return Err(CommandError::NonZeroExit {
                command: command.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

fn log_output(command: &str, output: &Output) {
    debug!("`{}` finished with {}", command, output.status);
    for (stream, bytes) in [("stdout", &output.stdout), ("stderr", &output.stderr)] {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim();
        if !text.is_empty() {
            debug!("{} {}:\n{}", command, stream, text);
        }
    }
}
