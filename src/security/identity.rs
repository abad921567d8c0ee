//! Scoped override of the Debian maintainer identity
//!
//! `dch` and `dpkg-buildpackage` read the maintainer from `DEBEMAIL` and
//! `DEBFULLNAME`. An upload run swaps in the nightly identity and must hand
//! the previous values back on every exit path, which [`IdentityGuard`] does
//! in its `Drop` impl.

use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::ffi::OsString;

/// Environment variable holding the maintainer email
pub const EMAIL_VAR: &str = "DEBEMAIL";

/// Environment variable holding the maintainer display name
pub const NAME_VAR: &str = "DEBFULLNAME";

/// Maintainer identity written into changelog entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            email: "nightly@getamarok.com".to_string(),
            name: "Amarok Nightly Builds".to_string(),
        }
    }
}

/// Holds the nightly identity in the process environment until dropped
///
/// # Examples
///
/// ```
/// use nightly_ppa_upload::security::{Identity, IdentityGuard};
///
/// let identity = Identity::default();
/// {
///     let _guard = IdentityGuard::acquire(&identity);
///     assert_eq!(std::env::var("DEBEMAIL").unwrap(), identity.email);
/// }
/// ```
#[derive(Debug)]
pub struct IdentityGuard {
    saved: Option<(Option<OsString>, Option<OsString>)>,
}

impl IdentityGuard {
    /// Save the current identity variables and install `identity`
    pub fn acquire(identity: &Identity) -> Self {
        let saved = (env::var_os(EMAIL_VAR), env::var_os(NAME_VAR));
        debug!("overriding {} and {} for this run", EMAIL_VAR, NAME_VAR);

        // SAFETY: the run awaits every step in sequence, so no child process
        // is being spawned and nothing else in the process reads or writes
        // the environment while these calls run. Runtime worker and blocking
        // threads exist but never touch it.
        unsafe {
            env::set_var(EMAIL_VAR, &identity.email);
            env::set_var(NAME_VAR, &identity.name);
        }

        Self { saved: Some(saved) }
    }

    /// Put the saved values back. Later calls and the drop are no-ops.
    pub fn restore(&mut self) {
        let Some((email, name)) = self.saved.take() else {
            return;
        };

        restore_var(EMAIL_VAR, email);
        restore_var(NAME_VAR, name);
        debug!("restored {} and {}", EMAIL_VAR, NAME_VAR);
    }
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

fn restore_var(key: &str, value: Option<OsString>) {
    // SAFETY: see `IdentityGuard::acquire`.
    unsafe {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}

/// Serializes tests that touch the identity variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
pub(crate) fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
