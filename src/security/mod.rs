pub mod command_executor;
pub mod identity;

pub use command_executor::{ALLOWED_COMMANDS, CommandError, SafeCommandExecutor};
pub use identity::{EMAIL_VAR, Identity, IdentityGuard, NAME_VAR};
