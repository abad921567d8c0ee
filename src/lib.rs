pub mod core;
pub mod orchestration;
pub mod security;
pub mod toolchain;

pub use crate::core::*;
pub use orchestration::{CycleReport, RunReport, UploadOrchestrator, UploadPlan};
pub use security::{CommandError, Identity, IdentityGuard, SafeCommandExecutor};
pub use toolchain::DebianToolchain;
