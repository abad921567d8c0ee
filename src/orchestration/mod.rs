//! Orchestration layer for nightly uploads
//!
//! [`UploadPlan`] resolves every name and path of a run up front;
//! [`UploadOrchestrator`] then walks the plan one package at a time.

pub mod plan;
pub mod upload_orchestrator;

pub use plan::{PackageKind, PackageSpec, PlannedCycle, UploadPlan, run_dir_name, version_string};
pub use upload_orchestrator::{CycleReport, RunReport, UploadOrchestrator};
