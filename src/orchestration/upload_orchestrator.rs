//! Upload Orchestrator - drives one nightly upload run
//!
//! For every selected component, in package table order, and finally for the
//! main package:
//! stage → copy packaging metadata → changelog → build → upload → wait for availability.
//!
//! The run stops at the first failure. The maintainer identity is overridden
//! for the whole run and restored on every exit path.

use crate::core::config::UploadConfig;
use crate::core::context::BuildContext;
use crate::core::error::UploadError;
use crate::core::poll::{AvailabilityPoller, PollOptions};
use crate::core::state_machine::{CycleStateMachine, StageTransition, UploadStage};
use crate::core::traits::{ChangelogEntry, CopyMode, Toolchain};
use crate::orchestration::plan::{PackageKind, PlannedCycle, UploadPlan};
use crate::security::IdentityGuard;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of one package cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub package: String,
    pub kind: PackageKind,
    pub staging_dir: PathBuf,
    pub changes_file: PathBuf,
    /// Fetch attempts until the package was available; `None` when not polled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_attempts: Option<u32>,
    /// Time from the first to the last stage transition
    pub elapsed_ms: i64,
    pub transitions: Vec<StageTransition>,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cycles: Vec<CycleReport>,
}

/// Main upload orchestrator
pub struct UploadOrchestrator {
    config: UploadConfig,
    toolchain: Arc<dyn Toolchain>,
    poller: AvailabilityPoller,
}

impl UploadOrchestrator {
    pub fn new(config: UploadConfig, toolchain: Arc<dyn Toolchain>) -> Self {
        let poller = AvailabilityPoller::new(PollOptions::from(&config.poll));

        Self {
            config,
            toolchain,
            poller,
        }
    }

    /// Upload the selected components and then the main package.
    ///
    /// # Arguments
    ///
    /// * `context` - Date, revision and directories of this run
    /// * `selected` - Component names to upload; unknown names are skipped
    pub async fn run(
        &self,
        context: &BuildContext,
        selected: &[String],
    ) -> Result<RunReport, UploadError> {
        let plan = UploadPlan::build(&self.config, context, selected);
        debug!(
            "{} cycle(s) with the {} toolchain",
            plan.cycles.len(),
            self.toolchain.name()
        );
        for name in &plan.ignored {
            warn!("'{}' is not in the package table, skipping", name);
        }

        let mut identity = IdentityGuard::acquire(&self.config.identity);
        let result = self.execute(context, &plan).await;
        identity.restore();

        result
    }

    async fn execute(
        &self,
        context: &BuildContext,
        plan: &UploadPlan,
    ) -> Result<RunReport, UploadError> {
        let started_at = Utc::now();
        self.prepare_run_dir(context, plan).await?;

        let mut cycles = Vec::with_capacity(plan.cycles.len());
        for cycle in &plan.cycles {
            cycles.push(self.process(cycle).await?);
        }

        Ok(RunReport {
            run_dir: plan.run_dir.clone(),
            started_at,
            finished_at: Utc::now(),
            cycles,
        })
    }

    /// Create `<root>/<date>-<distro>` and fill it with the exported tree
    async fn prepare_run_dir(
        &self,
        context: &BuildContext,
        plan: &UploadPlan,
    ) -> Result<(), UploadError> {
        if !context.base_dir.is_dir() {
            return Err(UploadError::BaseTreeMissing(context.base_dir.clone()));
        }

        tokio::fs::create_dir_all(&context.root_dir)
            .await
            .map_err(|e| UploadError::io(&context.root_dir, e))?;

        match tokio::fs::create_dir(&plan.run_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(UploadError::RunDirExists(plan.run_dir.clone()));
            }
            Err(e) => return Err(UploadError::io(&plan.run_dir, e)),
        }

        debug!(
            "copying {} to {}",
            context.base_dir.display(),
            plan.run_dir.display()
        );
        self.toolchain
            .copy_tree(&context.base_dir, &plan.run_dir, CopyMode::Merge)
            .await
    }

    /// Run one package through all stages
    async fn process(&self, cycle: &PlannedCycle) -> Result<CycleReport, UploadError> {
        let package = cycle.package.name.as_str();
        info!("{}: uploading {}", self.config.distro_label(), package);

        let mut machine = CycleStateMachine::new(package);

        machine.transition(UploadStage::Stage)?;
        if !cycle.staging_dir.is_dir() {
            return Err(UploadError::StagingMissing {
                package: package.to_string(),
                path: cycle.staging_dir.clone(),
            });
        }

        machine.transition(UploadStage::MetadataCopy)?;
        if !cycle.packaging_source.is_dir() {
            return Err(UploadError::PackagingMissing {
                package: package.to_string(),
                path: cycle.packaging_source.clone(),
            });
        }
        self.toolchain
            .copy_tree(
                &cycle.packaging_source,
                &cycle.staging_dir.join("debian"),
                CopyMode::Replace,
            )
            .await
            .map_err(|e| e.in_step(package, "metadata copy"))?;

        machine.transition(UploadStage::Changelog)?;
        let entry = ChangelogEntry {
            distribution: self.config.distribution.clone(),
            version: cycle.version.clone(),
            message: self.config.changelog_message.clone(),
        };
        self.toolchain
            .append_changelog(&cycle.staging_dir, &entry)
            .await
            .map_err(|e| e.in_step(package, "changelog"))?;

        machine.transition(UploadStage::Build)?;
        self.toolchain
            .build_source_package(&cycle.staging_dir, &self.config.signing_key)
            .await
            .map_err(|e| e.in_step(package, "build"))?;

        machine.transition(UploadStage::Upload)?;
        self.toolchain
            .upload(
                &cycle.staging_dir,
                &self.config.upload_target,
                &cycle.changes_file,
            )
            .await
            .map_err(|e| e.in_step(package, "upload"))?;

        let poll_attempts = match &cycle.availability_url {
            Some(url) => {
                machine.transition(UploadStage::PollAvailability)?;
                let toolchain = self.toolchain.as_ref();
                let staging = cycle.staging_dir.as_path();
                let url = url.as_str();
                let attempts = self
                    .poller
                    .poll(url, move || toolchain.fetch(staging, url))
                    .await
                    .map_err(|e| e.in_step(package, "availability check"))?;
                info!("{} available after {} attempt(s)", package, attempts);
                Some(attempts)
            }
            None => None,
        };

        machine.transition(UploadStage::Done)?;
        debug!(
            "{} {} after {} ms:\n{}",
            package,
            machine.state(),
            machine.elapsed_ms(),
            machine.history()
        );

        Ok(CycleReport {
            package: package.to_string(),
            kind: cycle.package.kind,
            staging_dir: cycle.staging_dir.clone(),
            changes_file: cycle.changes_file.clone(),
            poll_attempts,
            elapsed_ms: machine.elapsed_ms(),
            transitions: machine.into_transitions(),
        })
    }
}
