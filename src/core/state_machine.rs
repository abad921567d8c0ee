//! Stage tracking for one package upload cycle
//!
//! A cycle moves strictly forward:
//! `PENDING -> STAGE -> METADATA_COPY -> CHANGELOG -> BUILD -> UPLOAD -> [POLL_AVAILABILITY] -> DONE`.
//! There is no failure state; an error abandons the cycle where it stands.

use crate::core::error::UploadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a package upload cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStage {
    Pending,
    Stage,
    MetadataCopy,
    Changelog,
    Build,
    Upload,
    PollAvailability,
    Done,
}

impl UploadStage {
    /// Whether `to` may directly follow `self`
    pub fn can_transition_to(self, to: UploadStage) -> bool {
        use UploadStage::*;

        matches!(
            (self, to),
            (Pending, Stage)
                | (Stage, MetadataCopy)
                | (MetadataCopy, Changelog)
                | (Changelog, Build)
                | (Build, Upload)
                | (Upload, PollAvailability)
                | (Upload, Done)
                | (PollAvailability, Done)
        )
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::Pending => "PENDING",
            UploadStage::Stage => "STAGE",
            UploadStage::MetadataCopy => "METADATA_COPY",
            UploadStage::Changelog => "CHANGELOG",
            UploadStage::Build => "BUILD",
            UploadStage::Upload => "UPLOAD",
            UploadStage::PollAvailability => "POLL_AVAILABILITY",
            UploadStage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTransition {
    pub from: UploadStage,
    pub to: UploadStage,
    pub timestamp: DateTime<Utc>,
}

/// Tracks the stages of one package cycle
#[derive(Debug, Clone)]
pub struct CycleStateMachine {
    package: String,
    current: UploadStage,
    transitions: Vec<StageTransition>,
}

impl CycleStateMachine {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            current: UploadStage::Pending,
            transitions: Vec::new(),
        }
    }

    /// Move to `to`, rejecting anything but the next stage of the cycle
    pub fn transition(&mut self, to: UploadStage) -> Result<(), UploadError> {
        if !self.current.can_transition_to(to) {
            return Err(UploadError::InvalidTransition {
                package: self.package.clone(),
                from: self.current.to_string(),
                to: to.to_string(),
            });
        }

        self.transitions.push(StageTransition {
            from: self.current,
            to,
            timestamp: Utc::now(),
        });
        self.current = to;

        Ok(())
    }

    pub fn state(&self) -> UploadStage {
        self.current
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn transitions(&self) -> &[StageTransition] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<StageTransition> {
        self.transitions
    }

    /// Milliseconds between the first and the last transition
    pub fn elapsed_ms(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Transition history as human-readable lines
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{}: {} → {}", t.timestamp.to_rfc3339(), t.from, t.to))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
