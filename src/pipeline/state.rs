//! Pipeline state tracking and serialization.

use crate::error::{PackagerError, Result, StateError};
use crate::publish::PublishResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Phase of a packaging run.
///
/// Phases only move forward: `Init → Archived → Authenticated → Published
/// → Succeeded`. Any phase may move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelinePhase {
    /// Nothing done yet
    Init,
    /// Archive written to local storage
    Archived,
    /// Role credentials obtained
    Authenticated,
    /// Archive uploaded
    Published,
    /// Run completed successfully
    Succeeded,
    /// Run failed
    Failed,
}

impl PipelinePhase {
    /// The phase that follows this one on the success path
    pub fn next(self) -> Option<Self> {
        match self {
            PipelinePhase::Init => Some(PipelinePhase::Archived),
            PipelinePhase::Archived => Some(PipelinePhase::Authenticated),
            PipelinePhase::Authenticated => Some(PipelinePhase::Published),
            PipelinePhase::Published => Some(PipelinePhase::Succeeded),
            PipelinePhase::Succeeded | PipelinePhase::Failed => None,
        }
    }

    /// Whether the run is over
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelinePhase::Succeeded | PipelinePhase::Failed)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Checkpoint reached during the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineCheckpoint {
    /// Phase entered
    pub phase: PipelinePhase,
    /// Timestamp when the phase was entered
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Data recorded with the checkpoint
    pub data: Option<serde_json::Value>,
}

/// Failure that ended the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFailure {
    /// Last phase reached before the failure
    pub phase: PipelinePhase,
    /// Error message
    pub message: String,
    /// Whether re-running may succeed without changes
    pub recoverable: bool,
    /// Timestamp of the failure
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// State of one packaging run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique ID for this run
    pub run_id: String,
    /// Timestamp when the run started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Timestamp of the last update
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Current phase
    pub current_phase: PipelinePhase,
    /// Whether this run stops after archiving
    pub dry_run: bool,
    /// Destination written (or that would be written)
    pub destination: Option<String>,
    /// Checkpoints passed
    pub checkpoints: Vec<PipelineCheckpoint>,
    /// Upload outcome
    pub result: Option<PublishResult>,
    /// Failure, if the run failed
    pub failure: Option<PipelineFailure>,
}

impl PipelineState {
    /// Create the state for a new run
    pub fn new(dry_run: bool) -> Self {
        let now = chrono::Utc::now();
        Self {
            run_id: format!("package-{}", now.timestamp_millis()),
            started_at: now,
            updated_at: now,
            current_phase: PipelinePhase::Init,
            dry_run,
            destination: None,
            checkpoints: Vec::new(),
            result: None,
            failure: None,
        }
    }

    /// Move to `phase`, which must directly follow the current phase.
    ///
    /// A dry run may finish from `Archived`.
    pub fn advance(&mut self, phase: PipelinePhase, data: Option<serde_json::Value>) -> Result<()> {
        if self.current_phase.is_terminal() {
            return Err(StateError::AlreadyTerminal {
                phase: self.current_phase.to_string(),
            }
            .into());
        }

        let dry_run_finish = self.dry_run
            && self.current_phase == PipelinePhase::Archived
            && phase == PipelinePhase::Succeeded;
        if self.current_phase.next() != Some(phase) && !dry_run_finish {
            return Err(StateError::InvalidTransition {
                from: self.current_phase.to_string(),
                to: phase.to_string(),
            }
            .into());
        }

        let now = chrono::Utc::now();
        self.checkpoints.push(PipelineCheckpoint {
            phase,
            timestamp: now,
            data,
        });
        self.current_phase = phase;
        self.updated_at = now;
        Ok(())
    }

    /// Record a failure and move to `Failed`.
    pub fn fail(&mut self, error: &PackagerError) -> Result<()> {
        if self.current_phase.is_terminal() {
            return Err(StateError::AlreadyTerminal {
                phase: self.current_phase.to_string(),
            }
            .into());
        }

        let now = chrono::Utc::now();
        self.failure = Some(PipelineFailure {
            phase: self.current_phase,
            message: error.to_string(),
            recoverable: error.is_recoverable(),
            timestamp: now,
        });
        self.current_phase = PipelinePhase::Failed;
        self.updated_at = now;
        Ok(())
    }

    /// Check if the run reached `phase`
    pub fn has_completed(&self, phase: PipelinePhase) -> bool {
        self.checkpoints.iter().any(|cp| cp.phase == phase)
    }

    /// Whether the run finished successfully
    pub fn succeeded(&self) -> bool {
        self.current_phase == PipelinePhase::Succeeded
    }

    /// Write the state as pretty JSON to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| {
            PackagerError::State(StateError::ReportFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_linear_success_path() {
        let mut state = PipelineState::new(false);
        for phase in [
            PipelinePhase::Archived,
            PipelinePhase::Authenticated,
            PipelinePhase::Published,
            PipelinePhase::Succeeded,
        ] {
            state.advance(phase, None).unwrap();
        }
        assert!(state.succeeded());
        assert!(state.has_completed(PipelinePhase::Published));
        assert_eq!(state.checkpoints.len(), 4);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut state = PipelineState::new(false);
        let err = state.advance(PipelinePhase::Published, None).unwrap_err();
        assert!(matches!(
            err,
            PackagerError::State(StateError::InvalidTransition { .. })
        ));
        assert_eq!(state.current_phase, PipelinePhase::Init);
    }

    #[test]
    fn test_skipping_auth_requires_dry_run() {
        let mut state = PipelineState::new(false);
        state.advance(PipelinePhase::Archived, None).unwrap();
        assert!(state.advance(PipelinePhase::Succeeded, None).is_err());

        let mut dry = PipelineState::new(true);
        dry.advance(PipelinePhase::Archived, None).unwrap();
        dry.advance(PipelinePhase::Succeeded, None).unwrap();
        assert!(dry.succeeded());
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut state = PipelineState::new(false);
        state.advance(PipelinePhase::Archived, None).unwrap();
        let error = PackagerError::Cli(CliError::MissingArgument {
            argument: "bucket".into(),
        });
        state.fail(&error).unwrap();

        assert_eq!(state.current_phase, PipelinePhase::Failed);
        let failure = state.failure.as_ref().unwrap();
        assert_eq!(failure.phase, PipelinePhase::Archived);
        assert!(!failure.recoverable);
        assert!(state.advance(PipelinePhase::Authenticated, None).is_err());
        assert!(state.fail(&error).is_err());
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut state = PipelineState::new(true);
        state.destination = Some("b/n.zip".into());
        state.advance(PipelinePhase::Archived, None).unwrap();
        state.save(&path).unwrap();

        let loaded: PipelineState =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.current_phase, PipelinePhase::Archived);
        assert_eq!(loaded.destination.as_deref(), Some("b/n.zip"));
    }
}
