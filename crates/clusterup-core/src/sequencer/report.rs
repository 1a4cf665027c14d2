//! Run report returned by the sequencer.

use clusterup_types::parameter::ParamEntry;
use clusterup_types::plan::{FailureKind, PhaseStatus, RunStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub name: String,
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhaseReport {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: PhaseStatus::Pending,
            duration_ms: None,
            error: None,
        }
    }
}

/// Outcome of one cleanup hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    pub phase: String,
    pub step_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The failure that aborted the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub phase: String,
    pub step_id: String,
    pub kind: FailureKind,
    pub message: String,
    /// Raw captured output of the failing command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub plan: String,
    pub status: RunStatus,
    pub phases: Vec<PhaseReport>,
    /// Cleanup hooks in the order they ran.
    pub cleanups: Vec<CleanupReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReport>,
    /// Parameter store at the end of the run.
    pub params: Vec<ParamEntry>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Process exit code: 0 on success, 1 on an aborted run.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Value of `key` in the final parameter snapshot.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}
