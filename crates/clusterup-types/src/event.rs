//! Run lifecycle events published on the event bus.
//!
//! The CLI subscribes to render progress; tests subscribe to assert ordering.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::{FailureKind, RunStatus};

/// Events emitted by the phase sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: Uuid,
        plan: String,
        phases: usize,
    },
    PhaseStarted {
        run_id: Uuid,
        phase: String,
        index: usize,
    },
    StepCompleted {
        run_id: Uuid,
        phase: String,
        step_id: String,
        duration_ms: u64,
    },
    StepFailed {
        run_id: Uuid,
        phase: String,
        step_id: String,
        kind: FailureKind,
        error: String,
        fatal: bool,
    },
    PhaseCompleted {
        run_id: Uuid,
        phase: String,
        duration_ms: u64,
    },
    PhaseFailed {
        run_id: Uuid,
        phase: String,
        error: String,
    },
    CleanupRan {
        run_id: Uuid,
        phase: String,
        ok: bool,
    },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        duration_ms: u64,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::PhaseStarted { run_id, .. }
            | RunEvent::StepCompleted { run_id, .. }
            | RunEvent::StepFailed { run_id, .. }
            | RunEvent::PhaseCompleted { run_id, .. }
            | RunEvent::PhaseFailed { run_id, .. }
            | RunEvent::CleanupRan { run_id, .. }
            | RunEvent::RunFinished { run_id, .. } => *run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = RunEvent::CleanupRan {
            run_id: Uuid::nil(),
            phase: "start-monitoring-loki".to_string(),
            ok: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cleanup_ran");
        assert_eq!(json["phase"], "start-monitoring-loki");
        assert_eq!(event.run_id(), Uuid::nil());
    }
}
