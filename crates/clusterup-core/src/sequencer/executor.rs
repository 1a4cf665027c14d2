//! Phase sequencer: ordered phase execution with reverse-order cleanup.
//!
//! Phases run strictly in declared order. Steps of a forked phase run
//! concurrently on a `JoinSet` and are all joined before the phase completes.
//!
//! # Failure handling
//!
//! 1. A fatal step failure marks its phase Failed and skips the phase's
//!    remaining steps (forked siblings already running are joined).
//! 2. Every later phase is Skipped and the run becomes Aborted.
//! 3. Cleanup hooks of every started phase run once, most recent first.
//!    Cleanup failures are logged and reported, never promoted.
//! 4. The always-run phase executes exactly once, last, on every outcome.

use std::collections::HashSet;
use std::sync::Arc;

use clusterup_types::event::RunEvent;
use clusterup_types::plan::{
    FailureKind, PhaseDefinition, PhasePlan, PhaseStatus, RunStatus, StepDefinition,
};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::chain::ChainQuery;
use crate::event::EventBus;
use crate::params::ParameterStore;
use crate::process::ProcessRunner;

use super::definition::{PlanError, validate_plan};
use super::report::{CleanupReport, FailureReport, PhaseReport, RunReport};
use super::step_runner::{StepError, StepOutput, StepRunner};

#[derive(Debug, Error)]
pub enum SequencerError {
    /// The plan failed static validation; nothing was executed.
    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),
}

/// Drives a `PhasePlan` to completion.
///
/// Generic over the process runner and chain query ports.
pub struct PhaseSequencer<R, Q> {
    steps: Arc<StepRunner<R, Q>>,
    event_bus: EventBus,
}

impl<R, Q> PhaseSequencer<R, Q>
where
    R: ProcessRunner + 'static,
    Q: ChainQuery + 'static,
{
    pub fn new(steps: StepRunner<R, Q>, event_bus: EventBus) -> Self {
        Self {
            steps: Arc::new(steps),
            event_bus,
        }
    }

    /// Execute `plan` against `store`.
    ///
    /// Keys already in `store` count as seeded for validation. Step failures
    /// are reported in the returned `RunReport`, not as `Err`.
    pub async fn run(
        &self,
        plan: &PhasePlan,
        store: ParameterStore,
    ) -> Result<RunReport, SequencerError> {
        let seeded: HashSet<String> = store.snapshot().into_iter().map(|e| e.key).collect();
        validate_plan(plan, &seeded)?;

        let run_id = Uuid::now_v7();
        let run_started = Instant::now();
        let span = tracing::info_span!("run", run_id = %run_id, plan = plan.name.as_str());

        async {
            tracing::info!(phases = plan.phases.len(), "run started");
            self.event_bus.publish(RunEvent::RunStarted {
                run_id,
                plan: plan.name.clone(),
                phases: plan.phases.len(),
            });

            let mut phases: Vec<PhaseReport> = plan
                .phases
                .iter()
                .map(|p| PhaseReport::pending(&p.name))
                .collect();
            let mut started: Vec<usize> = Vec::new();
            let mut failure: Option<FailureReport> = None;

            for (index, phase) in plan.phases.iter().enumerate() {
                if phase.always_run {
                    continue;
                }
                if failure.is_some() {
                    phases[index].status = PhaseStatus::Skipped;
                    continue;
                }
                started.push(index);
                phases[index].status = PhaseStatus::Running;
                let outcome = self.run_phase(run_id, index, phase, &store).await;
                if let Some(f) = self.finish_phase(run_id, &mut phases[index], outcome) {
                    failure = Some(f);
                }
            }

            let mut cleanups = Vec::new();
            if failure.is_some() {
                for &index in started.iter().rev() {
                    let phase = &plan.phases[index];
                    for cleanup in &phase.cleanup {
                        cleanups.push(self.run_cleanup(run_id, &phase.name, cleanup, &store).await);
                    }
                }
            }

            if let Some((index, phase)) = plan
                .phases
                .iter()
                .enumerate()
                .find(|(_, p)| p.always_run)
            {
                phases[index].status = PhaseStatus::Running;
                let outcome = self.run_phase(run_id, index, phase, &store).await;
                // always-run phases are best-effort; nothing here can abort
                let _ = self.finish_phase(run_id, &mut phases[index], outcome);
            }

            let status = if failure.is_some() {
                RunStatus::Aborted
            } else {
                RunStatus::Succeeded
            };
            let duration_ms = run_started.elapsed().as_millis() as u64;

            match &failure {
                Some(f) => tracing::error!(
                    phase = f.phase.as_str(),
                    step = f.step_id.as_str(),
                    kind = %f.kind,
                    duration_ms,
                    "run aborted"
                ),
                None => tracing::info!(duration_ms, "run succeeded"),
            }
            self.event_bus.publish(RunEvent::RunFinished {
                run_id,
                status,
                duration_ms,
            });

            Ok(RunReport {
                run_id,
                plan: plan.name.clone(),
                status,
                phases,
                cleanups,
                failure,
                params: store.snapshot(),
                duration_ms,
            })
        }
        .instrument(span)
        .await
    }

    /// Apply a phase outcome to its report entry and publish the event.
    fn finish_phase(
        &self,
        run_id: Uuid,
        report: &mut PhaseReport,
        outcome: PhaseOutcome,
    ) -> Option<FailureReport> {
        report.duration_ms = Some(outcome.duration_ms);
        match outcome.failure {
            None => {
                report.status = PhaseStatus::Completed;
                self.event_bus.publish(RunEvent::PhaseCompleted {
                    run_id,
                    phase: report.name.clone(),
                    duration_ms: outcome.duration_ms,
                });
                None
            }
            Some(failure) => {
                report.status = PhaseStatus::Failed;
                report.error = Some(failure.message.clone());
                self.event_bus.publish(RunEvent::PhaseFailed {
                    run_id,
                    phase: report.name.clone(),
                    error: failure.message.clone(),
                });
                Some(failure)
            }
        }
    }

    async fn run_phase(
        &self,
        run_id: Uuid,
        index: usize,
        phase: &PhaseDefinition,
        store: &ParameterStore,
    ) -> PhaseOutcome {
        let span = tracing::info_span!("phase", phase = phase.name.as_str(), index);
        async {
            tracing::info!(steps = phase.steps.len(), forked = phase.forked, "phase started");
            self.event_bus.publish(RunEvent::PhaseStarted {
                run_id,
                phase: phase.name.clone(),
                index,
            });

            let started = Instant::now();
            let failure = if phase.forked {
                self.run_forked(run_id, phase, store).await
            } else {
                self.run_sequential(run_id, phase, store).await
            };
            PhaseOutcome {
                duration_ms: started.elapsed().as_millis() as u64,
                failure,
            }
        }
        .instrument(span)
        .await
    }

    async fn run_sequential(
        &self,
        run_id: Uuid,
        phase: &PhaseDefinition,
        store: &ParameterStore,
    ) -> Option<FailureReport> {
        for step in &phase.steps {
            let started = Instant::now();
            let result = self
                .steps
                .run(step, store)
                .instrument(tracing::info_span!("step", step = step.id.as_str()))
                .await;
            let elapsed = started.elapsed().as_millis() as u64;
            if let Some(failure) = self.step_finished(run_id, phase, step, elapsed, result) {
                return Some(failure);
            }
        }
        None
    }

    async fn run_forked(
        &self,
        run_id: Uuid,
        phase: &PhaseDefinition,
        store: &ParameterStore,
    ) -> Option<FailureReport> {
        let mut join_set = JoinSet::new();

        for (position, step) in phase.steps.iter().enumerate() {
            let runner = Arc::clone(&self.steps);
            let step = step.clone();
            let store = store.clone();
            let span = tracing::info_span!("step", step = step.id.as_str());
            join_set.spawn(
                async move {
                    let started = Instant::now();
                    let result = runner.run(&step, &store).await;
                    (position, started.elapsed().as_millis() as u64, result)
                }
                .instrument(span),
            );
        }

        let mut results = Vec::with_capacity(phase.steps.len());
        let mut join_failure: Option<String> = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(error = %e, "forked step task failed");
                    join_failure.get_or_insert_with(|| format!("step task failed: {e}"));
                }
            }
        }

        // Report in declaration order; the first fatal failure wins.
        results.sort_by_key(|(position, _, _)| *position);
        let mut failure = None;
        for (position, elapsed, result) in results {
            let step = &phase.steps[position];
            if let Some(f) = self.step_finished(run_id, phase, step, elapsed, result) {
                failure.get_or_insert(f);
            }
        }

        if failure.is_none() {
            if let Some(message) = join_failure {
                failure = Some(FailureReport {
                    phase: phase.name.clone(),
                    step_id: "(forked)".to_string(),
                    kind: FailureKind::ExternalCommand,
                    message,
                    output: None,
                });
            }
        }
        failure
    }

    /// Publish the step result; return a failure when it must abort the run.
    fn step_finished(
        &self,
        run_id: Uuid,
        phase: &PhaseDefinition,
        step: &StepDefinition,
        elapsed_ms: u64,
        result: Result<StepOutput, StepError>,
    ) -> Option<FailureReport> {
        match result {
            Ok(output) => {
                tracing::info!(
                    step = step.id.as_str(),
                    duration_ms = elapsed_ms,
                    recorded = output.recorded.len(),
                    "step completed"
                );
                self.event_bus.publish(RunEvent::StepCompleted {
                    run_id,
                    phase: phase.name.clone(),
                    step_id: step.id.clone(),
                    duration_ms: elapsed_ms,
                });
                None
            }
            Err(err) => {
                let fatal = !(step.best_effort || phase.best_effort || phase.always_run);
                let kind = err.kind();
                if fatal {
                    tracing::error!(step = step.id.as_str(), kind = %kind, error = %err, "step failed");
                } else {
                    tracing::warn!(step = step.id.as_str(), kind = %kind, error = %err, "best-effort step failed");
                }
                self.event_bus.publish(RunEvent::StepFailed {
                    run_id,
                    phase: phase.name.clone(),
                    step_id: step.id.clone(),
                    kind,
                    error: err.to_string(),
                    fatal,
                });
                fatal.then(|| FailureReport {
                    phase: phase.name.clone(),
                    step_id: step.id.clone(),
                    kind,
                    message: err.to_string(),
                    output: err.output().map(str::to_string),
                })
            }
        }
    }

    async fn run_cleanup(
        &self,
        run_id: Uuid,
        phase: &str,
        cleanup: &StepDefinition,
        store: &ParameterStore,
    ) -> CleanupReport {
        let result = self
            .steps
            .run(cleanup, store)
            .instrument(tracing::info_span!("cleanup", phase, step = cleanup.id.as_str()))
            .await;
        let error = match result {
            Ok(_) => {
                tracing::info!(phase, step = cleanup.id.as_str(), "cleanup ran");
                None
            }
            Err(err) => {
                tracing::warn!(phase, step = cleanup.id.as_str(), error = %err, "cleanup failed");
                Some(err.to_string())
            }
        };
        self.event_bus.publish(RunEvent::CleanupRan {
            run_id,
            phase: phase.to_string(),
            ok: error.is_none(),
        });
        CleanupReport {
            phase: phase.to_string(),
            step_id: cleanup.id.clone(),
            ok: error.is_none(),
            error,
        }
    }
}

struct PhaseOutcome {
    duration_ms: u64,
    failure: Option<FailureReport>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::tests::ScriptedChain;
    use crate::sequencer::testing::ScriptedRunner;
    use clusterup_types::parameter::Provenance;
    use clusterup_types::plan::{CommandStep, ExtractionKind, ExtractionRule, ParamValue, StepConfig};
    use std::sync::Mutex;

    fn cmd(id: &str, program: &str) -> StepDefinition {
        StepDefinition::new(
            id,
            StepConfig::Command(CommandStep::new(program, vec![id.to_string()])),
        )
    }

    fn plan(phases: Vec<PhaseDefinition>) -> PhasePlan {
        PhasePlan {
            name: "test".to_string(),
            description: None,
            phases,
        }
    }

    fn sequencer(
        script: ScriptedRunner,
    ) -> (PhaseSequencer<ScriptedRunner, ScriptedChain>, Arc<Mutex<Vec<String>>>) {
        let calls = script.calls();
        let steps = StepRunner::new(Arc::new(script), Arc::new(ScriptedChain::fixed(100)));
        (PhaseSequencer::new(steps, EventBus::new(256)), calls)
    }

    fn called(calls: &Arc<Mutex<Vec<String>>>, needle: &str) -> usize {
        calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    fn position(calls: &Arc<Mutex<Vec<String>>>, needle: &str) -> usize {
        calls
            .lock()
            .unwrap()
            .iter()
            .position(|c| c.contains(needle))
            .unwrap()
    }

    #[tokio::test]
    async fn successful_run_executes_phases_in_order_without_cleanups() {
        let (seq, calls) = sequencer(ScriptedRunner::new());
        let p = plan(vec![
            PhaseDefinition::new("a", vec![cmd("a1", "tool"), cmd("a2", "tool")])
                .with_cleanup(cmd("a-down", "tool")),
            PhaseDefinition::new("b", vec![cmd("b1", "tool")]),
        ]);
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();

        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(report.exit_code(), 0);
        assert!(report.cleanups.is_empty());
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["tool a1", "tool a2", "tool b1"]
        );
        assert!(report.phases.iter().all(|p| p.status == PhaseStatus::Completed));
    }

    #[tokio::test]
    async fn failure_skips_later_phases_and_cleans_up_in_reverse() {
        let script = ScriptedRunner::new().respond("b2", 1, "b2 exploded");
        let (seq, calls) = sequencer(script);
        let p = plan(vec![
            PhaseDefinition::new("A", vec![cmd("a1", "tool")]).with_cleanup(cmd("a-down", "tool")),
            PhaseDefinition::new("B", vec![cmd("b1", "tool"), cmd("b2", "tool"), cmd("b3", "tool")])
                .with_cleanup(cmd("b-down", "tool")),
            PhaseDefinition::new("C", vec![cmd("c1", "tool")]).with_cleanup(cmd("c-down", "tool")),
        ]);
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();

        assert_eq!(report.status, RunStatus::Aborted);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(called(&calls, "c1"), 0);
        assert_eq!(called(&calls, "b3"), 0);
        assert_eq!(called(&calls, "c-down"), 0);
        assert_eq!(called(&calls, "b-down"), 1);
        assert_eq!(called(&calls, "a-down"), 1);
        assert!(position(&calls, "b-down") < position(&calls, "a-down"));

        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.phase, "B");
        assert_eq!(failure.step_id, "b2");
        assert_eq!(failure.kind, FailureKind::ExternalCommand);
        assert_eq!(failure.output.as_deref(), Some("b2 exploded"));

        assert_eq!(report.phase("A").unwrap().status, PhaseStatus::Completed);
        assert_eq!(report.phase("B").unwrap().status, PhaseStatus::Failed);
        assert_eq!(report.phase("C").unwrap().status, PhaseStatus::Skipped);
        let cleanup_phases: Vec<&str> = report.cleanups.iter().map(|c| c.phase.as_str()).collect();
        assert_eq!(cleanup_phases, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn cleanup_failure_does_not_mask_original_failure() {
        let script = ScriptedRunner::new()
            .respond("b1", 2, "original")
            .respond("a-down", 1, "already gone");
        let (seq, calls) = sequencer(script);
        let p = plan(vec![
            PhaseDefinition::new("A", vec![cmd("a1", "tool")]).with_cleanup(cmd("a-down", "tool")),
            PhaseDefinition::new("B", vec![cmd("b1", "tool")]).with_cleanup(cmd("b-down", "tool")),
        ]);
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();

        assert_eq!(report.failure.as_ref().unwrap().step_id, "b1");
        assert_eq!(report.cleanups.len(), 2);
        assert!(report.cleanups[0].ok);
        assert!(!report.cleanups[1].ok);
        assert_eq!(called(&calls, "b-down"), 1);
    }

    #[tokio::test]
    async fn best_effort_step_failure_continues() {
        let script = ScriptedRunner::new().respond("flaky", 1, "nope");
        let (seq, calls) = sequencer(script);
        let p = plan(vec![PhaseDefinition::new(
            "a",
            vec![cmd("flaky", "tool").best_effort(), cmd("after", "tool")],
        )]);
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();
        assert!(report.succeeded());
        assert_eq!(called(&calls, "after"), 1);
    }

    #[tokio::test]
    async fn always_run_phase_runs_once_on_success_and_on_abort() {
        for fail in [false, true] {
            let script = if fail {
                ScriptedRunner::new().respond("work", 1, "")
            } else {
                ScriptedRunner::new()
            };
            let (seq, calls) = sequencer(script);
            let p = plan(vec![
                PhaseDefinition::new("work", vec![cmd("work", "tool")]),
                PhaseDefinition::new("teardown", vec![cmd("stop-all", "tool")]).always_run(),
            ]);
            let report = seq.run(&p, ParameterStore::new()).await.unwrap();
            assert_eq!(called(&calls, "stop-all"), 1, "fail={fail}");
            assert_eq!(report.succeeded(), !fail);
            assert_eq!(report.phase("teardown").unwrap().status, PhaseStatus::Completed);
        }
    }

    #[tokio::test]
    async fn always_run_failure_does_not_abort_a_successful_run() {
        let script = ScriptedRunner::new().respond("stop-all", 1, "not running");
        let (seq, _) = sequencer(script);
        let p = plan(vec![
            PhaseDefinition::new("work", vec![cmd("work", "tool")]),
            PhaseDefinition::new("teardown", vec![cmd("stop-all", "tool")]).always_run(),
        ]);
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn teardown_runs_after_cleanups() {
        let script = ScriptedRunner::new().respond("b1", 1, "");
        let (seq, calls) = sequencer(script);
        let p = plan(vec![
            PhaseDefinition::new("a", vec![cmd("a1", "tool")]).with_cleanup(cmd("a-down", "tool")),
            PhaseDefinition::new("b", vec![cmd("b1", "tool")]),
            PhaseDefinition::new("teardown", vec![cmd("stop-all", "tool")]).always_run(),
        ]);
        seq.run(&p, ParameterStore::new()).await.unwrap();
        assert!(position(&calls, "a-down") < position(&calls, "stop-all"));
    }

    #[tokio::test(start_paused = true)]
    async fn forked_steps_run_concurrently_and_join() {
        let script = ScriptedRunner::new()
            .respond_after("join-v0", 3_000, 0, "")
            .respond_after("join-v1", 3_000, 0, "")
            .respond_after("join-v2", 3_000, 0, "");
        let (seq, calls) = sequencer(script);
        let p = plan(vec![
            PhaseDefinition::new(
                "join",
                vec![cmd("join-v0", "ipc"), cmd("join-v1", "ipc"), cmd("join-v2", "ipc")],
            )
            .forked(),
            PhaseDefinition::new("after", vec![cmd("after", "tool")]),
        ]);
        let started = Instant::now();
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();
        assert!(report.succeeded());
        // joined in parallel: one delay, not three
        let elapsed = started.elapsed().as_millis();
        assert!((3_000..6_000).contains(&elapsed), "elapsed {elapsed}ms");
        assert_eq!(position(&calls, "after"), 3);
    }

    #[tokio::test]
    async fn forked_failure_waits_for_siblings_then_aborts() {
        let script = ScriptedRunner::new().respond("join-v1", 1, "rejected");
        let (seq, calls) = sequencer(script);
        let p = plan(vec![
            PhaseDefinition::new("join", vec![cmd("join-v0", "ipc"), cmd("join-v1", "ipc")])
                .forked()
                .with_cleanup(cmd("leave", "ipc")),
            PhaseDefinition::new("after", vec![cmd("after", "tool")]),
        ]);
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();
        assert_eq!(report.failure.as_ref().unwrap().step_id, "join-v1");
        assert_eq!(called(&calls, "join-v0"), 1);
        assert_eq!(called(&calls, "after"), 0);
        assert_eq!(called(&calls, "leave"), 1);
    }

    #[tokio::test]
    async fn extracted_values_flow_into_later_phases() {
        let script = ScriptedRunner::new().respond("create", 0, "created subnet actor with id: /r1/abc");
        let (seq, calls) = sequencer(script);
        let create = StepDefinition::new(
            "create",
            StepConfig::Command(CommandStep::new("ipc", vec!["create".into()]).extract(
                ExtractionRule {
                    key: "subnet_id".to_string(),
                    label: "subnet id".to_string(),
                    marker: "with id:".to_string(),
                    kind: ExtractionKind::SameLine,
                    strip_p2p_suffix: false,
                    mandatory: true,
                },
            )),
        );
        let join = StepDefinition::new(
            "join",
            StepConfig::Command(
                CommandStep::new("ipc", vec!["join".into()])
                    .param("subnet", ParamValue::key("subnet_id")),
            ),
        );
        let p = plan(vec![
            PhaseDefinition::new("create-subnet", vec![create]),
            PhaseDefinition::new("join-subnet", vec![join]),
        ]);
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();
        assert_eq!(report.param("subnet_id"), Some("/r1/abc"));
        assert_eq!(called(&calls, "ipc join --subnet /r1/abc"), 1);
    }

    #[tokio::test]
    async fn invalid_plan_runs_nothing() {
        let (seq, calls) = sequencer(ScriptedRunner::new());
        let join = StepDefinition::new(
            "join",
            StepConfig::Command(
                CommandStep::new("ipc", vec![]).param("subnet", ParamValue::key("subnet_id")),
            ),
        );
        let p = plan(vec![PhaseDefinition::new("join", vec![join])]);
        let err = seq.run(&p, ParameterStore::new()).await.unwrap_err();
        assert!(matches!(err, SequencerError::InvalidPlan(PlanError::UnresolvedReference { .. })));
        assert!(calls.lock().unwrap().is_empty());

        // the same plan is valid once the key is seeded
        let store = ParameterStore::new();
        store
            .insert("subnet_id", "/r1/abc", Provenance::Literal, "config")
            .unwrap();
        assert!(seq.run(&p, store).await.unwrap().succeeded());
    }

    #[tokio::test]
    async fn events_are_published_in_order() {
        let script = ScriptedRunner::new().respond("b1", 1, "boom");
        let steps = StepRunner::new(Arc::new(script), Arc::new(ScriptedChain::fixed(1)));
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let seq = PhaseSequencer::new(steps, bus);
        let p = plan(vec![
            PhaseDefinition::new("a", vec![cmd("a1", "tool")]).with_cleanup(cmd("a-down", "tool")),
            PhaseDefinition::new("b", vec![cmd("b1", "tool")]),
        ]);
        let report = seq.run(&p, ParameterStore::new()).await.unwrap();

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.run_id(), report.run_id);
            names.push(match event {
                RunEvent::RunStarted { .. } => "run_started",
                RunEvent::PhaseStarted { .. } => "phase_started",
                RunEvent::StepCompleted { .. } => "step_completed",
                RunEvent::StepFailed { fatal: true, .. } => "step_failed",
                RunEvent::StepFailed { .. } => "step_failed_soft",
                RunEvent::PhaseCompleted { .. } => "phase_completed",
                RunEvent::PhaseFailed { .. } => "phase_failed",
                RunEvent::CleanupRan { .. } => "cleanup_ran",
                RunEvent::RunFinished { .. } => "run_finished",
            });
        }
        assert_eq!(
            names,
            vec![
                "run_started",
                "phase_started",
                "step_completed",
                "phase_completed",
                "phase_started",
                "step_failed",
                "phase_failed",
                "cleanup_ran",
                "run_finished",
            ]
        );
    }
}
