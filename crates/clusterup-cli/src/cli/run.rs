//! `cup bringup`, `cup sync-test`, and `cup run <file>`.

use std::path::Path;

use anyhow::Context;
use clusterup_core::event::EventBus;
use clusterup_core::params::ParameterStore;
use clusterup_core::plans::{build_bringup_plan, build_sync_test_plan};
use clusterup_core::sequencer::{PhaseSequencer, RunReport, load_plan_file};
use clusterup_types::parameter::Provenance;
use clusterup_types::plan::PhasePlan;
use console::style;

use super::progress::spawn_renderer;
use super::report::{Outcome, print_report};
use crate::state::AppState;

/// Producer recorded for `--param` seeds.
const SEED_PRODUCER: &str = "cli";

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub json: bool,
    pub quiet: bool,
    /// Mirror collaborator output into the debug log.
    pub echo: bool,
}

pub async fn bringup(state: &AppState, options: RunOptions) -> anyhow::Result<i32> {
    let plan = build_bringup_plan(&state.config, &state.paths, state.auth_token.as_ref())
        .context("bring-up preflight failed")?;
    execute(state, &plan, ParameterStore::new(), Outcome::Run, options).await
}

pub async fn sync_test(state: &AppState, options: RunOptions) -> anyhow::Result<i32> {
    let plan = build_sync_test_plan(&state.config, &state.paths)
        .context("sync test preflight failed")?;
    execute(state, &plan, ParameterStore::new(), Outcome::Test, options).await
}

pub async fn run_file(
    state: &AppState,
    file: &Path,
    seeds: Vec<(String, String)>,
    options: RunOptions,
) -> anyhow::Result<i32> {
    let plan = load_plan_file(file).await?;
    let store = ParameterStore::new();
    for (key, value) in seeds {
        store.insert(&key, value, Provenance::Literal, SEED_PRODUCER)?;
    }
    execute(state, &plan, store, Outcome::Run, options).await
}

/// Run `plan`, render progress, persist the parameter snapshot, and print
/// the report. Returns the process exit code.
async fn execute(
    state: &AppState,
    plan: &PhasePlan,
    store: ParameterStore,
    outcome: Outcome,
    options: RunOptions,
) -> anyhow::Result<i32> {
    tokio::fs::create_dir_all(&state.paths.state_dir)
        .await
        .with_context(|| format!("create {}", state.paths.state_dir.display()))?;

    let bus = EventBus::default();
    let renderer = if options.json || options.quiet {
        None
    } else {
        Some(spawn_renderer(bus.subscribe())?)
    };

    let sequencer = PhaseSequencer::new(state.step_runner(options.echo)?, bus);

    let report = tokio::select! {
        result = sequencer.run(plan, store) => result?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            eprintln!(
                "  {} interrupted; started nodes may still be running. Run `cup teardown` to stop them.",
                style("!").yellow().bold()
            );
            return Ok(130);
        }
    };

    if let Some(renderer) = renderer {
        if let Err(err) = renderer.await {
            tracing::debug!(error = %err, "progress renderer ended abnormally");
        }
    }

    persist(state, &report).await;
    if !options.quiet || options.json {
        print_report(&report, outcome, options.json)?;
    }
    Ok(report.exit_code())
}

/// Saving is best-effort: the run outcome stands even if the snapshot
/// cannot be written.
async fn persist(state: &AppState, report: &RunReport) {
    if let Err(err) = state.run_state.save(report).await {
        tracing::warn!(run_id = %report.run_id, error = %err, "failed to save run state");
    }
}
