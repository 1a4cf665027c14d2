//! `cup plan show`: render a built-in plan as YAML.

use std::path::Path;

use anyhow::Context;
use clusterup_core::plans::{build_bringup_plan, build_sync_test_plan};
use clusterup_types::plan::PhasePlan;

use super::BuiltinPlan;
use crate::state::AppState;

pub fn build(state: &AppState, which: BuiltinPlan) -> anyhow::Result<PhasePlan> {
    let plan = match which {
        BuiltinPlan::Bringup => {
            build_bringup_plan(&state.config, &state.paths, state.auth_token.as_ref())?
        }
        BuiltinPlan::SyncTest => build_sync_test_plan(&state.config, &state.paths)?,
    };
    Ok(plan)
}

pub fn show(state: &AppState, which: BuiltinPlan, json: bool) -> anyhow::Result<()> {
    let plan = build(state, which)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_yaml(&plan, &state.config_path)?);
    }
    Ok(())
}

/// YAML rendering headed by a comment naming the config it was built from.
/// The output loads back with `cup run`.
fn render_yaml(plan: &PhasePlan, config_path: &Path) -> anyhow::Result<String> {
    let yaml = serde_yaml_ng::to_string(plan).context("failed to render plan")?;
    Ok(format!("# built from {}\n{yaml}", config_path.display()))
}
