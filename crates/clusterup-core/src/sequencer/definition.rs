//! Phase plan parsing and static validation.
//!
//! Converts between YAML files and `PhasePlan`, and checks the structural
//! guarantees the sequencer relies on: unique names, parameter references that
//! are satisfied by phase ordering alone, and disjoint writes in forked phases.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use clusterup_types::plan::{PhasePlan, ReadinessCondition, StepConfig, StepDefinition};
use thiserror::Error;

use crate::params::ParameterStore;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// A step reads a key nothing earlier in the plan produces.
    #[error("step '{step}' in phase '{phase}' references '{key}', which no earlier step produces")]
    UnresolvedReference {
        phase: String,
        step: String,
        key: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse and validate a YAML plan. No keys are assumed to be pre-seeded.
pub fn parse_plan_yaml(yaml: &str) -> Result<PhasePlan, PlanError> {
    let plan: PhasePlan =
        serde_yaml_ng::from_str(yaml).map_err(|e| PlanError::Parse(e.to_string()))?;
    validate_plan(&plan, &HashSet::new())?;
    Ok(plan)
}

pub fn serialize_plan_yaml(plan: &PhasePlan) -> Result<String, PlanError> {
    serde_yaml_ng::to_string(plan).map_err(|e| PlanError::Parse(e.to_string()))
}

/// Load a plan file. Validation happens when the plan is run, against the
/// keys seeded at that point.
pub async fn load_plan_file(path: &Path) -> Result<PhasePlan, PlanError> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_yaml_ng::from_str(&content).map_err(|e| PlanError::Parse(format!("{}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Store keys a step reads.
pub fn referenced_keys(step: &StepDefinition) -> Result<Vec<String>, PlanError> {
    let mut keys = Vec::new();
    let mut templates: Vec<&str> = Vec::new();

    let parse_err = |e: clusterup_types::error::ParamError| {
        PlanError::Validation(format!("step '{}': {e}", step.id))
    };

    match &step.config {
        StepConfig::Command(cmd) => {
            for binding in &cmd.params {
                keys.extend(ParameterStore::referenced_keys(&binding.value).map_err(parse_err)?);
            }
            for value in cmd.env.values() {
                keys.extend(ParameterStore::referenced_keys(value).map_err(parse_err)?);
            }
            if let Some(dir) = &cmd.working_dir {
                templates.push(dir);
            }
        }
        StepConfig::Readiness { condition, .. } => match condition {
            ReadinessCondition::RpcHeight { rpc } | ReadinessCondition::ChainAdvancing { rpc } => {
                templates.push(rpc)
            }
            ReadinessCondition::DirNonEmpty { path } => templates.push(path),
        },
        StepConfig::Delay { .. } => {}
        StepConfig::TrustParams { rpc, .. } => templates.push(rpc),
        StepConfig::UpdateConfig {
            path,
            subnet,
            fields,
            ..
        } => {
            templates.push(path);
            templates.push(subnet);
            for field in fields {
                keys.extend(ParameterStore::referenced_keys(&field.value).map_err(parse_err)?);
            }
        }
        StepConfig::Record { entries } => {
            for binding in entries {
                keys.extend(ParameterStore::referenced_keys(&binding.value).map_err(parse_err)?);
            }
        }
    }

    for text in templates {
        keys.extend(crate::params::template_keys(text).map_err(parse_err)?);
    }
    Ok(keys)
}

/// Validate structural constraints on a plan.
///
/// Checks:
/// - the plan has a name and at least one phase, each with at least one step
/// - phase names and step IDs (cleanups included) are unique
/// - every referenced key is seeded, or produced by an earlier phase, or by an
///   earlier step of the same sequential phase
/// - no key is produced twice
/// - at most one always-run phase, and it is last
/// - readiness intervals and timeouts are positive
pub fn validate_plan(plan: &PhasePlan, seeded: &HashSet<String>) -> Result<(), PlanError> {
    if plan.name.trim().is_empty() {
        return Err(PlanError::Validation("plan name must not be empty".to_string()));
    }
    if plan.phases.is_empty() {
        return Err(PlanError::Validation(
            "plan must have at least one phase".to_string(),
        ));
    }

    let mut phase_names = HashSet::new();
    let mut step_ids = HashSet::new();
    for phase in &plan.phases {
        if phase.name.trim().is_empty() {
            return Err(PlanError::Validation("phase name must not be empty".to_string()));
        }
        if !phase_names.insert(phase.name.as_str()) {
            return Err(PlanError::Validation(format!(
                "duplicate phase name: '{}'",
                phase.name
            )));
        }
        if phase.steps.is_empty() {
            return Err(PlanError::Validation(format!(
                "phase '{}' has no steps",
                phase.name
            )));
        }
        for step in phase.steps.iter().chain(phase.cleanup.iter()) {
            if !step_ids.insert(step.id.as_str()) {
                return Err(PlanError::Validation(format!(
                    "duplicate step ID: '{}'",
                    step.id
                )));
            }
            if let StepConfig::Readiness {
                interval_ms,
                timeout_ms,
                ..
            } = &step.config
            {
                if *interval_ms == 0 || *timeout_ms == 0 {
                    return Err(PlanError::Validation(format!(
                        "readiness step '{}' needs a positive interval and timeout",
                        step.id
                    )));
                }
            }
        }
    }

    let always_run: Vec<usize> = plan
        .phases
        .iter()
        .enumerate()
        .filter(|(_, p)| p.always_run)
        .map(|(i, _)| i)
        .collect();
    match always_run.as_slice() {
        [] => {}
        [idx] if *idx == plan.phases.len() - 1 => {}
        [_] => {
            return Err(PlanError::Validation(
                "the always-run phase must be the last phase".to_string(),
            ));
        }
        _ => {
            return Err(PlanError::Validation(
                "a plan may have at most one always-run phase".to_string(),
            ));
        }
    }

    if let Some(phase) = plan.phases.iter().find(|p| p.always_run && !p.cleanup.is_empty()) {
        return Err(PlanError::Validation(format!(
            "always-run phase '{}' cannot have a cleanup hook",
            phase.name
        )));
    }

    // Key producer map doubles as the write-once check.
    let mut available: HashSet<String> = seeded.clone();
    let mut producers: HashMap<String, String> = HashMap::new();

    for phase in &plan.phases {
        let mut produced_here: Vec<String> = Vec::new();

        for step in &phase.steps {
            for key in referenced_keys(step)? {
                let same_phase_ok = !phase.forked && produced_here.contains(&key);
                if !available.contains(&key) && !same_phase_ok {
                    return Err(PlanError::UnresolvedReference {
                        phase: phase.name.clone(),
                        step: step.id.clone(),
                        key,
                    });
                }
            }
            for key in step.produced_keys() {
                if seeded.contains(&key) {
                    return Err(PlanError::Validation(format!(
                        "step '{}' writes '{key}', which is seeded before the run",
                        step.id
                    )));
                }
                if let Some(other) = producers.insert(key.clone(), step.id.clone()) {
                    return Err(PlanError::Validation(format!(
                        "key '{key}' is written by both '{other}' and '{}'",
                        step.id
                    )));
                }
                produced_here.push(key);
            }
        }

        for cleanup in &phase.cleanup {
            for key in referenced_keys(cleanup)? {
                if !available.contains(&key) {
                    return Err(PlanError::UnresolvedReference {
                        phase: phase.name.clone(),
                        step: cleanup.id.clone(),
                        key,
                    });
                }
            }
            if !cleanup.produced_keys().is_empty() {
                return Err(PlanError::Validation(format!(
                    "cleanup step '{}' must not write parameters",
                    cleanup.id
                )));
            }
        }

        available.extend(produced_here);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
