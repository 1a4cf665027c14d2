//! Built-in phase plans.
//!
//! The builders turn a `ClusterConfig` into a `PhasePlan` ahead of time. All
//! runtime values (contract addresses, node identities, trust parameters) are
//! wired as store references, so `validate_plan` can prove every read is
//! satisfied by phase ordering before anything runs.

pub mod bringup;
pub mod preflight;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clusterup_types::config::{LifecycleTool, ReadinessSettings, ToolConfig};
use clusterup_types::error::TopologyError;
use clusterup_types::parameter::keys;
use clusterup_types::plan::{
    CommandStep, ParamBinding, ParamValue, ReadinessCondition, StepConfig, StepDefinition,
};
use clusterup_types::topology::NodeSpec;

use crate::extract::rules;
use crate::topology::ClusterTopology;

pub use bringup::build_bringup_plan;
pub use sync_test::build_sync_test_plan;

/// Filesystem locations a plan writes to or polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub state_dir: PathBuf,
    /// Persisted connection table.
    pub ipc_config_path: PathBuf,
}

impl StatePaths {
    pub fn new(state_dir: impl Into<PathBuf>, ipc_config_path: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            ipc_config_path: ipc_config_path.into(),
        }
    }

    /// Data directory owned by one node's lifecycle.
    pub fn node_dir(&self, node: &str) -> PathBuf {
        self.state_dir.join("nodes").join(node)
    }

    /// Where a snapshot-enabled node writes its state snapshots.
    pub fn snapshot_dir(&self, node: &str) -> PathBuf {
        self.node_dir(node).join("snapshots")
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// A command step for a one-shot tool.
fn tool_step(tool: &ToolConfig, tail: &[&str]) -> CommandStep {
    let mut args = tool.args.clone();
    args.extend(tail.iter().map(|a| a.to_string()));
    CommandStep::new(tool.program.clone(), args).style(tool.param_style.clone())
}

/// Start `node` through the node supervisor.
///
/// The topology overlay (name, role, host ports) goes into the child
/// environment; `params` follow the tool's parameter style.
fn node_start(
    tool: &LifecycleTool,
    topology: &ClusterTopology,
    node: &NodeSpec,
    paths: &StatePaths,
    params: Vec<(&str, ParamValue)>,
) -> Result<CommandStep, TopologyError> {
    let mut step = CommandStep::new(tool.program.clone(), tool.start_command(&node.name))
        .style(tool.param_style.clone())
        .param("NODE_DATA_DIR", ParamValue::literal(display(&paths.node_dir(&node.name))));
    for (name, value) in params {
        step = step.param(name, value);
    }
    step.env = literal_env(topology.env_overlay(&node.name)?);
    Ok(step)
}

/// Stop `node`; safe to run whether or not it ever started.
fn node_stop(tool: &LifecycleTool, node: &str) -> StepDefinition {
    let mut step = CommandStep::new(tool.program.clone(), tool.stop_command(node))
        .style(tool.param_style.clone());
    step.env = BTreeMap::from([("NODE_NAME".to_string(), ParamValue::literal(node))]);
    StepDefinition::new(format!("stop-{node}"), StepConfig::Command(step)).best_effort()
}

fn literal_env(env: BTreeMap<String, String>) -> BTreeMap<String, ParamValue> {
    env.into_iter()
        .map(|(k, v)| (k, ParamValue::Literal(v)))
        .collect()
}

fn readiness(
    id: impl Into<String>,
    condition: ReadinessCondition,
    settings: &ReadinessSettings,
) -> StepDefinition {
    StepDefinition::new(
        id,
        StepConfig::Readiness {
            condition,
            interval_ms: settings.interval_ms,
            timeout_ms: settings.timeout_ms,
        },
    )
}

/// Bootstrap identity extraction plus the rendered peer strings.
fn bootstrap_steps(topology: &ClusterTopology, start: CommandStep) -> Vec<StepDefinition> {
    let name = &topology.bootstrap().name;
    let start = start
        .extract(rules::node_id(name))
        .extract(rules::resolver_multiaddr(name))
        .extract(rules::resolver_peer_id(name));
    let templates = topology.bootstrap_templates();
    vec![
        StepDefinition::new(format!("start-{name}"), StepConfig::Command(start)),
        StepDefinition::new(
            "record-bootstraps",
            StepConfig::Record {
                entries: vec![
                    binding(keys::BOOTSTRAPS, ParamValue::template(templates.bootstraps)),
                    binding(
                        keys::RESOLVER_BOOTSTRAPS,
                        ParamValue::template(templates.resolver_bootstraps),
                    ),
                ],
            },
        ),
    ]
}

/// Parameters every non-bootstrap node starts with.
fn peer_params() -> Vec<(&'static str, ParamValue)> {
    vec![
        ("BOOTSTRAPS", ParamValue::key(keys::BOOTSTRAPS)),
        ("RESOLVER_BOOTSTRAPS", ParamValue::key(keys::RESOLVER_BOOTSTRAPS)),
    ]
}

fn binding(name: &str, value: ParamValue) -> ParamBinding {
    ParamBinding {
        name: name.to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_paths_are_per_node() {
        let paths = StatePaths::new("/tmp/cup", "/tmp/cup/config.toml");
        assert_eq!(paths.node_dir("node-2"), PathBuf::from("/tmp/cup/nodes/node-2"));
        assert_eq!(
            paths.snapshot_dir("node-2"),
            PathBuf::from("/tmp/cup/nodes/node-2/snapshots")
        );
        assert_ne!(paths.node_dir("node-1"), paths.node_dir("node-2"));
    }

    #[test]
    fn stop_step_is_best_effort_and_names_the_node() {
        let tool = clusterup_types::config::ToolsConfig::default().node;
        let step = node_stop(&tool, "validator-1");
        assert!(step.best_effort);
        assert_eq!(step.id, "stop-validator-1");
        match step.config {
            StepConfig::Command(cmd) => {
                assert_eq!(cmd.env["NODE_NAME"], ParamValue::literal("validator-1"));
                assert_eq!(cmd.args.last().map(String::as_str), Some("child-validator-down"));
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }
}
