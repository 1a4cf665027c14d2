//! `cup teardown`: stop every configured node and service.
//!
//! Every stop is attempted regardless of earlier failures; stopping a node
//! that is not running is harmless.

use clusterup_core::process::{CommandSpec, ProcessRunner};
use clusterup_infra::TokioProcessRunner;
use clusterup_types::config::LifecycleTool;
use console::style;

use crate::state::AppState;

/// One stop command with a label for output.
struct StopTarget {
    label: String,
    spec: CommandSpec,
}

fn stop_spec(tool: &LifecycleTool, name: &str) -> CommandSpec {
    let mut spec = CommandSpec::new(tool.program.clone(), tool.stop_command(name));
    spec.env.insert("NODE_NAME".to_string(), name.to_string());
    spec
}

/// Nodes in reverse start order, then monitoring services in reverse.
fn targets(state: &AppState) -> Vec<StopTarget> {
    let config = &state.config;
    let mut names: Vec<&str> = config.nodes.iter().map(|n| n.name.as_str()).collect();
    for node in &config.sync_test.nodes {
        if !names.contains(&node.name.as_str()) {
            names.push(node.name.as_str());
        }
    }

    let nodes = names.into_iter().rev().map(|name| StopTarget {
        label: format!("node {name}"),
        spec: stop_spec(&config.tools.node, name),
    });
    let services = config.monitoring.iter().rev().map(|svc| StopTarget {
        label: format!("service {svc}"),
        spec: stop_spec(&config.tools.monitoring, svc),
    });
    nodes.chain(services).collect()
}

pub async fn teardown(state: &AppState, keep_state: bool, json: bool) -> anyhow::Result<i32> {
    let runner = TokioProcessRunner::new();
    let mut results = Vec::new();

    for target in targets(state) {
        let ok = match runner.run(&target.spec).await {
            Ok(out) if out.success() => true,
            Ok(out) => {
                tracing::warn!(stop = %target.label, exit_code = out.exit_code, "stop command failed");
                false
            }
            Err(err) => {
                tracing::warn!(stop = %target.label, error = %err, "stop command could not run");
                false
            }
        };
        if !json {
            let mark = if ok { style("✓").green() } else { style("✗").yellow() };
            println!("  {mark} stopped {}", target.label);
        }
        results.push(serde_json::json!({ "target": target.label, "ok": ok }));
    }

    if !keep_state {
        state.run_state.remove_run_state().await?;
    }

    if json {
        let out = serde_json::json!({
            "stopped": results,
            "state_removed": !keep_state,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !keep_state {
        println!(
            "  {} removed run state under {}",
            style("✓").green(),
            state.paths.state_dir.display()
        );
    }

    // best-effort: teardown itself never fails on a stop error
    Ok(0)
}
