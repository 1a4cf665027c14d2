//! The subnet bring-up plan (`cup bringup`).
//!
//! ```text
//! deploy-contracts -> update-config -> create-subnet -> register-subnet
//!   -> [create-wallets] -> join-subnet -> start-monitoring-<svc>...
//!   -> start-bootstrap -> [start-peers] -> verify
//! ```

use clusterup_types::config::{ClusterConfig, NetworkKind};
use clusterup_types::error::ConfigError;
use clusterup_types::parameter::keys;
use clusterup_types::plan::{
    CommandStep, ConfigField, ParamValue, PhaseDefinition, PhasePlan, ReadinessCondition, StepConfig,
    StepDefinition,
};
use clusterup_types::topology::{NodeRole, NodeSpec};
use secrecy::SecretString;

use crate::extract::rules;
use crate::topology::ClusterTopology;

use super::{
    StatePaths, bootstrap_steps, display, node_start, node_stop, peer_params, readiness,
    tool_step,
};

pub const PLAN_NAME: &str = "bringup";

/// Build the bring-up plan for `config`.
///
/// Runs the preflight checks first, so a missing credential fails here and
/// not halfway through a deployment.
pub fn build_bringup_plan(
    config: &ClusterConfig,
    paths: &StatePaths,
    auth_token: Option<&SecretString>,
) -> Result<PhasePlan, ConfigError> {
    super::preflight::check(config, auth_token)?;
    let topology = ClusterTopology::new(config.nodes.clone())?;
    if let Some(joiner) = topology.with_role(NodeRole::TestJoiner).next() {
        return Err(ConfigError::Invalid(format!(
            "node '{}' is a test-joiner; test joiners belong to sync-test",
            joiner.name
        )));
    }

    let mut phases = vec![
        deploy_contracts(config),
        update_parent_config(config, paths),
        create_subnet(config),
        register_subnet(config, paths, &topology)?,
    ];

    let wallets: Vec<&NodeSpec> = topology
        .nodes()
        .iter()
        .filter(|n| n.wallet_address.is_none())
        .collect();
    if !wallets.is_empty() {
        phases.push(create_wallets(config, &wallets));
    }
    phases.push(join_subnet(config, &topology));

    for service in &config.monitoring {
        phases.push(start_monitoring(config, service));
    }

    phases.push(start_bootstrap(config, paths, &topology)?);
    if let Some(peers) = start_peers(config, paths, &topology)? {
        phases.push(peers);
    }
    phases.push(verify(config, &topology)?);

    tracing::debug!(phases = phases.len(), nodes = topology.nodes().len(), "bring-up plan built");
    Ok(PhasePlan {
        name: PLAN_NAME.to_string(),
        description: Some(format!(
            "bring up subnet on {} with {} validators",
            config.parent.id,
            topology.nodes().len()
        )),
        phases,
    })
}

fn deploy_contracts(config: &ClusterConfig) -> PhaseDefinition {
    let deploy = tool_step(&config.tools.deployer, &[])
        .param("NETWORK", ParamValue::literal(&config.parent.network_name))
        .param("RPC_URL", ParamValue::literal(&config.parent.rpc_url))
        .extract(rules::gateway())
        .extract(rules::registry());
    PhaseDefinition::new(
        "deploy-contracts",
        vec![StepDefinition::new("deploy", StepConfig::Command(deploy))],
    )
}

fn update_parent_config(config: &ClusterConfig, paths: &StatePaths) -> PhaseDefinition {
    let step = StepDefinition::new(
        "write-parent-entry",
        StepConfig::UpdateConfig {
            path: display(&paths.ipc_config_path),
            subnet: config.parent.id.clone(),
            fields: vec![
                field("network_type", ParamValue::literal(&config.parent.network_type)),
                field("provider_http", ParamValue::literal(&config.parent.rpc_url)),
                field("gateway_addr", ParamValue::key(keys::GATEWAY_ADDRESS)),
                field("registry_addr", ParamValue::key(keys::REGISTRY_ADDRESS)),
            ],
            auth_token: true,
            create_if_missing: true,
        },
    );
    PhaseDefinition::new("update-config", vec![step])
}

fn create_subnet(config: &ClusterConfig) -> PhaseDefinition {
    let subnet = &config.subnet;
    let mut create = tool_step(&config.tools.registry, &["subnet", "create"])
        .param("from", ParamValue::literal(&config.parent.creator_address))
        .param("parent", ParamValue::literal(&config.parent.id))
        .param("min-validators", ParamValue::literal(subnet.min_validators.to_string()))
        .param("min-validator-stake", ParamValue::literal(&subnet.min_validator_stake))
        .param(
            "bottomup-check-period",
            ParamValue::literal(subnet.bottomup_check_period.to_string()),
        )
        .param("permission-mode", ParamValue::literal(&subnet.permission_mode));
    create = match (&config.network, &config.parent.supply_source) {
        (NetworkKind::Local, None) => {
            create.param("supply-source-kind", ParamValue::literal("native"))
        }
        (_, supply) => create
            .param("supply-source-kind", ParamValue::literal("erc20"))
            .param(
                "supply-source-address",
                ParamValue::literal(supply.clone().unwrap_or_default()),
            ),
    };
    let create = create.extract(rules::subnet_id());
    PhaseDefinition::new(
        "create-subnet",
        vec![StepDefinition::new("create", StepConfig::Command(create))],
    )
}

fn register_subnet(
    config: &ClusterConfig,
    paths: &StatePaths,
    topology: &ClusterTopology,
) -> Result<PhaseDefinition, ConfigError> {
    let api = topology.ports(&topology.bootstrap().name)?.api;
    let step = StepDefinition::new(
        "write-subnet-entry",
        StepConfig::UpdateConfig {
            path: display(&paths.ipc_config_path),
            subnet: format!("{{{{ params.{} }}}}", keys::SUBNET_ID),
            fields: vec![
                field("network_type", ParamValue::literal(&config.parent.network_type)),
                field(
                    "provider_http",
                    ParamValue::literal(format!("http://{}:{api}", config.host)),
                ),
                field("gateway_addr", ParamValue::literal(&config.subnet.child_gateway_addr)),
                field("registry_addr", ParamValue::literal(&config.subnet.child_registry_addr)),
            ],
            auth_token: true,
            create_if_missing: true,
        },
    );
    Ok(PhaseDefinition::new("register-subnet", vec![step]))
}

fn create_wallets(config: &ClusterConfig, nodes: &[&NodeSpec]) -> PhaseDefinition {
    let steps = nodes
        .iter()
        .map(|node| {
            let mut rule = rules::wallet_address(keys::wallet_address(&node.name));
            rule.mandatory = true;
            let cmd = tool_step(&config.tools.registry, &["wallet", "new"])
                .param("wallet-type", ParamValue::literal("evm"))
                .extract(rule);
            StepDefinition::new(format!("wallet-{}", node.name), StepConfig::Command(cmd))
        })
        .collect();
    PhaseDefinition::new("create-wallets", steps).forked()
}

fn wallet(node: &NodeSpec) -> ParamValue {
    match &node.wallet_address {
        Some(address) => ParamValue::literal(address),
        None => ParamValue::key(keys::wallet_address(&node.name)),
    }
}

fn join_subnet(config: &ClusterConfig, topology: &ClusterTopology) -> PhaseDefinition {
    let steps = topology
        .nodes()
        .iter()
        .map(|node| {
            let cmd = tool_step(&config.tools.registry, &["subnet", "join"])
                .param("from", wallet(node))
                .param("subnet", ParamValue::key(keys::SUBNET_ID))
                .param("collateral", ParamValue::literal(node.power.to_string()));
            StepDefinition::new(format!("join-{}", node.name), StepConfig::Command(cmd))
        })
        .collect();
    PhaseDefinition::new("join-subnet", steps).forked()
}

fn start_monitoring(config: &ClusterConfig, service: &str) -> PhaseDefinition {
    let tool = &config.tools.monitoring;
    let start = CommandStep::new(tool.program.clone(), tool.start_command(service))
        .style(tool.param_style.clone());
    let stop = CommandStep::new(tool.program.clone(), tool.stop_command(service))
        .style(tool.param_style.clone());
    PhaseDefinition::new(
        format!("start-monitoring-{service}"),
        vec![StepDefinition::new(format!("start-{service}"), StepConfig::Command(start))],
    )
    .with_cleanup(
        StepDefinition::new(format!("stop-{service}"), StepConfig::Command(stop)).best_effort(),
    )
}

/// Parameters every validator in the subnet starts with.
fn subnet_params(config: &ClusterConfig, node: &NodeSpec) -> Vec<(&'static str, ParamValue)> {
    vec![
        ("SUBNET_ID", ParamValue::key(keys::SUBNET_ID)),
        ("PARENT_ENDPOINT", ParamValue::literal(&config.parent.rpc_url)),
        ("PARENT_GATEWAY", ParamValue::key(keys::GATEWAY_ADDRESS)),
        ("PARENT_REGISTRY", ParamValue::key(keys::REGISTRY_ADDRESS)),
        ("VALIDATOR_ADDRESS", wallet(node)),
    ]
}

fn start_bootstrap(
    config: &ClusterConfig,
    paths: &StatePaths,
    topology: &ClusterTopology,
) -> Result<PhaseDefinition, ConfigError> {
    let node = topology.bootstrap();
    let start = node_start(
        &config.tools.node,
        topology,
        node,
        paths,
        subnet_params(config, node),
    )?;
    let mut phase = PhaseDefinition::new("start-bootstrap", bootstrap_steps(topology, start));
    phase = phase.with_cleanup(node_stop(&config.tools.node, &node.name));
    Ok(phase)
}

fn start_peers(
    config: &ClusterConfig,
    paths: &StatePaths,
    topology: &ClusterTopology,
) -> Result<Option<PhaseDefinition>, ConfigError> {
    let peers: Vec<&NodeSpec> = topology.with_role(NodeRole::Peer).collect();
    if peers.is_empty() {
        return Ok(None);
    }

    let mut steps = Vec::with_capacity(peers.len());
    for node in &peers {
        let mut params = subnet_params(config, node);
        params.extend(peer_params());
        let start = node_start(&config.tools.node, topology, node, paths, params)?;
        steps.push(StepDefinition::new(
            format!("start-{}", node.name),
            StepConfig::Command(start),
        ));
    }

    let mut phase = PhaseDefinition::new("start-peers", steps).forked();
    for node in peers.iter().rev() {
        phase = phase.with_cleanup(node_stop(&config.tools.node, &node.name));
    }
    Ok(Some(phase))
}

fn verify(config: &ClusterConfig, topology: &ClusterTopology) -> Result<PhaseDefinition, ConfigError> {
    let mut steps = Vec::with_capacity(topology.nodes().len() * 2);
    for node in topology.nodes() {
        let rpc = topology.rpc_url(&config.host, &node.name)?;
        steps.push(readiness(
            format!("ready-{}", node.name),
            ReadinessCondition::RpcHeight { rpc: rpc.clone() },
            &config.readiness,
        ));
        steps.push(readiness(
            format!("advancing-{}", node.name),
            ReadinessCondition::ChainAdvancing { rpc },
            &config.readiness,
        ));
    }
    Ok(PhaseDefinition::new("verify", steps))
}

fn field(name: &str, value: ParamValue) -> ConfigField {
    ConfigField {
        field: name.to_string(),
        value,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionConfig;
    use crate::event::EventBus;
    use crate::params::ParameterStore;
    use crate::readiness::tests::ScriptedChain;
    use crate::sequencer::testing::ScriptedRunner;
    use crate::sequencer::{PhaseSequencer, StepRunner, validate_plan};
    use clusterup_types::plan::{FailureKind, PhaseStatus, RunStatus};
    use std::collections::HashSet;
    use std::sync::Arc;

    const DEPLOY_LOG: &str = r#"
Compiling 112 files with 0.8.23
Deployed contracts:
{
  "Gateway": "0x1aEeb1E2d6b2bD4C4bA5fbd1cE1E1f3C3f2f4A11",
  "SubnetRegistry": "0x2bFfC19a37A6d05A6aa4F2B6a1b0F0fC7d9e8B22"
}
"#;

    const BOOTSTRAP_LOG: &str = r#"
Starting validator-0
CometBFT node ID:
  8a1b2c3d4e5f60718293a4b5c6d7e8f901234567
IPLD Resolver Multiaddress:
  /ip4/172.30.0.4/tcp/26655/p2p/16Uiu2HAmBootstrapPeer
"#;

    fn paths(dir: &std::path::Path) -> StatePaths {
        StatePaths::new(dir, dir.join("config.toml"))
    }

    fn phase_names(plan: &PhasePlan) -> Vec<&str> {
        plan.phases.iter().map(|p| p.name.as_str()).collect()
    }

    fn happy_runner() -> ScriptedRunner {
        ScriptedRunner::new()
            .respond("deploy-stack", 0, DEPLOY_LOG)
            .respond("subnet create", 0, "created subnet actor with id: /r1/abc")
            .respond("wallet new", 0, "Ethereum address: 0x5aBcDeF0123456789aBcDeF0123456789aBcDeF0")
            .respond("child-validator -e", 0, BOOTSTRAP_LOG)
    }

    fn advancing_chain() -> ScriptedChain {
        ScriptedChain::new((1..=64).map(Ok).collect())
    }

    #[test]
    fn default_plan_phase_order() {
        let dir = tempfile::tempdir().unwrap();
        let plan = build_bringup_plan(&ClusterConfig::default(), &paths(dir.path()), None).unwrap();
        assert_eq!(
            phase_names(&plan),
            vec![
                "deploy-contracts",
                "update-config",
                "create-subnet",
                "register-subnet",
                "create-wallets",
                "join-subnet",
                "start-monitoring-prometheus",
                "start-monitoring-loki",
                "start-monitoring-grafana",
                "start-bootstrap",
                "start-peers",
                "verify",
            ]
        );
        validate_plan(&plan, &HashSet::new()).unwrap();

        let peers = &plan.phases[10];
        assert!(peers.forked);
        let cleanup_ids: Vec<&str> = peers.cleanup.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(cleanup_ids, vec!["stop-validator-2", "stop-validator-1"]);
    }

    #[test]
    fn configured_wallets_skip_wallet_creation() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClusterConfig::default();
        for (i, node) in config.nodes.iter_mut().enumerate() {
            node.wallet_address = Some(format!("0x{i:040}"));
        }
        let plan = build_bringup_plan(&config, &paths(dir.path()), None).unwrap();
        assert!(!phase_names(&plan).contains(&"create-wallets"));
        validate_plan(&plan, &HashSet::new()).unwrap();
    }

    #[test]
    fn single_node_cluster_has_no_peer_phase() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClusterConfig::default();
        config.nodes.truncate(1);
        let plan = build_bringup_plan(&config, &paths(dir.path()), None).unwrap();
        assert!(!phase_names(&plan).contains(&"start-peers"));
        validate_plan(&plan, &HashSet::new()).unwrap();
    }

    #[test]
    fn preflight_runs_before_planning() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClusterConfig::default();
        config.network = NetworkKind::Testnet;
        let err = build_bringup_plan(&config, &paths(dir.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn invalid_topology_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClusterConfig::default();
        config.nodes[0].role = NodeRole::Peer;
        let err = build_bringup_plan(&config, &paths(dir.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Topology(_)));

        let mut config = ClusterConfig::default();
        config.nodes[2].role = NodeRole::TestJoiner;
        assert!(matches!(
            build_bringup_plan(&config, &paths(dir.path()), None),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn full_bringup_wires_identities_through_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let plan = build_bringup_plan(&ClusterConfig::default(), &paths, None).unwrap();

        let runner = happy_runner();
        let calls = runner.calls();
        let steps = StepRunner::new(Arc::new(runner), Arc::new(advancing_chain()));
        let sequencer = PhaseSequencer::new(steps, EventBus::default());
        let report = sequencer.run(&plan, ParameterStore::new()).await.unwrap();

        assert_eq!(report.status, RunStatus::Succeeded, "{:?}", report.failure);
        assert_eq!(report.param(keys::SUBNET_ID), Some("/r1/abc"));
        assert_eq!(
            report.param(keys::GATEWAY_ADDRESS),
            Some("0x1aEeb1E2d6b2bD4C4bA5fbd1cE1E1f3C3f2f4A11")
        );
        assert_eq!(
            report.param(keys::BOOTSTRAPS),
            Some("8a1b2c3d4e5f60718293a4b5c6d7e8f901234567@validator-0:26656")
        );
        assert_eq!(
            report.param(keys::RESOLVER_BOOTSTRAPS),
            Some("/dns/validator-0/tcp/26655/p2p/16Uiu2HAmBootstrapPeer")
        );

        // peers dial the bootstrap identity recorded earlier in the run
        let calls = calls.lock().unwrap();
        let peer = calls
            .iter()
            .find(|c| c.contains("NODE_NAME=validator-1") && c.contains("child-validator -e"))
            .unwrap();
        assert!(peer.contains(
            "BOOTSTRAPS=8a1b2c3d4e5f60718293a4b5c6d7e8f901234567@validator-0:26656"
        ));
        assert!(peer.contains("CMT_P2P_HOST_PORT=26756"));

        // parent and child entries both written
        let doc = ConnectionConfig::load(&paths.ipc_config_path).await.unwrap();
        assert_eq!(
            doc.subnet_field("/r31337", "gateway_addr"),
            Some("0x1aEeb1E2d6b2bD4C4bA5fbd1cE1E1f3C3f2f4A11")
        );
        assert_eq!(
            doc.subnet_field("/r1/abc", "provider_http"),
            Some("http://127.0.0.1:8545")
        );
    }

    #[tokio::test]
    async fn three_phase_bringup_records_subnet_id() {
        let dir = tempfile::tempdir().unwrap();
        let full = build_bringup_plan(&ClusterConfig::default(), &paths(dir.path()), None).unwrap();
        let keep = ["deploy-contracts", "create-subnet", "start-bootstrap"];
        let plan = PhasePlan {
            name: "three-phase".to_string(),
            description: None,
            phases: full
                .phases
                .into_iter()
                .filter(|p| keep.contains(&p.name.as_str()))
                .map(|mut p| {
                    // the bootstrap's wallet comes from a phase this cut drops
                    if p.name == "start-bootstrap" {
                        for step in &mut p.steps {
                            if let StepConfig::Command(cmd) = &mut step.config {
                                cmd.params.retain(|b| b.name != "VALIDATOR_ADDRESS");
                            }
                        }
                    }
                    p
                })
                .collect(),
        };

        let steps = StepRunner::new(Arc::new(happy_runner()), Arc::new(ScriptedChain::fixed(5)));
        let report = PhaseSequencer::new(steps, EventBus::default())
            .run(&plan, ParameterStore::new())
            .await
            .unwrap();

        assert!(report.succeeded(), "{:?}", report.failure);
        assert_eq!(report.param(keys::SUBNET_ID), Some("/r1/abc"));
    }

    #[tokio::test]
    async fn bootstrap_failure_tears_down_monitoring_in_reverse() {
        let dir = tempfile::tempdir().unwrap();
        let plan = build_bringup_plan(&ClusterConfig::default(), &paths(dir.path()), None).unwrap();

        // listed first so it wins over the generic node-start rule
        let runner = ScriptedRunner::new()
            .respond("NODE_ROLE=bootstrap", 1, "Error: image not found")
            .respond("deploy-stack", 0, DEPLOY_LOG)
            .respond("subnet create", 0, "created subnet actor with id: /r1/abc")
            .respond("wallet new", 0, "Ethereum address: 0x5aBcDeF0123456789aBcDeF0123456789aBcDeF0");
        let calls = runner.calls();
        let steps = StepRunner::new(Arc::new(runner), Arc::new(advancing_chain()));
        let report = PhaseSequencer::new(steps, EventBus::default())
            .run(&plan, ParameterStore::new())
            .await
            .unwrap();

        assert_ne!(report.exit_code(), 0);
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.phase, "start-bootstrap");
        assert_eq!(failure.kind, FailureKind::ExternalCommand);
        assert_eq!(failure.output.as_deref(), Some("Error: image not found"));
        assert_eq!(report.phase("start-peers").unwrap().status, PhaseStatus::Skipped);
        assert_eq!(report.phase("verify").unwrap().status, PhaseStatus::Skipped);

        let cleaned: Vec<&str> = report.cleanups.iter().map(|c| c.step_id.as_str()).collect();
        assert_eq!(
            cleaned,
            vec!["stop-validator-0", "stop-grafana", "stop-loki", "stop-prometheus"]
        );

        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.contains("NODE_NAME=validator-1")));
        let stops = calls.iter().filter(|c| c.contains(" rm -sf ")).count();
        assert_eq!(stops, 3);
    }
}
