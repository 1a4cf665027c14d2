//! Cluster configuration types.
//!
//! `ClusterConfig` represents the `cluster.toml` that describes the parent
//! chain, the external tools, the node topology, and timing knobs. All fields
//! have defaults that reproduce a three-validator local cluster.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::plan::ParamStyle;
use crate::secret::Redacted;
use crate::topology::{NodeRole, NodeSpec};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Local runs skip the eager credential checks.
    #[serde(default)]
    pub network: NetworkKind,

    #[serde(default)]
    pub parent: ParentConfig,

    #[serde(default)]
    pub subnet: SubnetSettings,

    /// Root for run state and node data directories (default `~/.clusterup`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Persisted connection table (default `<state_dir>/config.toml`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipc_config_path: Option<PathBuf>,

    /// Host that node ports are published on.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub readiness: ReadinessSettings,

    #[serde(default)]
    pub tools: ToolsConfig,

    /// Validators brought up by `bringup`, in start order.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<NodeSpec>,

    /// Auxiliary monitoring services started before the validators.
    #[serde(default = "default_monitoring")]
    pub monitoring: Vec<String>,

    #[serde(default)]
    pub sync_test: SyncTestConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            network: NetworkKind::default(),
            parent: ParentConfig::default(),
            subnet: SubnetSettings::default(),
            state_dir: None,
            ipc_config_path: None,
            host: default_host(),
            readiness: ReadinessSettings::default(),
            tools: ToolsConfig::default(),
            nodes: default_nodes(),
            monitoring: default_monitoring(),
            sync_test: SyncTestConfig::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_nodes() -> Vec<NodeSpec> {
    vec![
        NodeSpec::new("validator-0", NodeRole::Bootstrap),
        NodeSpec::new("validator-1", NodeRole::Peer),
        NodeSpec::new("validator-2", NodeRole::Peer),
    ]
}

fn default_monitoring() -> Vec<String> {
    vec!["prometheus".to_string(), "loki".to_string(), "grafana".to_string()]
}

/// Whether the parent chain is a throwaway local chain or a shared network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    #[default]
    Local,
    Testnet,
}

/// Parent chain connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentConfig {
    /// Parent subnet ID (e.g. "/r314159").
    #[serde(default = "default_parent_id")]
    pub id: String,

    /// Network name handed to the contract deploy tool.
    #[serde(default = "default_parent_network")]
    pub network_name: String,

    /// Parent chain Ethereum RPC endpoint.
    #[serde(default = "default_parent_rpc")]
    pub rpc_url: String,

    /// Connection-table network type.
    #[serde(default = "default_network_type")]
    pub network_type: String,

    /// ERC20 supply source for the subnet (required for non-local runs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_source: Option<String>,

    /// Parent RPC auth token (falls back to `CLUSTERUP_AUTH_TOKEN`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<Redacted>,

    /// Wallet address that creates the subnet.
    #[serde(default = "default_creator")]
    pub creator_address: String,
}

impl Default for ParentConfig {
    fn default() -> Self {
        Self {
            id: default_parent_id(),
            network_name: default_parent_network(),
            rpc_url: default_parent_rpc(),
            network_type: default_network_type(),
            supply_source: None,
            auth_token: None,
            creator_address: default_creator(),
        }
    }
}

fn default_parent_id() -> String {
    "/r31337".to_string()
}

fn default_parent_network() -> String {
    "localnet".to_string()
}

fn default_parent_rpc() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_network_type() -> String {
    "fevm".to_string()
}

fn default_creator() -> String {
    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string()
}

/// Subnet creation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetSettings {
    #[serde(default = "default_min_validators")]
    pub min_validators: u64,
    #[serde(default = "default_min_stake")]
    pub min_validator_stake: String,
    #[serde(default = "default_checkpoint_period")]
    pub bottomup_check_period: u64,
    #[serde(default = "default_permission_mode")]
    pub permission_mode: String,
    /// Gateway address inside the child subnet.
    #[serde(default = "default_child_gateway")]
    pub child_gateway_addr: String,
    /// Registry address inside the child subnet.
    #[serde(default = "default_child_registry")]
    pub child_registry_addr: String,
}

impl Default for SubnetSettings {
    fn default() -> Self {
        Self {
            min_validators: default_min_validators(),
            min_validator_stake: default_min_stake(),
            bottomup_check_period: default_checkpoint_period(),
            permission_mode: default_permission_mode(),
            child_gateway_addr: default_child_gateway(),
            child_registry_addr: default_child_registry(),
        }
    }
}

fn default_min_validators() -> u64 {
    1
}

fn default_min_stake() -> String {
    "1".to_string()
}

fn default_checkpoint_period() -> u64 {
    30
}

fn default_permission_mode() -> String {
    "collateral".to_string()
}

fn default_child_gateway() -> String {
    "0x77aa40b105843728088c0132e43fc44348881da8".to_string()
}

fn default_child_registry() -> String {
    "0x74539671a1d2f1c8f200826baba665179f53a1b7".to_string()
}

/// Poll timing used by readiness gates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReadinessSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            timeout_ms: default_poll_timeout_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_poll_timeout_ms() -> u64 {
    120_000
}

/// Sync/snapshot test settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTestConfig {
    /// Nodes in start order; must end with the test joiner(s).
    #[serde(default = "default_sync_nodes")]
    pub nodes: Vec<NodeSpec>,
    /// Blocks subtracted from the latest height to pick the trust height.
    #[serde(default = "default_trust_window")]
    pub trust_window: u64,
    /// Settle period before polling for the first snapshot.
    #[serde(default = "default_snapshot_wait_ms")]
    pub snapshot_wait_ms: u64,
    /// Blocks retained by pruning nodes.
    #[serde(default = "default_prune_keep_recent")]
    pub prune_keep_recent: u64,
}

impl Default for SyncTestConfig {
    fn default() -> Self {
        Self {
            nodes: default_sync_nodes(),
            trust_window: default_trust_window(),
            snapshot_wait_ms: default_snapshot_wait_ms(),
            prune_keep_recent: default_prune_keep_recent(),
        }
    }
}

fn default_sync_nodes() -> Vec<NodeSpec> {
    let mut snapshotter = NodeSpec::new("node-2", NodeRole::Peer);
    snapshotter.snapshots = true;
    vec![
        NodeSpec::new("node-1", NodeRole::Bootstrap),
        snapshotter,
        NodeSpec::new("node-3", NodeRole::TestJoiner),
    ]
}

fn default_trust_window() -> u64 {
    30
}

fn default_snapshot_wait_ms() -> u64 {
    15_000
}

fn default_prune_keep_recent() -> u64 {
    10
}

/// External tool invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_deployer")]
    pub deployer: ToolConfig,
    #[serde(default = "default_registry")]
    pub registry: ToolConfig,
    #[serde(default = "default_node_tool")]
    pub node: LifecycleTool,
    #[serde(default = "default_monitoring_tool")]
    pub monitoring: LifecycleTool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            deployer: default_deployer(),
            registry: default_registry(),
            node: default_node_tool(),
            monitoring: default_monitoring_tool(),
        }
    }
}

fn default_deployer() -> ToolConfig {
    ToolConfig {
        program: "make".to_string(),
        args: vec!["-C".into(), "contracts".into(), "deploy-stack".into()],
        param_style: ParamStyle::Env,
    }
}

fn default_registry() -> ToolConfig {
    ToolConfig {
        program: "ipc-cli".to_string(),
        args: Vec::new(),
        param_style: ParamStyle::Flag,
    }
}

fn default_node_tool() -> LifecycleTool {
    LifecycleTool {
        program: "cargo".to_string(),
        args: vec![
            "make".into(),
            "--makefile".into(),
            "infra/fendermint/Makefile.toml".into(),
        ],
        param_style: ParamStyle::KeyValue {
            flag: "-e".to_string(),
        },
        start_args: vec!["child-validator".into()],
        stop_args: vec!["child-validator-down".into()],
    }
}

fn default_monitoring_tool() -> LifecycleTool {
    LifecycleTool {
        program: "docker".to_string(),
        args: vec![
            "compose".into(),
            "-f".into(),
            "infra/monitoring/docker-compose.yml".into(),
        ],
        param_style: ParamStyle::Env,
        start_args: vec!["up".into(), "-d".into(), "{name}".into()],
        stop_args: vec!["rm".into(), "-sf".into(), "{name}".into()],
    }
}

/// A one-shot command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub param_style: ParamStyle,
}

/// A supervisor that starts and stops named instances.
///
/// `{name}` inside `start_args`/`stop_args` is replaced by the instance name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleTool {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub param_style: ParamStyle,
    pub start_args: Vec<String>,
    pub stop_args: Vec<String>,
}

impl LifecycleTool {
    /// Full argument list to start `name`.
    pub fn start_command(&self, name: &str) -> Vec<String> {
        self.with_name(&self.start_args, name)
    }

    /// Full argument list to stop `name`.
    pub fn stop_command(&self, name: &str) -> Vec<String> {
        self.with_name(&self.stop_args, name)
    }

    fn with_name(&self, tail: &[String], name: &str) -> Vec<String> {
        self.args
            .iter()
            .chain(tail.iter())
            .map(|a| a.replace("{name}", name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ClusterConfig::default();
        assert_eq!(config.network, NetworkKind::Local);
        assert_eq!(config.nodes.len(), 3);
        assert_eq!(config.nodes[0].role, NodeRole::Bootstrap);
        assert_eq!(config.monitoring, vec!["prometheus", "loki", "grafana"]);
        assert_eq!(config.sync_test.trust_window, 30);
        assert_eq!(config.sync_test.snapshot_wait_ms, 15_000);
        assert_eq!(config.readiness.interval_ms, 2_000);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: ClusterConfig = toml::from_str("").unwrap();
        assert_eq!(config.parent.id, "/r31337");
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.parent.auth_token.is_none());
        assert_eq!(config.sync_test.nodes.len(), 3);
        assert!(config.sync_test.nodes[1].snapshots);
    }

    #[test]
    fn toml_with_values() {
        let toml_str = r#"
network = "testnet"
monitoring = ["prometheus"]

[parent]
id = "/r314159"
rpc_url = "https://api.calibration.node.glif.io/rpc/v1"
supply_source = "0xabc"
auth_token = "secret-token"

[readiness]
interval_ms = 500

[[nodes]]
name = "v0"
role = "bootstrap"
wallet_address = "0x01"
power = 10

[[nodes]]
name = "v1"
role = "peer"
"#;
        let config: ClusterConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.network, NetworkKind::Testnet);
        assert_eq!(config.parent.id, "/r314159");
        assert_eq!(config.parent.supply_source.as_deref(), Some("0xabc"));
        assert_eq!(
            config.parent.auth_token.as_ref().map(|t| t.expose()),
            Some("secret-token")
        );
        assert_eq!(config.readiness.interval_ms, 500);
        assert_eq!(config.readiness.timeout_ms, 120_000);
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.nodes[0].power, 10);
        assert_eq!(config.monitoring.len(), 1);
    }

    #[test]
    fn lifecycle_tool_substitutes_name() {
        let tool = ToolsConfig::default().monitoring;
        let start = tool.start_command("loki");
        assert_eq!(start.last().map(String::as_str), Some("loki"));
        assert!(start.contains(&"up".to_string()));
        let stop = tool.stop_command("loki");
        assert!(stop.contains(&"-sf".to_string()));
    }

    #[test]
    fn auth_token_debug_is_redacted() {
        let mut config = ClusterConfig::default();
        config.parent.auth_token = Some(Redacted::new("very-secret"));
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
    }
}
