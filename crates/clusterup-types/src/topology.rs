//! Node role and port assignment types.
//!
//! A cluster is an ordered list of [`NodeSpec`] entries. Each node's position
//! in that list selects its host ports: node `i` gets the base port plus
//! `i * PORT_STRIDE` for every service, so two nodes on one host never collide.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Distance between the port blocks of consecutive nodes.
pub const PORT_STRIDE: u16 = 100;

/// Default validator power used when joining a subnet.
pub const DEFAULT_POWER: u64 = 1;

/// The part a node plays during bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// First node started; every other node dials its identity.
    Bootstrap,
    /// Regular validator started after the bootstrap node.
    Peer,
    /// Late joiner that recovers state via state-sync.
    TestJoiner,
}

impl NodeRole {
    /// Whether the node needs the bootstrap connection strings to start.
    pub fn needs_bootstrap(&self) -> bool {
        !matches!(self, NodeRole::Bootstrap)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Bootstrap => write!(f, "bootstrap"),
            NodeRole::Peer => write!(f, "peer"),
            NodeRole::TestJoiner => write!(f, "test-joiner"),
        }
    }
}

impl FromStr for NodeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bootstrap" => Ok(NodeRole::Bootstrap),
            "peer" => Ok(NodeRole::Peer),
            "test-joiner" | "test_joiner" | "joiner" => Ok(NodeRole::TestJoiner),
            other => Err(format!("invalid node role: '{other}'")),
        }
    }
}

/// Host ports published by one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAssignment {
    /// CometBFT peer-to-peer port.
    pub p2p: u16,
    /// CometBFT JSON-RPC port.
    pub rpc: u16,
    /// Ethereum JSON-RPC API port.
    pub api: u16,
    /// Content resolver (libp2p) port.
    pub resolver: u16,
    /// Prometheus metrics port.
    pub metrics: u16,
}

impl PortAssignment {
    /// Ports of the node at position 0.
    pub const BASE: PortAssignment = PortAssignment {
        p2p: 26656,
        rpc: 26657,
        api: 8545,
        resolver: 26655,
        metrics: 9184,
    };

    /// Ports for the node at `index` in the topology.
    ///
    /// Returns `None` when the offset would overflow the port range.
    pub fn for_index(index: usize) -> Option<PortAssignment> {
        let offset = u16::try_from(index).ok()?.checked_mul(PORT_STRIDE)?;
        let base = Self::BASE;
        Some(PortAssignment {
            p2p: base.p2p.checked_add(offset)?,
            rpc: base.rpc.checked_add(offset)?,
            api: base.api.checked_add(offset)?,
            resolver: base.resolver.checked_add(offset)?,
            metrics: base.metrics.checked_add(offset)?,
        })
    }
}

/// One node as declared in the cluster configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique node name (e.g. "node-1"); also the container/instance name.
    pub name: String,
    /// Role in the bring-up.
    pub role: NodeRole,
    /// Wallet address used to join the subnet as a validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Collateral/power staked when joining.
    #[serde(default = "default_power")]
    pub power: u64,
    /// Whether the node produces state snapshots.
    #[serde(default)]
    pub snapshots: bool,
}

fn default_power() -> u64 {
    DEFAULT_POWER
}

impl NodeSpec {
    /// Convenience constructor with default power and no wallet.
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            role,
            wallet_address: None,
            power: DEFAULT_POWER,
            snapshots: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_for_first_node_are_base() {
        assert_eq!(PortAssignment::for_index(0), Some(PortAssignment::BASE));
    }

    #[test]
    fn ports_shift_by_stride_per_index() {
        let ports = PortAssignment::for_index(2).unwrap();
        assert_eq!(ports.p2p, 26856);
        assert_eq!(ports.rpc, 26857);
        assert_eq!(ports.api, 8745);
        assert_eq!(ports.resolver, 26855);
        assert_eq!(ports.metrics, 9384);
    }

    #[test]
    fn ports_overflow_is_none() {
        assert!(PortAssignment::for_index(500).is_none());
    }

    #[test]
    fn role_display_and_parse() {
        assert_eq!(NodeRole::TestJoiner.to_string(), "test-joiner");
        assert_eq!("peer".parse::<NodeRole>().unwrap(), NodeRole::Peer);
        assert_eq!("Bootstrap".parse::<NodeRole>().unwrap(), NodeRole::Bootstrap);
        assert!("leader".parse::<NodeRole>().is_err());
    }

    #[test]
    fn node_spec_toml_defaults() {
        let spec: NodeSpec = toml::from_str(
            r#"
name = "node-2"
role = "peer"
"#,
        )
        .unwrap();
        assert_eq!(spec.power, DEFAULT_POWER);
        assert!(!spec.snapshots);
        assert!(spec.wallet_address.is_none());
        assert!(spec.role.needs_bootstrap());
    }
}
