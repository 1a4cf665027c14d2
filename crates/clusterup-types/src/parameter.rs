//! Parameter store entry types and well-known keys.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a parameter value came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Supplied directly by configuration or a plan literal.
    Literal,
    /// Mined from an external command's output.
    Extracted,
    /// Derived by the orchestrator (trust params, rendered peer strings).
    Computed,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Literal => write!(f, "literal"),
            Provenance::Extracted => write!(f, "extracted"),
            Provenance::Computed => write!(f, "computed"),
        }
    }
}

/// A single write-once entry in the parameter store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamEntry {
    pub key: String,
    pub value: String,
    pub provenance: Provenance,
    /// ID of the step that produced the value.
    pub producer: String,
    pub recorded_at: DateTime<Utc>,
}

/// Keys shared between the built-in plans, the topology renderer, and the CLI.
pub mod keys {
    pub const GATEWAY_ADDRESS: &str = "gateway_address";
    pub const REGISTRY_ADDRESS: &str = "registry_address";
    pub const SUBNET_ID: &str = "subnet_id";
    pub const TRUST_HEIGHT: &str = "trust_height";
    pub const TRUST_HASH: &str = "trust_hash";
    pub const BOOTSTRAPS: &str = "bootstraps";
    pub const RESOLVER_BOOTSTRAPS: &str = "resolver_bootstraps";

    /// CometBFT node ID of `node`.
    pub fn node_id(node: &str) -> String {
        format!("{node}.node_id")
    }

    /// Full resolver multiaddress of `node` as printed at startup.
    pub fn resolver_multiaddr(node: &str) -> String {
        format!("{node}.resolver_multiaddr")
    }

    /// Resolver peer ID of `node` (the `/p2p/<id>` tail of its multiaddress).
    pub fn resolver_peer_id(node: &str) -> String {
        format!("{node}.resolver_peer_id")
    }

    /// Wallet address `node` joins the subnet with.
    pub fn wallet_address(node: &str) -> String {
        format!("{node}.wallet_address")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_scoped_keys() {
        assert_eq!(keys::node_id("node-1"), "node-1.node_id");
        assert_eq!(keys::resolver_peer_id("node-1"), "node-1.resolver_peer_id");
        assert_eq!(keys::resolver_multiaddr("v0"), "v0.resolver_multiaddr");
    }

    #[test]
    fn provenance_serializes_snake_case() {
        let json = serde_json::to_string(&Provenance::Extracted).unwrap();
        assert_eq!(json, "\"extracted\"");
        assert_eq!(Provenance::Computed.to_string(), "computed");
    }
}
