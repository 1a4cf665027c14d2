//! Built-in extraction rules for the identifiers the workflows mine.

use clusterup_types::parameter::keys;
use clusterup_types::plan::{ExtractionKind, ExtractionRule};

pub const NODE_ID_MARKER: &str = "CometBFT node ID:";
pub const RESOLVER_MULTIADDR_MARKER: &str = "IPLD Resolver Multiaddress:";
pub const GATEWAY_MARKER: &str = "\"Gateway\"";
pub const REGISTRY_MARKER: &str = "\"SubnetRegistry\"";
pub const SUBNET_ID_MARKER: &str = "with id:";
pub const WALLET_ADDRESS_MARKER: &str = "Ethereum address:";

/// Names accepted by [`by_name`], for CLI help text.
pub const RULE_NAMES: &[&str] = &[
    "node-id",
    "resolver-multiaddr",
    "resolver-peer-id",
    "gateway",
    "registry",
    "subnet-id",
    "wallet-address",
];

fn rule(key: String, label: &str, marker: &str, kind: ExtractionKind) -> ExtractionRule {
    ExtractionRule {
        key,
        label: label.to_string(),
        marker: marker.to_string(),
        kind,
        strip_p2p_suffix: false,
        mandatory: true,
    }
}

/// CometBFT node ID printed by the node supervisor on start.
pub fn node_id(node: &str) -> ExtractionRule {
    rule(
        keys::node_id(node),
        &format!("{node} CometBFT node id"),
        NODE_ID_MARKER,
        ExtractionKind::NextLine,
    )
}

/// Full resolver multiaddress printed on start.
pub fn resolver_multiaddr(node: &str) -> ExtractionRule {
    rule(
        keys::resolver_multiaddr(node),
        &format!("{node} resolver multiaddress"),
        RESOLVER_MULTIADDR_MARKER,
        ExtractionKind::NextLine,
    )
}

/// Resolver peer ID, the `/p2p/<id>` tail of the multiaddress.
pub fn resolver_peer_id(node: &str) -> ExtractionRule {
    let mut r = rule(
        keys::resolver_peer_id(node),
        &format!("{node} resolver peer id"),
        RESOLVER_MULTIADDR_MARKER,
        ExtractionKind::NextLine,
    );
    r.strip_p2p_suffix = true;
    r
}

/// Gateway contract address from the deploy tool's address table.
pub fn gateway() -> ExtractionRule {
    rule(
        keys::GATEWAY_ADDRESS.to_string(),
        "Gateway address",
        GATEWAY_MARKER,
        ExtractionKind::SameLine,
    )
}

/// SubnetRegistry contract address from the deploy tool's address table.
pub fn registry() -> ExtractionRule {
    rule(
        keys::REGISTRY_ADDRESS.to_string(),
        "SubnetRegistry address",
        REGISTRY_MARKER,
        ExtractionKind::SameLine,
    )
}

/// Subnet ID from "created subnet actor with id: /r.../t...".
pub fn subnet_id() -> ExtractionRule {
    rule(
        keys::SUBNET_ID.to_string(),
        "subnet id",
        SUBNET_ID_MARKER,
        ExtractionKind::SameLine,
    )
}

/// Address of a freshly created wallet. Optional.
pub fn wallet_address(key: impl Into<String>) -> ExtractionRule {
    let mut r = rule(
        key.into(),
        "wallet address",
        WALLET_ADDRESS_MARKER,
        ExtractionKind::SameLine,
    );
    r.mandatory = false;
    r
}

/// Look up a built-in rule by CLI name. Node-scoped rules use `node`.
pub fn by_name(name: &str, node: &str) -> Option<ExtractionRule> {
    match name {
        "node-id" => Some(node_id(node)),
        "resolver-multiaddr" => Some(resolver_multiaddr(node)),
        "resolver-peer-id" => Some(resolver_peer_id(node)),
        "gateway" => Some(gateway()),
        "registry" => Some(registry()),
        "subnet-id" => Some(subnet_id()),
        "wallet-address" => Some(wallet_address("wallet_address")),
        _ => None,
    }
}
