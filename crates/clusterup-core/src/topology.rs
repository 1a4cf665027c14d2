//! Cluster topology: node roles, port plan, and bootstrap connection strings.

use std::collections::{BTreeMap, HashSet};

use clusterup_types::error::TopologyError;
use clusterup_types::parameter::keys;
use clusterup_types::topology::{NodeRole, NodeSpec, PortAssignment};

use crate::params::ParameterStore;

/// Connection strings every non-bootstrap node needs to dial the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapStrings {
    /// CometBFT persistent peer: `<node_id>@<host>:<p2p port>`.
    pub bootstraps: String,
    /// Resolver multiaddress: `/dns/<host>/tcp/<resolver port>/p2p/<peer_id>`.
    pub resolver_bootstraps: String,
}

/// Validated, ordered set of nodes.
///
/// Construction enforces exactly one bootstrap node, unique names, and that
/// every test joiner comes after all non-joiners.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    nodes: Vec<NodeSpec>,
}

impl ClusterTopology {
    pub fn new(nodes: Vec<NodeSpec>) -> Result<Self, TopologyError> {
        let bootstraps = nodes
            .iter()
            .filter(|n| n.role == NodeRole::Bootstrap)
            .count();
        if bootstraps != 1 {
            return Err(TopologyError::BootstrapCount(bootstraps));
        }

        let mut seen = HashSet::new();
        for node in &nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(TopologyError::DuplicateNode(node.name.clone()));
            }
        }

        let mut first_joiner: Option<&NodeSpec> = None;
        for node in &nodes {
            match (node.role, first_joiner) {
                (NodeRole::TestJoiner, None) => first_joiner = Some(node),
                (NodeRole::TestJoiner, Some(_)) => {}
                (_, Some(joiner)) => {
                    return Err(TopologyError::JoinerOrdering {
                        joiner: joiner.name.clone(),
                        node: node.name.clone(),
                    });
                }
                (_, None) => {}
            }
        }

        if nodes.len() > 1 && PortAssignment::for_index(nodes.len() - 1).is_none() {
            return Err(TopologyError::PortOverflow(nodes.len() - 1));
        }

        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn bootstrap(&self) -> &NodeSpec {
        // construction guarantees exactly one
        &self.nodes[self.bootstrap_index()]
    }

    fn bootstrap_index(&self) -> usize {
        self.nodes
            .iter()
            .position(|n| n.role == NodeRole::Bootstrap)
            .unwrap_or_default()
    }

    /// Nodes with the given role, in declaration order.
    pub fn with_role(&self, role: NodeRole) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter().filter(move |n| n.role == role)
    }

    pub fn node(&self, name: &str) -> Result<&NodeSpec, TopologyError> {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))
    }

    pub fn index_of(&self, name: &str) -> Result<usize, TopologyError> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))
    }

    /// Host ports of `name`, derived from its position.
    pub fn ports(&self, name: &str) -> Result<PortAssignment, TopologyError> {
        let index = self.index_of(name)?;
        PortAssignment::for_index(index).ok_or(TopologyError::PortOverflow(index))
    }

    /// CometBFT RPC URL of `name` as reachable from `host`.
    pub fn rpc_url(&self, host: &str, name: &str) -> Result<String, TopologyError> {
        Ok(format!("http://{host}:{}", self.ports(name)?.rpc))
    }

    /// Per-node environment overlay handed to the node supervisor.
    pub fn env_overlay(&self, name: &str) -> Result<BTreeMap<String, String>, TopologyError> {
        let node = self.node(name)?;
        let ports = self.ports(name)?;
        let mut env = BTreeMap::from([
            ("NODE_NAME".to_string(), node.name.clone()),
            ("NODE_ROLE".to_string(), node.role.to_string()),
            ("CMT_P2P_HOST_PORT".to_string(), ports.p2p.to_string()),
            ("CMT_RPC_HOST_PORT".to_string(), ports.rpc.to_string()),
            ("ETHAPI_HOST_PORT".to_string(), ports.api.to_string()),
            ("RESOLVER_HOST_PORT".to_string(), ports.resolver.to_string()),
            ("METRICS_HOST_PORT".to_string(), ports.metrics.to_string()),
        ]);
        if node.snapshots {
            env.insert("SNAPSHOTS_ENABLED".to_string(), "true".to_string());
        }
        Ok(env)
    }

    /// Bootstrap strings rendered from recorded identities.
    ///
    /// Fails if the bootstrap node's identity has not been recorded yet.
    pub fn bootstrap_strings(&self, store: &ParameterStore) -> Result<BootstrapStrings, TopologyError> {
        let bootstrap = self.bootstrap();
        let missing = |source| TopologyError::BootstrapIdentityMissing {
            node: bootstrap.name.clone(),
            source,
        };
        let node_id = store.require(&keys::node_id(&bootstrap.name)).map_err(missing)?;
        let peer_id = store
            .require(&keys::resolver_peer_id(&bootstrap.name))
            .map_err(missing)?;
        Ok(render_bootstrap(&bootstrap.name, &node_id, &peer_id))
    }

    /// Bootstrap strings as store templates, for plans built ahead of time.
    pub fn bootstrap_templates(&self) -> BootstrapStrings {
        let name = &self.bootstrap().name;
        render_bootstrap(
            name,
            &format!("{{{{ params.{} }}}}", keys::node_id(name)),
            &format!("{{{{ params.{} }}}}", keys::resolver_peer_id(name)),
        )
    }
}

/// Container-internal ports are fixed; only host ports shift per node.
fn render_bootstrap(host: &str, node_id: &str, peer_id: &str) -> BootstrapStrings {
    let base = PortAssignment::BASE;
    BootstrapStrings {
        bootstraps: format!("{node_id}@{host}:{}", base.p2p),
        resolver_bootstraps: format!("/dns/{host}/tcp/{}/p2p/{peer_id}", base.resolver),
    }
}
