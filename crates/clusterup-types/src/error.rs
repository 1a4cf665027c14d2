use thiserror::Error;

/// Errors from parameter store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("parameter '{key}' already written by step '{existing_producer}'")]
    DuplicateKey {
        key: String,
        existing_producer: String,
    },

    #[error("parameter '{0}' has not been recorded")]
    Missing(String),

    #[error("malformed template: {0}")]
    MalformedTemplate(String),
}

/// Errors from topology validation and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("topology must contain exactly one bootstrap node, found {0}")]
    BootstrapCount(usize),

    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("test joiner '{joiner}' is declared before non-joiner '{node}'")]
    JoinerOrdering { joiner: String, node: String },

    #[error("node '{0}' not in topology")]
    UnknownNode(String),

    #[error("no port block available for node index {0}")]
    PortOverflow(usize),

    /// Connection strings requested before the bootstrap identity was recorded.
    #[error("bootstrap identity for '{node}' not recorded yet: {source}")]
    BootstrapIdentityMissing {
        node: String,
        #[source]
        source: ParamError,
    },
}

/// Eagerly detected configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}
