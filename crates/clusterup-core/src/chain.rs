//! Chain query port.
//!
//! Height and header-hash lookups against a node's CometBFT RPC endpoint,
//! consumed by readiness probes and the trust parameter resolver.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Connection refused, reset, or timed out. Expected while a node boots.
    #[error("endpoint {rpc} unreachable: {reason}")]
    Unreachable { rpc: String, reason: String },

    /// The endpoint answered with something that does not parse.
    #[error("malformed response from {rpc}: {reason}")]
    Malformed { rpc: String, reason: String },

    /// The node has no header at the requested height yet.
    #[error("no block at height {height} on {rpc}")]
    HeightUnavailable { rpc: String, height: u64 },
}

impl ChainError {
    /// Whether a later attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChainError::Unreachable { .. } | ChainError::HeightUnavailable { .. }
        )
    }
}

/// Read-only queries against a running node.
pub trait ChainQuery: Send + Sync {
    /// Latest committed block height.
    fn latest_height(
        &self,
        rpc: &str,
    ) -> impl std::future::Future<Output = Result<u64, ChainError>> + Send;

    /// Block ID hash committed by the header at `height`.
    ///
    /// CometBFT headers carry `last_block_id`, so the value identifies block
    /// `height - 1`, the block whose state root that header commits.
    fn committed_hash(
        &self,
        rpc: &str,
        height: u64,
    ) -> impl std::future::Future<Output = Result<String, ChainError>> + Send;
}
