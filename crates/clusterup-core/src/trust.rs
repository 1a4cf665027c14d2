//! State-sync trust parameters.
//!
//! A joining node needs a trusted `(height, hash)` pair to verify the
//! snapshot it restores. The resolver reads the current height of a running
//! node, steps back by the trust window, and fetches the hash committed by the
//! following header.

use thiserror::Error;

use crate::chain::{ChainError, ChainQuery};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    /// The chain is not yet taller than the window. Never clamped.
    #[error(
        "trust height would be non-positive: current height {current_height} does not exceed trust window {window}"
    )]
    NonPositiveTrustHeight { current_height: u64, window: u64 },

    #[error("trust query failed: {0}")]
    Query(#[from] ChainError),
}

/// Trust height and the hash of the block at that height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustParams {
    pub height: u64,
    pub hash: String,
    /// Height the hash was queried at (`height + 1`).
    pub query_height: u64,
}

/// `current_height - window`, or an error if that is not positive.
pub fn trust_height(current_height: u64, window: u64) -> Result<u64, TrustError> {
    match current_height.checked_sub(window) {
        Some(h) if h > 0 => Ok(h),
        _ => Err(TrustError::NonPositiveTrustHeight {
            current_height,
            window,
        }),
    }
}

/// Computes trust parameters against a running node.
pub struct TrustParameterResolver<'a, Q> {
    query: &'a Q,
    window: u64,
}

impl<'a, Q: ChainQuery> TrustParameterResolver<'a, Q> {
    pub fn new(query: &'a Q, window: u64) -> Self {
        Self { query, window }
    }

    /// Resolve using the node's current height.
    pub async fn resolve(&self, rpc: &str) -> Result<TrustParams, TrustError> {
        let current = self.query.latest_height(rpc).await?;
        self.resolve_at(rpc, current).await
    }

    /// Resolve against a known current height.
    pub async fn resolve_at(&self, rpc: &str, current_height: u64) -> Result<TrustParams, TrustError> {
        let height = trust_height(current_height, self.window)?;
        let query_height = height + 1;
        let hash = self.query.committed_hash(rpc, query_height).await?;
        tracing::info!(
            rpc,
            current_height,
            trust_height = height,
            query_height,
            "resolved trust parameters"
        );
        Ok(TrustParams {
            height,
            hash,
            query_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::tests::ScriptedChain;

    #[tokio::test]
    async fn window_is_subtracted_and_next_header_queried() {
        let chain = ScriptedChain::fixed(1000);
        let params = TrustParameterResolver::new(&chain, 30)
            .resolve("http://127.0.0.1:26757")
            .await
            .unwrap();
        assert_eq!(params.height, 970);
        assert_eq!(params.query_height, 971);
        assert_eq!(params.hash, "HASH971");
        assert_eq!(*chain.hash_queries.lock().unwrap(), vec![971]);
    }

    #[tokio::test]
    async fn short_chain_is_an_error_not_clamped() {
        let chain = ScriptedChain::fixed(20);
        let err = TrustParameterResolver::new(&chain, 30)
            .resolve("http://x")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TrustError::NonPositiveTrustHeight {
                current_height: 20,
                window: 30
            }
        );
        assert!(chain.hash_queries.lock().unwrap().is_empty());
    }

    #[test]
    fn height_equal_to_window_is_non_positive() {
        assert!(trust_height(30, 30).is_err());
        assert_eq!(trust_height(31, 30).unwrap(), 1);
    }

    #[tokio::test]
    async fn query_failure_propagates() {
        let chain = ScriptedChain::new(vec![Err(crate::readiness::tests::refused())]);
        let err = TrustParameterResolver::new(&chain, 30)
            .resolve("http://x")
            .await
            .unwrap_err();
        assert!(matches!(err, TrustError::Query(ChainError::Unreachable { .. })));
    }
}
