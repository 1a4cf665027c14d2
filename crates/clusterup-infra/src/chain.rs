//! CometBFT JSON-RPC client for the [`ChainQuery`] port.
//!
//! Only two endpoints are used: `/status` for the latest height and
//! `/commit?height=H` for the header at a given height.

use std::time::Duration;

use clusterup_core::chain::{ChainError, ChainQuery};
use serde::Deserialize;

/// Per-request timeout. Readiness polls retry, so this stays short.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
    #[serde(default)]
    data: Option<String>,
}

impl RpcErrorBody {
    fn describe(&self) -> String {
        match &self.data {
            Some(data) => format!("{}: {data}", self.message),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    /// Heights are strings on the wire.
    latest_block_height: String,
}

#[derive(Debug, Deserialize)]
struct CommitResult {
    signed_header: SignedHeader,
}

#[derive(Debug, Deserialize)]
struct SignedHeader {
    header: Header,
}

#[derive(Debug, Deserialize)]
struct Header {
    last_block_id: BlockId,
}

#[derive(Debug, Deserialize)]
struct BlockId {
    hash: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Stateless HTTP client; `rpc` is passed per call.
#[derive(Debug, Clone)]
pub struct CometRpcClient {
    client: reqwest::Client,
}

impl CometRpcClient {
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, rpc: &str, url: String) -> Result<String, ChainError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Unreachable {
                rpc: rpc.to_string(),
                reason: e.to_string(),
            })?;

        // CometBFT answers RPC errors with HTTP 500 and a JSON error body,
        // so the status code alone says nothing.
        response.text().await.map_err(|e| ChainError::Unreachable {
            rpc: rpc.to_string(),
            reason: format!("reading body: {e}"),
        })
    }
}

impl ChainQuery for CometRpcClient {
    async fn latest_height(&self, rpc: &str) -> Result<u64, ChainError> {
        let body = self.get(rpc, format!("{}/status", base(rpc))).await?;
        let height = parse_status(rpc, &body)?;
        tracing::trace!(rpc, height, "queried latest height");
        Ok(height)
    }

    async fn committed_hash(&self, rpc: &str, height: u64) -> Result<String, ChainError> {
        let body = self
            .get(rpc, format!("{}/commit?height={height}", base(rpc)))
            .await?;
        parse_commit(rpc, height, &body)
    }
}

fn base(rpc: &str) -> &str {
    rpc.trim_end_matches('/')
}

fn malformed(rpc: &str, reason: impl Into<String>) -> ChainError {
    ChainError::Malformed {
        rpc: rpc.to_string(),
        reason: reason.into(),
    }
}

fn parse_status(rpc: &str, body: &str) -> Result<u64, ChainError> {
    let envelope: RpcEnvelope<StatusResult> =
        serde_json::from_str(body).map_err(|e| malformed(rpc, e.to_string()))?;
    if let Some(err) = envelope.error {
        return Err(malformed(rpc, err.describe()));
    }
    let status = envelope
        .result
        .ok_or_else(|| malformed(rpc, "status response has no result"))?;
    status
        .sync_info
        .latest_block_height
        .parse()
        .map_err(|_| {
            malformed(
                rpc,
                format!("bad latest_block_height '{}'", status.sync_info.latest_block_height),
            )
        })
}

fn parse_commit(rpc: &str, height: u64, body: &str) -> Result<String, ChainError> {
    let envelope: RpcEnvelope<CommitResult> =
        serde_json::from_str(body).map_err(|e| malformed(rpc, e.to_string()))?;
    if let Some(err) = envelope.error {
        tracing::debug!(rpc, height, error = %err.describe(), "commit not available");
        return Err(ChainError::HeightUnavailable {
            rpc: rpc.to_string(),
            height,
        });
    }
    let hash = envelope
        .result
        .ok_or_else(|| malformed(rpc, "commit response has no result"))?
        .signed_header
        .header
        .last_block_id
        .hash;
    if hash.is_empty() {
        return Err(malformed(rpc, format!("empty last_block_id at height {height}")));
    }
    Ok(hash)
}
