//! Readiness polling.
//!
//! [`ReadinessPoller`] repeatedly evaluates a [`Probe`] at a fixed interval
//! until it reports ready or the deadline passes. Transient failures (an RPC
//! endpoint refusing connections while the node boots) count as "not yet
//! ready"; only the deadline produces [`ReadinessError::Timeout`].

use std::path::PathBuf;
use std::time::Duration;

use clusterup_types::plan::ReadinessCondition;
use thiserror::Error;
use tokio::time::Instant;

use crate::chain::{ChainError, ChainQuery};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessError {
    #[error(
        "timed out after {waited_ms} ms waiting for {condition} ({attempts} attempts, last: {last})"
    )]
    Timeout {
        condition: String,
        waited_ms: u64,
        attempts: u32,
        last: String,
    },

    /// The probe hit an error that polling cannot fix.
    #[error("{condition}: {reason}")]
    Fatal { condition: String, reason: String },
}

/// Result of one probe evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    /// Not yet; the string says why.
    Pending(String),
}

/// A condition evaluated by the poller. `Err` aborts polling immediately.
pub trait Probe: Send {
    fn check(
        &mut self,
    ) -> impl std::future::Future<Output = Result<ProbeOutcome, String>> + Send;
}

/// Successful wait summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub attempts: u32,
    pub waited: Duration,
}

/// Fixed-interval poller with an overall deadline.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPoller {
    interval: Duration,
    timeout: Duration,
}

impl ReadinessPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        )
    }

    /// Poll `probe` until ready or the deadline passes.
    ///
    /// The probe runs at least once. The last attempt lands on the deadline.
    pub async fn wait<P: Probe>(
        &self,
        condition: &str,
        probe: &mut P,
    ) -> Result<Readiness, ReadinessError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let last = match probe.check().await {
                Ok(ProbeOutcome::Ready) => {
                    let waited = started.elapsed();
                    tracing::debug!(
                        condition,
                        attempts,
                        waited_ms = waited.as_millis() as u64,
                        "condition ready"
                    );
                    return Ok(Readiness { attempts, waited });
                }
                Ok(ProbeOutcome::Pending(reason)) => {
                    tracing::trace!(condition, attempts, reason = reason.as_str(), "not ready");
                    reason
                }
                Err(reason) => {
                    return Err(ReadinessError::Fatal {
                        condition: condition.to_string(),
                        reason,
                    });
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(ReadinessError::Timeout {
                    condition: condition.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                    attempts,
                    last,
                });
            }
            tokio::time::sleep(self.interval.min(deadline - now)).await;
        }
    }

    /// Wait for a plan-level condition using the built-in probes.
    pub async fn wait_for<Q: ChainQuery>(
        &self,
        condition: &ReadinessCondition,
        query: &Q,
    ) -> Result<Readiness, ReadinessError> {
        let label = condition.to_string();
        match condition {
            ReadinessCondition::RpcHeight { rpc } => {
                self.wait(&label, &mut RpcHeightProbe::new(query, rpc)).await
            }
            ReadinessCondition::ChainAdvancing { rpc } => {
                self.wait(&label, &mut ChainAdvancingProbe::new(query, rpc))
                    .await
            }
            ReadinessCondition::DirNonEmpty { path } => {
                self.wait(&label, &mut DirNonEmptyProbe::new(path)).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

fn pending_from(err: ChainError) -> ProbeOutcome {
    if let ChainError::Malformed { .. } = &err {
        tracing::warn!(error = %err, "readiness probe got a malformed response");
    }
    ProbeOutcome::Pending(err.to_string())
}

/// Ready once the node answers with a block height.
pub struct RpcHeightProbe<'a, Q> {
    query: &'a Q,
    rpc: String,
    /// Height seen by the successful check.
    pub height: Option<u64>,
}

impl<'a, Q: ChainQuery> RpcHeightProbe<'a, Q> {
    pub fn new(query: &'a Q, rpc: impl Into<String>) -> Self {
        Self {
            query,
            rpc: rpc.into(),
            height: None,
        }
    }
}

impl<Q: ChainQuery> Probe for RpcHeightProbe<'_, Q> {
    async fn check(&mut self) -> Result<ProbeOutcome, String> {
        match self.query.latest_height(&self.rpc).await {
            Ok(height) => {
                self.height = Some(height);
                Ok(ProbeOutcome::Ready)
            }
            Err(err) => Ok(pending_from(err)),
        }
    }
}

/// Ready once two successive observations report different heights.
pub struct ChainAdvancingProbe<'a, Q> {
    query: &'a Q,
    rpc: String,
    last: Option<u64>,
}

impl<'a, Q: ChainQuery> ChainAdvancingProbe<'a, Q> {
    pub fn new(query: &'a Q, rpc: impl Into<String>) -> Self {
        Self {
            query,
            rpc: rpc.into(),
            last: None,
        }
    }
}

impl<Q: ChainQuery> Probe for ChainAdvancingProbe<'_, Q> {
    async fn check(&mut self) -> Result<ProbeOutcome, String> {
        let height = match self.query.latest_height(&self.rpc).await {
            Ok(h) => h,
            Err(err) => return Ok(pending_from(err)),
        };
        match self.last.replace(height) {
            Some(previous) if previous != height => Ok(ProbeOutcome::Ready),
            Some(_) => Ok(ProbeOutcome::Pending(format!("height stalled at {height}"))),
            None => Ok(ProbeOutcome::Pending(format!("baseline height {height}"))),
        }
    }
}

/// Ready once the directory exists and holds at least one entry.
pub struct DirNonEmptyProbe {
    path: PathBuf,
}

impl DirNonEmptyProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Probe for DirNonEmptyProbe {
    async fn check(&mut self) -> Result<ProbeOutcome, String> {
        let mut entries = match tokio::fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProbeOutcome::Pending(format!(
                    "{} does not exist yet",
                    self.path.display()
                )));
            }
            Err(e) => return Err(format!("cannot read {}: {e}", self.path.display())),
        };
        match entries.next_entry().await {
            Ok(Some(_)) => Ok(ProbeOutcome::Ready),
            Ok(None) => Ok(ProbeOutcome::Pending(format!("{} is empty", self.path.display()))),
            Err(e) => Err(format!("cannot list {}: {e}", self.path.display())),
        }
    }
}
