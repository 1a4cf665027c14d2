//! Step runner for every plan step kind.
//!
//! `StepRunner` dispatches on `StepConfig`: it renders templates against the
//! parameter store, drives the matching collaborator, and records produced
//! keys back into the store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clusterup_types::error::ParamError;
use clusterup_types::parameter::Provenance;
use clusterup_types::plan::{
    CommandStep, ConfigField, FailureKind, ParamBinding, ReadinessCondition, StepConfig,
    StepDefinition,
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::chain::ChainQuery;
use crate::connection::{ConnectionConfig, ConnectionConfigError};
use crate::extract::{ExtractionError, OutputExtractor};
use crate::params::ParameterStore;
use crate::process::{CommandSpec, ProcessRunner, RunnerError};
use crate::readiness::{ReadinessError, ReadinessPoller};
use crate::trust::{TrustError, TrustParameterResolver};

/// Connection-table field the auth token is written to.
pub const AUTH_TOKEN_FIELD: &str = "auth_token";

// ---------------------------------------------------------------------------
// StepOutput
// ---------------------------------------------------------------------------

/// Output from a successful step.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    /// Captured output of a command step.
    pub output: Option<String>,
    /// Keys written to the parameter store.
    pub recorded: Vec<String>,
}

// ---------------------------------------------------------------------------
// StepError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StepError {
    /// The collaborator ran and exited non-zero.
    #[error("`{command}` exited with code {exit_code}")]
    ExternalCommand {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error(transparent)]
    Spawn(#[from] RunnerError),

    #[error("{source}")]
    Extraction {
        #[source]
        source: ExtractionError,
        output: String,
    },

    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error(transparent)]
    ConnectionConfig(#[from] ConnectionConfigError),
}

impl StepError {
    /// Position in the failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            StepError::ExternalCommand { .. } | StepError::Spawn(_) => FailureKind::ExternalCommand,
            StepError::Extraction { .. } => FailureKind::Extraction,
            StepError::Readiness(ReadinessError::Timeout { .. }) => FailureKind::ReadinessTimeout,
            StepError::Readiness(ReadinessError::Fatal { .. }) => FailureKind::Configuration,
            StepError::Trust(TrustError::Query(_)) => FailureKind::ExternalCommand,
            StepError::Trust(TrustError::NonPositiveTrustHeight { .. })
            | StepError::Param(_)
            | StepError::ConnectionConfig(_) => FailureKind::Configuration,
        }
    }

    /// Raw captured output of the failing command, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            StepError::ExternalCommand { output, .. } | StepError::Extraction { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// StepRunner
// ---------------------------------------------------------------------------

/// Executes individual steps against the process runner and chain query ports.
pub struct StepRunner<R, Q> {
    runner: Arc<R>,
    query: Arc<Q>,
    auth_token: Option<SecretString>,
}

impl<R: ProcessRunner, Q: ChainQuery> StepRunner<R, Q> {
    pub fn new(runner: Arc<R>, query: Arc<Q>) -> Self {
        Self {
            runner,
            query,
            auth_token: None,
        }
    }

    /// Token written by `update_config` steps that ask for it.
    pub fn with_auth_token(mut self, token: Option<SecretString>) -> Self {
        self.auth_token = token;
        self
    }

    pub async fn run(
        &self,
        step: &StepDefinition,
        store: &ParameterStore,
    ) -> Result<StepOutput, StepError> {
        match &step.config {
            StepConfig::Command(cmd) => self.run_command(&step.id, cmd, store).await,
            StepConfig::Readiness {
                condition,
                interval_ms,
                timeout_ms,
            } => {
                let condition = render_condition(condition, store)?;
                let ready = ReadinessPoller::from_millis(*interval_ms, *timeout_ms)
                    .wait_for(&condition, self.query.as_ref())
                    .await?;
                tracing::info!(
                    condition = %condition,
                    attempts = ready.attempts,
                    waited_ms = ready.waited.as_millis() as u64,
                    "ready"
                );
                Ok(StepOutput::default())
            }
            StepConfig::Delay { millis } => {
                tracing::debug!(millis, "waiting");
                tokio::time::sleep(Duration::from_millis(*millis)).await;
                Ok(StepOutput::default())
            }
            StepConfig::TrustParams {
                rpc,
                window,
                height_key,
                hash_key,
            } => {
                let rpc = store.render(rpc)?;
                let params = TrustParameterResolver::new(self.query.as_ref(), *window)
                    .resolve(&rpc)
                    .await?;
                store.insert(height_key, params.height.to_string(), Provenance::Computed, &step.id)?;
                store.insert(hash_key, params.hash, Provenance::Computed, &step.id)?;
                Ok(StepOutput {
                    output: None,
                    recorded: vec![height_key.clone(), hash_key.clone()],
                })
            }
            StepConfig::UpdateConfig {
                path,
                subnet,
                fields,
                auth_token,
                create_if_missing,
            } => {
                self.update_config(path, subnet, fields, *auth_token, *create_if_missing, store)
                    .await?;
                Ok(StepOutput::default())
            }
            StepConfig::Record { entries } => record(&step.id, entries, store),
        }
    }

    async fn run_command(
        &self,
        step_id: &str,
        cmd: &CommandStep,
        store: &ParameterStore,
    ) -> Result<StepOutput, StepError> {
        let spec = CommandSpec::render(cmd, store)?;
        tracing::info!(command = %spec, "running command");

        let result = self.runner.run(&spec).await?;
        if !result.success() {
            return Err(StepError::ExternalCommand {
                command: spec.to_string(),
                exit_code: result.exit_code,
                output: result.output,
            });
        }

        let found = match OutputExtractor::apply_all(&result.output, &cmd.extract) {
            Ok(found) => found,
            Err(source) => {
                return Err(StepError::Extraction {
                    source,
                    output: result.output,
                });
            }
        };

        let mut recorded = Vec::with_capacity(found.len());
        for (key, value) in found {
            store.insert(&key, value, Provenance::Extracted, step_id)?;
            recorded.push(key);
        }

        Ok(StepOutput {
            output: Some(result.output),
            recorded,
        })
    }

    async fn update_config(
        &self,
        path: &str,
        subnet: &str,
        fields: &[ConfigField],
        with_auth_token: bool,
        create_if_missing: bool,
        store: &ParameterStore,
    ) -> Result<(), StepError> {
        let path = PathBuf::from(store.render(path)?);
        let subnet = store.render(subnet)?;

        let mut values = Vec::with_capacity(fields.len() + 1);
        for field in fields {
            values.push((field.field.clone(), store.resolve(&field.value)?));
        }
        if with_auth_token {
            match &self.auth_token {
                Some(token) => values.push((
                    AUTH_TOKEN_FIELD.to_string(),
                    token.expose_secret().to_string(),
                )),
                None => tracing::debug!(subnet = subnet.as_str(), "no auth token configured"),
            }
        }

        let mut doc = ConnectionConfig::load(&path).await?;
        doc.set_subnet_fields(&subnet, &values, create_if_missing)?;
        doc.save(&path).await?;
        tracing::info!(
            path = %path.display(),
            subnet = subnet.as_str(),
            fields = values.len(),
            "connection table updated"
        );
        Ok(())
    }
}

fn record(
    step_id: &str,
    entries: &[ParamBinding],
    store: &ParameterStore,
) -> Result<StepOutput, StepError> {
    // Resolve everything first so a missing key records nothing.
    let mut resolved = Vec::with_capacity(entries.len());
    for binding in entries {
        resolved.push((binding.name.clone(), store.resolve(&binding.value)?));
    }
    let mut recorded = Vec::with_capacity(resolved.len());
    for (key, value) in resolved {
        store.insert(&key, value, Provenance::Computed, step_id)?;
        recorded.push(key);
    }
    Ok(StepOutput {
        output: None,
        recorded,
    })
}

fn render_condition(
    condition: &ReadinessCondition,
    store: &ParameterStore,
) -> Result<ReadinessCondition, ParamError> {
    Ok(match condition {
        ReadinessCondition::RpcHeight { rpc } => ReadinessCondition::RpcHeight {
            rpc: store.render(rpc)?,
        },
        ReadinessCondition::ChainAdvancing { rpc } => ReadinessCondition::ChainAdvancing {
            rpc: store.render(rpc)?,
        },
        ReadinessCondition::DirNonEmpty { path } => ReadinessCondition::DirNonEmpty {
            path: store.render(path)?,
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
