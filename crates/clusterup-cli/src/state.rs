//! Application state shared by the command handlers.
//!
//! Loads the cluster config once, resolves state paths and the parent auth
//! token, and pins the core's generic step runner to the infra adapters.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clusterup_core::plans::StatePaths;
use clusterup_core::sequencer::StepRunner;
use clusterup_infra::chain::DEFAULT_REQUEST_TIMEOUT;
use clusterup_infra::config::{
    default_config_path, load_cluster_config, resolve_auth_token, resolve_state_paths,
};
use clusterup_infra::{CometRpcClient, RunStateDir, TokioProcessRunner};
use clusterup_types::config::ClusterConfig;
use secrecy::SecretString;

/// Step runner pinned to the real subprocess and RPC adapters.
pub type ConcreteStepRunner = StepRunner<TokioProcessRunner, CometRpcClient>;

pub struct AppState {
    pub config: ClusterConfig,
    pub config_path: PathBuf,
    pub paths: StatePaths,
    pub auth_token: Option<SecretString>,
    pub run_state: RunStateDir,
}

impl AppState {
    pub async fn init(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => default_config_path()
                .context("cannot determine home directory; pass --config")?,
        };
        let config = load_cluster_config(&config_path).await?;
        let paths = resolve_state_paths(&config)?;
        let auth_token = resolve_auth_token(&config);
        let run_state = RunStateDir::new(&paths.state_dir);

        tracing::debug!(
            config = %config_path.display(),
            state_dir = %paths.state_dir.display(),
            network = ?config.network,
            "application state initialized"
        );

        Ok(Self {
            config,
            config_path,
            paths,
            auth_token,
            run_state,
        })
    }

    pub fn chain_client(&self) -> anyhow::Result<CometRpcClient> {
        CometRpcClient::new(DEFAULT_REQUEST_TIMEOUT).context("failed to build RPC client")
    }

    /// Step runner wired to real processes and RPC endpoints.
    ///
    /// `echo` mirrors every collaborator output line into the debug log.
    pub fn step_runner(&self, echo: bool) -> anyhow::Result<ConcreteStepRunner> {
        let runner = TokioProcessRunner::new().with_echo(echo);
        Ok(StepRunner::new(Arc::new(runner), Arc::new(self.chain_client()?))
            .with_auth_token(self.auth_token.clone()))
    }
}
