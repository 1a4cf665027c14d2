//! Infrastructure layer for clusterup.
//!
//! Concrete adapters for the ports defined in `clusterup-core`: a tokio
//! subprocess runner, a CometBFT JSON-RPC client, the cluster config loader,
//! and run-state persistence.

pub mod chain;
pub mod config;
pub mod process;
pub mod state_dir;

pub use chain::CometRpcClient;
pub use process::TokioProcessRunner;
pub use state_dir::RunStateDir;
