//! CLI command definitions for the `cup` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod extract;
pub mod params;
pub mod plan;
pub mod progress;
pub mod report;
pub mod run;
pub mod teardown;
pub mod trust;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Bring up a multi-node subnet and run its state-sync test.
#[derive(Parser)]
#[command(name = "cup", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Cluster config file (default ~/.clusterup/cluster.toml).
    #[arg(long, global = true, env = "CLUSTERUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy contracts, create the subnet, and start every validator.
    Bringup,

    /// Run the snapshot/state-sync test on a fresh three-node cluster.
    #[command(name = "sync-test")]
    SyncTest,

    /// Execute a custom plan file (YAML).
    Run {
        /// Plan file to execute.
        file: PathBuf,

        /// Seed a parameter before the run (repeatable).
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Inspect built-in plans.
    Plan {
        #[command(subcommand)]
        action: PlanCommand,
    },

    /// Stop every configured node and service and remove run state.
    Teardown {
        /// Keep run records and node data directories.
        #[arg(long)]
        keep_state: bool,
    },

    /// Inspect parameters recorded by previous runs.
    Params {
        #[command(subcommand)]
        action: ParamsCommand,
    },

    /// Apply a built-in extraction rule to a saved log.
    Extract {
        /// Rule name (node-id, resolver-multiaddr, resolver-peer-id, gateway,
        /// registry, subnet-id, wallet-address).
        #[arg(long)]
        rule: String,

        /// Node the value belongs to, for node-scoped rules.
        #[arg(long, default_value = "validator-0")]
        node: String,

        /// Log file to scan.
        file: PathBuf,
    },

    /// Print trust height and hash for state sync against a running node.
    Trust {
        /// CometBFT RPC endpoint of the snapshot source.
        #[arg(long)]
        rpc: String,

        /// Blocks behind the tip (defaults to sync_test.trust_window).
        #[arg(long)]
        window: Option<u64>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum PlanCommand {
    /// Print a built-in plan as YAML.
    Show {
        /// Which plan to render.
        #[arg(value_enum, default_value_t = BuiltinPlan::Bringup)]
        plan: BuiltinPlan,
    },
}

#[derive(Subcommand)]
pub enum ParamsCommand {
    /// Show the parameter snapshot of a run (default: the latest).
    Show {
        /// Run id to inspect.
        #[arg(long)]
        run: Option<uuid::Uuid>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuiltinPlan {
    Bringup,
    SyncTest,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
