//! clusterup CLI entry point.
//!
//! Binary name: `cup`
//!
//! Parses CLI arguments, installs tracing, loads the cluster config, then
//! dispatches to the command handler. The handler's exit code becomes the
//! process exit code.

mod cli;
mod state;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;
use clusterup_observe::tracing_setup::{TracingOptions, Verbosity, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, ParamsCommand, PlanCommand};
use cli::run::RunOptions;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    init_tracing(TracingOptions {
        verbosity,
        otel: cli.otel,
        json: false,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli, verbosity).await;
    shutdown_tracing();

    let code = result?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

async fn dispatch(cli: Cli, verbosity: Verbosity) -> anyhow::Result<i32> {
    // Shell completions and log scans don't need the config
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "cup", &mut std::io::stdout());
            return Ok(0);
        }
        Commands::Extract { rule, node, file } => {
            return cli::extract::extract(rule, node, file, cli.json).await;
        }
        _ => {}
    }

    let state = AppState::init(cli.config.clone()).await?;
    let options = RunOptions {
        json: cli.json,
        quiet: cli.quiet,
        echo: matches!(verbosity, Verbosity::Debug | Verbosity::Trace),
    };

    match cli.command {
        Commands::Bringup => cli::run::bringup(&state, options).await,
        Commands::SyncTest => cli::run::sync_test(&state, options).await,
        Commands::Run { file, params } => cli::run::run_file(&state, &file, params, options).await,
        Commands::Plan {
            action: PlanCommand::Show { plan },
        } => {
            cli::plan::show(&state, plan, cli.json)?;
            Ok(0)
        }
        Commands::Teardown { keep_state } => {
            cli::teardown::teardown(&state, keep_state, cli.json).await
        }
        Commands::Params {
            action: ParamsCommand::Show { run },
        } => {
            cli::params::show(&state, run, cli.json).await?;
            Ok(0)
        }
        Commands::Trust { rpc, window } => {
            cli::trust::trust(&state, &rpc, window, cli.json).await?;
            Ok(0)
        }
        Commands::Completions { .. } | Commands::Extract { .. } => Ok(0),
    }
}
