//! Live progress rendering from the run event stream.

use std::time::Duration;

use clusterup_types::event::RunEvent;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Render events until `RunFinished` or until the bus closes.
pub fn spawn_renderer(mut events: Receiver<RunEvent>) -> anyhow::Result<JoinHandle<()>> {
    let spinner_style = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}")?;

    Ok(tokio::spawn(async move {
        let mut spinner: Option<ProgressBar> = None;
        let mut total = 0usize;

        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "progress renderer lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match event {
                RunEvent::RunStarted { plan, phases, run_id } => {
                    total = phases;
                    println!();
                    println!(
                        "  {} {} {}",
                        style("▶").cyan().bold(),
                        style(&plan).bold(),
                        style(format!("run {run_id}")).dim()
                    );
                    println!();
                }
                RunEvent::PhaseStarted { phase, index, .. } => {
                    let bar = ProgressBar::new_spinner();
                    bar.set_style(spinner_style.clone());
                    bar.set_message(format!(
                        "{} {}",
                        style(format!("[{}/{}]", index + 1, total)).dim(),
                        phase
                    ));
                    bar.enable_steady_tick(Duration::from_millis(80));
                    if let Some(previous) = spinner.replace(bar) {
                        previous.finish_and_clear();
                    }
                }
                RunEvent::StepCompleted {
                    step_id,
                    duration_ms,
                    ..
                } => {
                    if let Some(bar) = &spinner {
                        bar.println(format!(
                            "      {} {} {}",
                            style("·").dim(),
                            step_id,
                            style(format_duration(duration_ms)).dim()
                        ));
                    }
                }
                RunEvent::StepFailed {
                    step_id,
                    error,
                    fatal: false,
                    ..
                } => {
                    let line = format!(
                        "      {} {} {}",
                        style("!").yellow(),
                        step_id,
                        style(error).yellow()
                    );
                    match &spinner {
                        Some(bar) => bar.println(line),
                        None => println!("{line}"),
                    }
                }
                RunEvent::StepFailed { .. } => {}
                RunEvent::PhaseCompleted {
                    phase, duration_ms, ..
                } => {
                    if let Some(bar) = spinner.take() {
                        bar.finish_and_clear();
                    }
                    println!(
                        "  {} {} {}",
                        style("✓").green(),
                        phase,
                        style(format_duration(duration_ms)).dim()
                    );
                }
                RunEvent::PhaseFailed { phase, error, .. } => {
                    if let Some(bar) = spinner.take() {
                        bar.finish_and_clear();
                    }
                    println!("  {} {} {}", style("✗").red(), style(&phase).red(), error);
                }
                RunEvent::CleanupRan { phase, ok, .. } => {
                    let mark = if ok {
                        style("↺").dim()
                    } else {
                        style("↺").yellow()
                    };
                    let outcome = if ok { "cleaned up" } else { "cleanup failed" };
                    println!("  {mark} {phase} {}", style(outcome).dim());
                }
                RunEvent::RunFinished { .. } => {
                    if let Some(bar) = spinner.take() {
                        bar.finish_and_clear();
                    }
                    break;
                }
            }
        }
    }))
}

pub fn format_duration(ms: u64) -> String {
    if ms >= 60_000 {
        format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000)
    } else if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}
