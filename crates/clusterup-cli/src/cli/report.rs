//! Final run report: parameter table, phase summary, failure diagnostics.

use clusterup_core::sequencer::RunReport;
use clusterup_types::parameter::ParamEntry;
use clusterup_types::plan::{FailureKind, PhaseStatus};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use super::progress::format_duration;

/// Lines of captured output shown for a failed step before truncation.
const OUTPUT_TAIL_LINES: usize = 40;

/// How a run's outcome is worded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Bring-up or custom plan.
    Run,
    /// The sync test, where a readiness timeout means the test failed.
    Test,
}

pub fn print_report(report: &RunReport, outcome: Outcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("── Phases ──").dim());
    for phase in &report.phases {
        let mark = match phase.status {
            PhaseStatus::Completed => style("✓").green(),
            PhaseStatus::Failed => style("✗").red(),
            PhaseStatus::Skipped => style("-").dim(),
            PhaseStatus::Pending | PhaseStatus::Running => style("?").yellow(),
        };
        let timing = phase.duration_ms.map(format_duration).unwrap_or_default();
        println!(
            "  {mark} {:<28} {:<10} {}",
            phase.name,
            phase.status.to_string(),
            style(timing).dim()
        );
    }
    println!();

    if !report.params.is_empty() {
        println!("  {}", style("── Parameters ──").dim());
        println!("{}", params_table(&report.params));
        println!();
    }

    if !report.cleanups.is_empty() {
        println!("  {}", style("── Cleanup ──").dim());
        for cleanup in &report.cleanups {
            let mark = if cleanup.ok {
                style("✓").green()
            } else {
                style("✗").yellow()
            };
            let detail = cleanup.error.as_deref().unwrap_or_default();
            println!("  {mark} {} ({}) {}", cleanup.step_id, cleanup.phase, style(detail).dim());
        }
        println!();
    }

    if let Some(failure) = &report.failure {
        println!("  {}", style("── Failure ──").dim());
        println!("  Phase:  {}", style(&failure.phase).red().bold());
        println!("  Step:   {}", failure.step_id);
        println!("  Kind:   {}", failure.kind);
        println!("  Error:  {}", failure.message);
        if let Some(output) = &failure.output {
            println!();
            println!("  {}", style("Captured output:").dim());
            for line in tail(output, OUTPUT_TAIL_LINES) {
                println!("    {line}");
            }
        }
        println!();
    }

    println!(
        "  {} {}",
        headline(report, outcome),
        style(format_duration(report.duration_ms)).dim()
    );
    println!();
    Ok(())
}

fn headline(report: &RunReport, outcome: Outcome) -> String {
    if report.succeeded() {
        return match outcome {
            Outcome::Run => format!("{}", style("Run succeeded").green().bold()),
            Outcome::Test => format!("{}", style("Test passed").green().bold()),
        };
    }
    let timed_out = report
        .failure
        .as_ref()
        .is_some_and(|f| f.kind == FailureKind::ReadinessTimeout);
    match (outcome, timed_out) {
        (Outcome::Test, true) => format!("{}", style("Test failed").red().bold()),
        _ => format!("{}", style("Run aborted").red().bold()),
    }
}

pub fn params_table(params: &[ParamEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Key").fg(Color::White),
        Cell::new("Value").fg(Color::White),
        Cell::new("Source").fg(Color::White),
        Cell::new("Producer").fg(Color::White),
    ]);

    for entry in params {
        table.add_row(vec![
            Cell::new(&entry.key).fg(Color::Cyan),
            Cell::new(&entry.value),
            Cell::new(entry.provenance.to_string()).fg(Color::DarkGrey),
            Cell::new(&entry.producer).fg(Color::DarkGrey),
        ]);
    }
    table
}

/// Last `n` lines of `output`, with a marker when lines were dropped.
fn tail(output: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() <= n {
        return lines.into_iter().map(str::to_string).collect();
    }
    let skipped = lines.len() - n;
    std::iter::once(format!("... ({skipped} earlier lines)"))
        .chain(lines[skipped..].iter().map(|l| l.to_string()))
        .collect()
}
