//! `cup params show`: parameters recorded by a previous run.

use console::style;
use uuid::Uuid;

use super::report::params_table;
use crate::state::AppState;

pub async fn show(state: &AppState, run: Option<Uuid>, json: bool) -> anyhow::Result<()> {
    let run_id = match run {
        Some(run_id) => run_id,
        None => state.run_state.latest_run().await?,
    };
    let params = state.run_state.load_params(run_id).await?;

    if json {
        let out = serde_json::json!({
            "run_id": run_id,
            "params": params,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  Parameters of run {} ({} entries)",
        style(run_id).cyan(),
        params.len()
    );
    println!();
    if params.is_empty() {
        println!("  {}", style("(none recorded)").dim());
    } else {
        println!("{}", params_table(&params));
    }
    println!();
    Ok(())
}
