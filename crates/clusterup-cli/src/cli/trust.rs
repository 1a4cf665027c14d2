//! `cup trust`: print state-sync trust parameters for a running node.

use clusterup_core::trust::TrustParameterResolver;
use console::style;

use crate::state::AppState;

pub async fn trust(state: &AppState, rpc: &str, window: Option<u64>, json: bool) -> anyhow::Result<()> {
    let window = window.unwrap_or(state.config.sync_test.trust_window);
    let client = state.chain_client()?;
    let params = TrustParameterResolver::new(&client, window).resolve(rpc).await?;

    if json {
        let out = serde_json::json!({
            "rpc": rpc,
            "window": window,
            "trust_height": params.height,
            "trust_hash": params.hash,
            "query_height": params.query_height,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  Trust height: {}", style(params.height).bold());
    println!("  Trust hash:   {}", style(&params.hash).cyan());
    println!(
        "  {}",
        style(format!(
            "hash of block {} taken from header {} (window {window})",
            params.height, params.query_height
        ))
        .dim()
    );
    println!();
    Ok(())
}
