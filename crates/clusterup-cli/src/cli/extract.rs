//! `cup extract`: apply a built-in extraction rule to a saved log.

use std::path::Path;

use anyhow::Context;
use clusterup_core::extract::OutputExtractor;
use clusterup_core::extract::rules;

pub async fn extract(rule: &str, node: &str, file: &Path, json: bool) -> anyhow::Result<i32> {
    let Some(rule) = rules::by_name(rule, node) else {
        anyhow::bail!(
            "unknown rule '{rule}'; expected one of: {}",
            rules::RULE_NAMES.join(", ")
        );
    };
    let output = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let value = OutputExtractor::find(&output, &rule);

    if json {
        let out = serde_json::json!({
            "key": rule.key,
            "label": rule.label,
            "value": value,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if let Some(value) = &value {
        println!("{value}");
    } else {
        eprintln!("{}: marker '{}' not found in {}", rule.label, rule.marker, file.display());
    }

    Ok(if value.is_some() { 0 } else { 1 })
}
