//! Output extraction.
//!
//! Runtime identifiers (CometBFT node IDs, resolver peer IDs, contract
//! addresses, subnet IDs) are only observable in the human-readable output of
//! the external tools. All parsing of that output lives here, one
//! [`ExtractionRule`] per identifier, so it can be tested without a process.

pub mod rules;

use clusterup_types::plan::{ExtractionKind, ExtractionRule};
use thiserror::Error;

/// Extraction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// A mandatory marker never appeared in the output.
    #[error("{label}: marker '{marker}' not found in output")]
    MarkerNotFound { label: String, marker: String },

    /// The marker was found but no value followed it.
    #[error("{label}: marker '{marker}' found but no value follows it")]
    EmptyValue { label: String, marker: String },
}

/// Stateless extractor applying [`ExtractionRule`]s to captured output.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputExtractor;

impl OutputExtractor {
    /// Return the first value matching `rule`, or `None` when the marker is
    /// absent.
    pub fn find(output: &str, rule: &ExtractionRule) -> Option<String> {
        let mut lines = output.lines();

        while let Some(line) = lines.next() {
            let Some(pos) = line.find(&rule.marker) else {
                continue;
            };

            let raw = match rule.kind {
                ExtractionKind::NextLine => lines.by_ref().map(str::trim).find(|l| !l.is_empty()),
                ExtractionKind::SameLine => {
                    let rest = clean_inline(&line[pos + rule.marker.len()..]);
                    (!rest.is_empty()).then_some(rest)
                }
            }?;

            let value = if rule.strip_p2p_suffix {
                strip_p2p(raw)
            } else {
                raw
            };
            return Some(value.to_string());
        }

        None
    }

    /// Apply `rule`, failing on a missing mandatory marker.
    ///
    /// Optional rules that miss return `Ok(None)`.
    pub fn apply(output: &str, rule: &ExtractionRule) -> Result<Option<String>, ExtractionError> {
        if let Some(value) = Self::find(output, rule) {
            return Ok(Some(value));
        }
        if !rule.mandatory {
            return Ok(None);
        }
        if output.contains(&rule.marker) {
            Err(ExtractionError::EmptyValue {
                label: rule.label.clone(),
                marker: rule.marker.clone(),
            })
        } else {
            Err(ExtractionError::MarkerNotFound {
                label: rule.label.clone(),
                marker: rule.marker.clone(),
            })
        }
    }

    /// Apply every rule, returning `(key, value)` pairs in rule order.
    ///
    /// Stops at the first mandatory miss.
    pub fn apply_all(
        output: &str,
        rules: &[ExtractionRule],
    ) -> Result<Vec<(String, String)>, ExtractionError> {
        let mut found = Vec::with_capacity(rules.len());
        for rule in rules {
            if let Some(value) = Self::apply(output, rule)? {
                found.push((rule.key.clone(), value));
            }
        }
        Ok(found)
    }
}

/// Trim separators that tools print between a label and its value.
fn clean_inline(rest: &str) -> &str {
    rest.trim()
        .trim_start_matches([':', '='])
        .trim()
        .trim_matches(|c: char| c == '"' || c == ',' || c == '\'')
        .trim()
}

/// `/ip4/1.2.3.4/tcp/26655/p2p/16Uiu2...` becomes `16Uiu2...`.
fn strip_p2p(value: &str) -> &str {
    match value.rfind("/p2p/") {
        Some(idx) => &value[idx + "/p2p/".len()..],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_line(marker: &str) -> ExtractionRule {
        ExtractionRule {
            key: "k".to_string(),
            label: "test value".to_string(),
            marker: marker.to_string(),
            kind: ExtractionKind::NextLine,
            strip_p2p_suffix: false,
            mandatory: true,
        }
    }

    #[test]
    fn next_line_returns_trimmed_value() {
        let output = "starting\nCometBFT node ID:\n   7f3a9c   \nmore";
        let rule = next_line("CometBFT node ID:");
        assert_eq!(OutputExtractor::find(output, &rule).as_deref(), Some("7f3a9c"));
    }

    #[test]
    fn next_line_skips_blank_lines() {
        let output = "Marker\n\n  \nvalue\n";
        assert_eq!(
            OutputExtractor::find(output, &next_line("Marker")).as_deref(),
            Some("value")
        );
    }

    #[test]
    fn first_match_wins() {
        let output = "Marker\nfirst\nMarker\nsecond";
        assert_eq!(
            OutputExtractor::find(output, &next_line("Marker")).as_deref(),
            Some("first")
        );
    }

    #[test]
    fn missing_marker_is_not_found() {
        let rule = next_line("CometBFT node ID:");
        assert_eq!(OutputExtractor::find("nothing here", &rule), None);
        assert_eq!(
            OutputExtractor::apply("nothing here", &rule),
            Err(ExtractionError::MarkerNotFound {
                label: "test value".to_string(),
                marker: "CometBFT node ID:".to_string(),
            })
        );
    }

    #[test]
    fn marker_on_last_line_is_empty_value() {
        let rule = next_line("Marker");
        assert!(matches!(
            OutputExtractor::apply("xx\nMarker\n\n", &rule),
            Err(ExtractionError::EmptyValue { .. })
        ));
    }

    #[test]
    fn optional_rule_miss_is_none() {
        let mut rule = next_line("Marker");
        rule.mandatory = false;
        assert_eq!(OutputExtractor::apply("nothing", &rule), Ok(None));
    }

    #[test]
    fn same_line_strips_separators() {
        let mut rule = next_line("\"Gateway\"");
        rule.kind = ExtractionKind::SameLine;
        let output = "{\n  \"Gateway\": \"0xAbC123\",\n  \"SubnetRegistry\": \"0xdef\"\n}";
        assert_eq!(OutputExtractor::find(output, &rule).as_deref(), Some("0xAbC123"));
    }

    #[test]
    fn p2p_suffix_is_stripped() {
        let mut rule = next_line("IPLD Resolver Multiaddress:");
        rule.strip_p2p_suffix = true;
        let output = "IPLD Resolver Multiaddress:\n/ip4/0.0.0.0/tcp/26655/p2p/16Uiu2HAm\n";
        assert_eq!(OutputExtractor::find(output, &rule).as_deref(), Some("16Uiu2HAm"));
    }

    #[test]
    fn value_without_p2p_segment_is_unchanged() {
        assert_eq!(strip_p2p("16Uiu2HAm"), "16Uiu2HAm");
    }

    #[test]
    fn apply_all_collects_in_order() {
        let mut a = next_line("A:");
        a.key = "a".to_string();
        let mut b = next_line("B:");
        b.key = "b".to_string();
        b.mandatory = false;
        let mut c = next_line("C:");
        c.key = "c".to_string();
        let found = OutputExtractor::apply_all("A:\n1\nC:\n3\n", &[a, b, c]).unwrap();
        assert_eq!(
            found,
            vec![("a".to_string(), "1".to_string()), ("c".to_string(), "3".to_string())]
        );
    }
}
