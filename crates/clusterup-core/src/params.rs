//! Append-only parameter store with template resolution.
//!
//! `ParameterStore` is the shared state that flows through a run. Steps write
//! identifiers they mine or compute; later steps read them back as command
//! parameters. Every key is write-once: a second write to the same key is an
//! error, so a stale value can never silently replace a live one.
//!
//! Cloning the store clones a handle to the same underlying map, which lets
//! forked steps record their (disjoint) keys concurrently.

use std::sync::Arc;

use chrono::Utc;
use clusterup_types::error::ParamError;
use clusterup_types::parameter::{ParamEntry, Provenance};
use clusterup_types::plan::ParamValue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Placeholder prefix accepted inside templates.
const TEMPLATE_SCOPE: &str = "params.";

/// Shared write-once key/value store for one run.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    entries: Arc<DashMap<String, ParamEntry>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a persisted snapshot.
    pub fn from_entries(entries: Vec<ParamEntry>) -> Result<Self, ParamError> {
        let store = Self::new();
        for entry in entries {
            store.insert_entry(entry)?;
        }
        Ok(store)
    }

    /// Record `value` under `key`. Fails if the key already exists.
    pub fn insert(
        &self,
        key: &str,
        value: impl Into<String>,
        provenance: Provenance,
        producer: &str,
    ) -> Result<(), ParamError> {
        self.insert_entry(ParamEntry {
            key: key.to_string(),
            value: value.into(),
            provenance,
            producer: producer.to_string(),
            recorded_at: Utc::now(),
        })
    }

    fn insert_entry(&self, entry: ParamEntry) -> Result<(), ParamError> {
        match self.entries.entry(entry.key.clone()) {
            Entry::Occupied(existing) => Err(ParamError::DuplicateKey {
                key: entry.key,
                existing_producer: existing.get().producer.clone(),
            }),
            Entry::Vacant(slot) => {
                tracing::debug!(
                    key = entry.key.as_str(),
                    provenance = %entry.provenance,
                    producer = entry.producer.as_str(),
                    "parameter recorded"
                );
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Value stored under `key`, or `ParamError::Missing`.
    pub fn require(&self, key: &str) -> Result<String, ParamError> {
        self.get(key)
            .ok_or_else(|| ParamError::Missing(key.to_string()))
    }

    /// Full entry (with provenance) stored under `key`.
    pub fn entry(&self, key: &str) -> Option<ParamEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries ordered by recording time, then key.
    pub fn snapshot(&self) -> Vec<ParamEntry> {
        let mut entries: Vec<ParamEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then_with(|| a.key.cmp(&b.key))
        });
        entries
    }

    /// Resolve a parameter binding to its concrete value.
    pub fn resolve(&self, value: &ParamValue) -> Result<String, ParamError> {
        match value {
            ParamValue::Literal(v) => Ok(v.clone()),
            ParamValue::Ref(key) => self.require(key),
            ParamValue::Template(text) => self.render(text),
        }
    }

    /// Substitute every `{{ params.<key> }}` placeholder in `template`.
    ///
    /// Unknown keys are an error: an empty substitution would hand a
    /// downstream tool an invalid argument.
    pub fn render(&self, template: &str) -> Result<String, ParamError> {
        let mut out = String::with_capacity(template.len());
        for segment in scan_template(template)? {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Key(key) => out.push_str(&self.require(key)?),
            }
        }
        Ok(out)
    }

    /// Keys referenced by a binding (used by static plan validation).
    pub fn referenced_keys(value: &ParamValue) -> Result<Vec<String>, ParamError> {
        match value {
            ParamValue::Literal(_) => Ok(Vec::new()),
            ParamValue::Ref(key) => Ok(vec![key.clone()]),
            ParamValue::Template(text) => template_keys(text),
        }
    }
}

/// Keys referenced by `{{ params.<key> }}` placeholders in `template`.
pub fn template_keys(template: &str) -> Result<Vec<String>, ParamError> {
    Ok(scan_template(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Key(key) => Some(key.to_string()),
            Segment::Text(_) => None,
        })
        .collect())
}

/// A piece of a template: literal text or a placeholder key.
#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Key(&'a str),
}

fn scan_template(template: &str) -> Result<Vec<Segment<'_>>, ParamError> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }
        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or_else(|| ParamError::MalformedTemplate(template.to_string()))?;
        let expr = after_open[..end].trim();
        let key = expr
            .strip_prefix(TEMPLATE_SCOPE)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ParamError::MalformedTemplate(format!("unknown placeholder '{expr}'")))?;
        segments.push(Segment::Key(key));
        rest = &after_open[end + 2..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Ok(segments)
}
