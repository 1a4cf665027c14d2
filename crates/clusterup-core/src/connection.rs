//! Persisted connection table.
//!
//! The registry CLI reads a TOML document listing every known subnet and how
//! to reach it:
//!
//! ```toml
//! keystore_path = "~/.ipc"
//!
//! [[subnets]]
//! id = "/r31337"
//!
//! [subnets.config]
//! network_type = "fevm"
//! provider_http = "http://127.0.0.1:8545"
//! gateway_addr = "0x..."
//! registry_addr = "0x..."
//! ```
//!
//! Updates are read-modify-write on the parsed table: only the named fields of
//! the matching entry change, and every other value is written back as read.
//! Comments and blank lines are not kept, and keys come back in the order
//! the `toml` serializer emits them.

use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

#[derive(Debug, Error)]
pub enum ConnectionConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse connection config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize connection config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("connection config has unexpected shape: {0}")]
    Shape(String),

    #[error("no subnet entry with id '{0}'")]
    SubnetNotFound(String),
}

/// In-memory copy of the connection table document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionConfig {
    doc: Table,
}

impl ConnectionConfig {
    pub fn parse(text: &str) -> Result<Self, ConnectionConfigError> {
        Ok(Self {
            doc: text.parse::<Table>()?,
        })
    }

    /// Load from disk. A missing file is an empty document.
    pub async fn load(path: &Path) -> Result<Self, ConnectionConfigError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConnectionConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Write to disk via a sibling temp file and rename.
    pub async fn save(&self, path: &Path) -> Result<(), ConnectionConfigError> {
        let text = self.render()?;
        let write_err = |source| ConnectionConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let tmp = path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, text).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(write_err)?;
        Ok(())
    }

    pub fn render(&self) -> Result<String, ConnectionConfigError> {
        Ok(toml::to_string(&self.doc)?)
    }

    /// Set `fields` in the `config` table of subnet `id`.
    ///
    /// With `create_if_missing`, a new `[[subnets]]` entry is appended when no
    /// entry matches.
    pub fn set_subnet_fields(
        &mut self,
        id: &str,
        fields: &[(String, String)],
        create_if_missing: bool,
    ) -> Result<(), ConnectionConfigError> {
        let subnets = match self
            .doc
            .entry("subnets")
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => items,
            other => {
                return Err(ConnectionConfigError::Shape(format!(
                    "'subnets' is a {}, expected an array of tables",
                    other.type_str()
                )));
            }
        };

        let position = subnets.iter().position(|entry| {
            entry
                .get("id")
                .and_then(Value::as_str)
                .is_some_and(|existing| existing == id)
        });

        let entry = match position {
            Some(idx) => &mut subnets[idx],
            None if create_if_missing => {
                let mut table = Table::new();
                table.insert("id".to_string(), Value::String(id.to_string()));
                table.insert("config".to_string(), Value::Table(Table::new()));
                subnets.push(Value::Table(table));
                let last = subnets.len() - 1;
                &mut subnets[last]
            }
            None => return Err(ConnectionConfigError::SubnetNotFound(id.to_string())),
        };

        let Value::Table(entry) = entry else {
            return Err(ConnectionConfigError::Shape(format!(
                "subnet entry '{id}' is not a table"
            )));
        };
        let config = match entry
            .entry("config")
            .or_insert_with(|| Value::Table(Table::new()))
        {
            Value::Table(config) => config,
            _ => {
                return Err(ConnectionConfigError::Shape(format!(
                    "'config' of subnet '{id}' is not a table"
                )));
            }
        };

        for (field, value) in fields {
            config.insert(field.clone(), Value::String(value.clone()));
        }
        tracing::debug!(subnet = id, fields = fields.len(), "updated connection table entry");
        Ok(())
    }

    /// A string field from subnet `id`'s config table.
    pub fn subnet_field(&self, id: &str, field: &str) -> Option<&str> {
        self.doc
            .get("subnets")?
            .as_array()?
            .iter()
            .find(|entry| entry.get("id").and_then(Value::as_str) == Some(id))?
            .get("config")?
            .get(field)?
            .as_str()
    }

    /// Top-level value, for inspecting untouched fields.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
keystore_path = "~/.ipc"

[[subnets]]
id = "/r31337"

[subnets.config]
network_type = "fevm"
provider_http = "http://127.0.0.1:8545"
gateway_addr = "0x0000000000000000000000000000000000000001"
registry_addr = "0x0000000000000000000000000000000000000002"

[[subnets]]
id = "/r31337/t410abc"

[subnets.config]
network_type = "fevm"
provider_http = "http://127.0.0.1:8645"
"#;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn updates_only_named_fields() {
        let mut config = ConnectionConfig::parse(SAMPLE).unwrap();
        config
            .set_subnet_fields(
                "/r31337",
                &pairs(&[("gateway_addr", "0xAAAA"), ("registry_addr", "0xBBBB")]),
                false,
            )
            .unwrap();

        let reparsed = ConnectionConfig::parse(&config.render().unwrap()).unwrap();
        assert_eq!(reparsed.subnet_field("/r31337", "gateway_addr"), Some("0xAAAA"));
        assert_eq!(reparsed.subnet_field("/r31337", "registry_addr"), Some("0xBBBB"));
        assert_eq!(
            reparsed.subnet_field("/r31337", "provider_http"),
            Some("http://127.0.0.1:8545")
        );
        assert_eq!(
            reparsed.subnet_field("/r31337/t410abc", "provider_http"),
            Some("http://127.0.0.1:8645")
        );
        assert_eq!(
            reparsed.get("keystore_path").and_then(Value::as_str),
            Some("~/.ipc")
        );
    }

    #[test]
    fn comments_are_dropped_but_values_survive() {
        let text = format!("# operator notes\n{SAMPLE}");
        let mut config = ConnectionConfig::parse(&text).unwrap();
        config
            .set_subnet_fields("/r31337", &pairs(&[("gateway_addr", "0xAAAA")]), false)
            .unwrap();

        let rendered = config.render().unwrap();
        assert!(!rendered.contains("operator notes"));
        let reparsed = ConnectionConfig::parse(&rendered).unwrap();
        assert_eq!(reparsed.subnet_field("/r31337", "network_type"), Some("fevm"));
        assert_eq!(reparsed.subnet_field("/r31337/t410abc", "network_type"), Some("fevm"));
    }

    #[test]
    fn missing_entry_without_create_is_an_error() {
        let mut config = ConnectionConfig::parse(SAMPLE).unwrap();
        let err = config
            .set_subnet_fields("/r1/none", &pairs(&[("auth_token", "t")]), false)
            .unwrap_err();
        assert!(matches!(err, ConnectionConfigError::SubnetNotFound(ref id) if id == "/r1/none"));
    }

    #[test]
    fn create_if_missing_appends_entry() {
        let mut config = ConnectionConfig::default();
        config
            .set_subnet_fields("/r1/abc", &pairs(&[("network_type", "fevm")]), true)
            .unwrap();
        assert_eq!(config.subnet_field("/r1/abc", "network_type"), Some("fevm"));
    }

    #[test]
    fn wrong_shape_is_reported() {
        let mut config = ConnectionConfig::parse("subnets = \"oops\"").unwrap();
        assert!(matches!(
            config.set_subnet_fields("/r1", &[], true),
            Err(ConnectionConfigError::Shape(_))
        ));
    }

    #[tokio::test]
    async fn load_missing_file_is_empty_and_save_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ipc").join("config.toml");

        let mut config = ConnectionConfig::load(&path).await.unwrap();
        assert_eq!(config, ConnectionConfig::default());

        config
            .set_subnet_fields("/r31337", &pairs(&[("gateway_addr", "0x1")]), true)
            .unwrap();
        config.save(&path).await.unwrap();

        let loaded = ConnectionConfig::load(&path).await.unwrap();
        assert_eq!(loaded.subnet_field("/r31337", "gateway_addr"), Some("0x1"));
        assert!(!path.with_extension("toml.tmp").exists());
    }
}
