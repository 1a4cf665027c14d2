//! Cluster configuration loader.
//!
//! Reads `cluster.toml` (`~/.clusterup/cluster.toml` unless overridden) into
//! [`ClusterConfig`]. A missing file yields defaults; a malformed file is an
//! error.

use std::path::{Path, PathBuf};

use clusterup_core::plans::StatePaths;
use clusterup_types::config::ClusterConfig;
use clusterup_types::secret::AUTH_TOKEN_ENV;
use secrecy::SecretString;
use thiserror::Error;

/// Directory under `$HOME` holding config and run state.
pub const DEFAULT_DIR_NAME: &str = ".clusterup";

pub const CONFIG_FILE_NAME: &str = "cluster.toml";

/// Connection table file name inside the state directory.
pub const CONNECTION_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot determine home directory; set state_dir in {CONFIG_FILE_NAME}")]
    NoHomeDir,
}

/// `~/.clusterup`, if a home directory exists.
pub fn default_state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_DIR_NAME))
}

/// `~/.clusterup/cluster.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    default_state_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Load cluster configuration from `path`.
pub async fn load_cluster_config(path: &Path) -> Result<ClusterConfig, ConfigLoadError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {} found at {}, using defaults", CONFIG_FILE_NAME, path.display());
            return Ok(ClusterConfig::default());
        }
        Err(source) => {
            return Err(ConfigLoadError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config = toml::from_str::<ClusterConfig>(&content).map_err(|source| {
        ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tracing::debug!(path = %path.display(), nodes = config.nodes.len(), "loaded cluster config");
    Ok(config)
}

/// Resolve the state directory and connection table path.
///
/// `state_dir` defaults to `~/.clusterup`; `ipc_config_path` defaults to
/// `<state_dir>/config.toml`. A leading `~/` is expanded in both.
pub fn resolve_state_paths(config: &ClusterConfig) -> Result<StatePaths, ConfigLoadError> {
    let home = dirs::home_dir();
    let state_dir = match &config.state_dir {
        Some(dir) => expand_home(dir, home.as_deref()),
        None => home
            .as_deref()
            .map(|h| h.join(DEFAULT_DIR_NAME))
            .ok_or(ConfigLoadError::NoHomeDir)?,
    };
    let ipc_config_path = match &config.ipc_config_path {
        Some(path) => expand_home(path, home.as_deref()),
        None => state_dir.join(CONNECTION_FILE_NAME),
    };
    Ok(StatePaths::new(state_dir, ipc_config_path))
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Parent auth token: the config value, else `CLUSTERUP_AUTH_TOKEN`.
pub fn resolve_auth_token(config: &ClusterConfig) -> Option<SecretString> {
    auth_token_from(config, std::env::var(AUTH_TOKEN_ENV).ok())
}

fn auth_token_from(config: &ClusterConfig, env_value: Option<String>) -> Option<SecretString> {
    if let Some(token) = config.parent.auth_token.as_ref().filter(|t| !t.is_empty()) {
        return Some(SecretString::from(token.expose().to_string()));
    }
    env_value
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterup_types::config::NetworkKind;
    use clusterup_types::secret::Redacted;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_cluster_config(&tmp.path().join(CONFIG_FILE_NAME))
            .await
            .unwrap();
        assert_eq!(config.network, NetworkKind::Local);
        assert_eq!(config.nodes.len(), 3);
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(
            &path,
            r#"
network = "testnet"
state_dir = "/var/lib/cup"

[parent]
id = "/r314159"
rpc_url = "https://api.calibration.node.glif.io/rpc/v1"
supply_source = "0xabc"
"#,
        )
        .await
        .unwrap();

        let config = load_cluster_config(&path).await.unwrap();
        assert_eq!(config.network, NetworkKind::Testnet);
        assert_eq!(config.parent.id, "/r314159");
        assert_eq!(config.parent.supply_source.as_deref(), Some("0xabc"));
        assert_eq!(config.readiness.interval_ms, 2000);
    }

    #[tokio::test]
    async fn malformed_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, "network = [not valid").await.unwrap();

        let err = load_cluster_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn explicit_paths_win() {
        let mut config = ClusterConfig::default();
        config.state_dir = Some(PathBuf::from("/srv/cup"));
        let paths = resolve_state_paths(&config).unwrap();
        assert_eq!(paths.state_dir, PathBuf::from("/srv/cup"));
        assert_eq!(paths.ipc_config_path, PathBuf::from("/srv/cup/config.toml"));

        config.ipc_config_path = Some(PathBuf::from("/etc/ipc/config.toml"));
        let paths = resolve_state_paths(&config).unwrap();
        assert_eq!(paths.ipc_config_path, PathBuf::from("/etc/ipc/config.toml"));
    }

    #[test]
    fn tilde_expands_against_home() {
        let home = Path::new("/home/op");
        assert_eq!(
            expand_home(Path::new("~/.ipc/config.toml"), Some(home)),
            PathBuf::from("/home/op/.ipc/config.toml")
        );
        assert_eq!(
            expand_home(Path::new("/abs/path"), Some(home)),
            PathBuf::from("/abs/path")
        );
        assert_eq!(expand_home(Path::new("~/x"), None), PathBuf::from("~/x"));
    }

    #[test]
    fn config_token_beats_environment() {
        let mut config = ClusterConfig::default();
        config.parent.auth_token = Some(Redacted::new("from-file"));
        let token = auth_token_from(&config, Some("from-env".to_string())).unwrap();
        assert_eq!(token.expose_secret(), "from-file");
    }

    #[test]
    fn environment_token_is_the_fallback() {
        let mut config = ClusterConfig::default();
        let token = auth_token_from(&config, Some("from-env".to_string())).unwrap();
        assert_eq!(token.expose_secret(), "from-env");

        config.parent.auth_token = Some(Redacted::new("  "));
        assert!(auth_token_from(&config, Some(" ".to_string())).is_none());
        assert!(auth_token_from(&config, None).is_none());
    }
}
