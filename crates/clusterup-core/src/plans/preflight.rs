//! Eager configuration checks run while a plan is built.
//!
//! Nothing destructive has happened yet when these fail.

use clusterup_types::config::{ClusterConfig, NetworkKind};
use clusterup_types::error::ConfigError;
use clusterup_types::secret::AUTH_TOKEN_ENV;
use secrecy::{ExposeSecret, SecretString};

/// Credentials a non-local run cannot do without, plus basic timing sanity.
pub fn check(config: &ClusterConfig, auth_token: Option<&SecretString>) -> Result<(), ConfigError> {
    check_timing(config)?;

    if config.network == NetworkKind::Local {
        return Ok(());
    }

    let has_token = auth_token.is_some_and(|t| !t.expose_secret().trim().is_empty());
    if !has_token {
        return Err(ConfigError::Missing(format!(
            "parent.auth_token (or {AUTH_TOKEN_ENV}) is required for non-local networks"
        )));
    }

    let has_supply = config
        .parent
        .supply_source
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());
    if !has_supply {
        return Err(ConfigError::Missing(
            "parent.supply_source is required for non-local networks".to_string(),
        ));
    }

    Ok(())
}

/// Poll settings every plan relies on.
pub fn check_timing(config: &ClusterConfig) -> Result<(), ConfigError> {
    if config.readiness.interval_ms == 0 || config.readiness.timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "readiness interval_ms and timeout_ms must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn local_run_needs_no_credentials() {
        check(&ClusterConfig::default(), None).unwrap();
    }

    #[test]
    fn testnet_without_token_is_rejected() {
        let mut config = ClusterConfig::default();
        config.network = NetworkKind::Testnet;
        config.parent.supply_source = Some("0xabc".to_string());

        let err = check(&config, None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref m) if m.contains("auth_token")));

        let blank = token("   ");
        assert!(check(&config, Some(&blank)).is_err());

        check(&config, Some(&token("tok"))).unwrap();
    }

    #[test]
    fn testnet_without_supply_source_is_rejected() {
        let mut config = ClusterConfig::default();
        config.network = NetworkKind::Testnet;
        let err = check(&config, Some(&token("tok"))).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref m) if m.contains("supply_source")));
    }

    #[test]
    fn zero_poll_timeout_is_invalid() {
        let mut config = ClusterConfig::default();
        config.readiness.timeout_ms = 0;
        assert!(matches!(
            check(&config, None),
            Err(ConfigError::Invalid(_))
        ));
    }
}
