use serde::{Deserialize, Serialize};

use std::fmt;

/// Environment variable consulted when the config file carries no auth token.
pub const AUTH_TOKEN_ENV: &str = "CLUSTERUP_AUTH_TOKEN";

/// A wrapper that redacts secret values in Debug and Display output.
///
/// Used for the parent RPC auth token so it never reaches logs, plan dumps,
/// or the persisted parameter snapshot. The value is accessible via `.expose()`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Show masked representation: last 4 chars visible.
    pub fn masked(&self) -> String {
        if self.0.len() <= 4 {
            "****".to_string()
        } else {
            format!("****{}", &self.0[self.0.len() - 4..])
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Redacted(\"***\")")
    }
}

impl fmt::Display for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_debug_hides_value() {
        let secret = Redacted::new("tok-abc123xyz");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("abc123xyz"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn redacted_display_hides_value() {
        let secret = Redacted::new("tok-abc123xyz");
        assert!(!secret.to_string().contains("abc123xyz"));
    }

    #[test]
    fn redacted_expose_and_mask() {
        let secret = Redacted::new("tok-abc123xyz");
        assert_eq!(secret.expose(), "tok-abc123xyz");
        assert_eq!(secret.masked(), "****3xyz");
        assert_eq!(Redacted::new("ab").masked(), "****");
    }

    #[test]
    fn redacted_deserializes_from_plain_string() {
        let secret: Redacted = serde_json::from_str("\"hunter2\"").unwrap();
        assert_eq!(secret.expose(), "hunter2");
        assert!(Redacted::new("  ").is_empty());
    }
}
