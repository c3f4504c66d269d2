use serde::{Deserialize, Serialize};

/// Credentials and options for one terminal session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mt5Config {
    /// Account number.
    pub login: i64,
    /// Account password.
    pub password: String,
    /// Broker server name, e.g. `"MetaQuotes-Demo"`.
    pub server: String,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Path to the terminal executable, when not auto-discovered.
    #[serde(default)]
    pub terminal_path: Option<String>,
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Mt5Config {
    /// Creates a config with the default timeout and no explicit path.
    pub fn new(login: i64, password: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            login,
            password: password.into(),
            server: server.into(),
            timeout_ms: default_timeout_ms(),
            terminal_path: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_applies_defaults() {
        let config: Mt5Config = serde_json::from_str(
            r#"{"login": 123456, "password": "secret", "server": "Demo-Server"}"#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 60_000);
        assert!(config.terminal_path.is_none());
    }
}
