//! Connector configuration loader.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectorAppConfig {
    #[serde(default)]
    pub connector: ConnectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Bearer token for the connector API, obtained out of band.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    skype_activity::DEFAULT_TIMEOUT.as_secs()
}

impl ConnectorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ConnectorAppConfig {
    /// Loads `path`, or the default location when `None`. A missing file at
    /// the default location yields the defaults; an explicit path must exist.
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(default_config_path);
        let mut cfg = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::parse(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                Self::default()
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("SKYPE_CONNECTOR_AUTH_TOKEN").ok(),
            std::env::var("SKYPE_CONNECTOR_TIMEOUT_SECS").ok(),
        );
    }

    fn apply_overrides(&mut self, auth_token: Option<String>, timeout_secs: Option<String>) {
        if let Some(v) = auth_token {
            if !v.trim().is_empty() {
                self.connector.auth_token = Some(v);
            }
        }
        if let Some(v) = timeout_secs {
            match v.trim().parse::<u64>() {
                Ok(secs) => self.connector.request_timeout_secs = secs,
                Err(error) => tracing::warn!(
                    value = %v,
                    %error,
                    "ignoring invalid SKYPE_CONNECTOR_TIMEOUT_SECS"
                ),
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.connector.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "connector.request_timeout_secs must be > 0"
            ));
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".skype-connector").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::ConnectorAppConfig;
    use std::time::Duration;

    #[test]
    fn parse_applies_defaults_for_missing_sections() {
        let cfg = ConnectorAppConfig::parse("").expect("empty config parses");
        assert_eq!(cfg.connector.request_timeout_secs, 30);
        assert!(cfg.connector.auth_token.is_none());

        let cfg = ConnectorAppConfig::parse("[connector]\nauth_token = \"abc\"\n")
            .expect("partial config parses");
        assert_eq!(cfg.connector.auth_token.as_deref(), Some("abc"));
        assert_eq!(cfg.connector.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn overrides_replace_values_and_skip_blanks() {
        let mut cfg = ConnectorAppConfig::default();
        cfg.apply_overrides(Some("tok".to_string()), Some("12".to_string()));
        assert_eq!(cfg.connector.auth_token.as_deref(), Some("tok"));
        assert_eq!(cfg.connector.request_timeout_secs, 12);

        cfg.apply_overrides(Some("   ".to_string()), Some("soon".to_string()));
        assert_eq!(cfg.connector.auth_token.as_deref(), Some("tok"));
        assert_eq!(cfg.connector.request_timeout_secs, 12);
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = ConnectorAppConfig::parse("[connector]\nrequest_timeout_secs = 0\n")
            .expect("config parses");
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[connector]\nrequest_timeout_secs = 7\n")
            .await
            .expect("write config");
        let cfg = ConnectorAppConfig::load(Some(path))
            .await
            .expect("config loads");
        assert_eq!(cfg.connector.request_timeout_secs, 7);
    }

    #[tokio::test]
    async fn load_fails_for_missing_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = ConnectorAppConfig::load(Some(dir.path().join("absent.toml"))).await;
        assert!(result.is_err());
    }
}
