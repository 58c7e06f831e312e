use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "PIPELINE_MONITOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

impl Config {
    /// Load the configuration from `PIPELINE_MONITOR_CONFIG`, or `config.yml`.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_path(&path)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Overall deadline for handling a single event, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { port: 8080, request_timeout_secs: default_request_timeout() } }
}

fn default_request_timeout() -> u64 { 60 }

/// GitHub credential source. Exactly one of `token` or `token_secret` is
/// expected; an inline token wins when both are set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// Name of the Secrets Manager secret holding `{"token": "..."}`.
    pub token_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AwsConfig {
    /// Region override; the SDK default provider chain is used when unset.
    pub region: Option<String>,
    /// Region of the Secrets Manager secret, when it differs from `region`.
    pub secrets_region: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Pipeline stage that represents the inbound source trigger.
    #[serde(default = "default_source_stage")]
    pub source_stage: String,
    /// Maximum number of log lines embedded in a build log comment.
    #[serde(default = "default_log_line_limit")]
    pub log_line_limit: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { source_stage: default_source_stage(), log_line_limit: default_log_line_limit() }
    }
}

fn default_source_stage() -> String { "Source".to_string() }

// GetLogEvents returns at most 10,000 events per call.
fn default_log_line_limit() -> u32 { 10_000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = serde_yaml::from_str("github:\n  token: abc\n").unwrap();
        assert_eq!(config.github.token.as_deref(), Some("abc"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.relay.source_stage, "Source");
        assert_eq!(config.relay.log_line_limit, 10_000);
        assert!(config.aws.region.is_none());
    }

    #[test]
    fn test_relay_overrides() {
        let yaml = "relay:\n  source_stage: Checkout\n  log_line_limit: 200\nserver:\n  port: 9000\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.relay.source_stage, "Checkout");
        assert_eq!(config.relay.log_line_limit, 200);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout_secs, 60);
    }
}
