//! Configuration Management
//!
//! Optional JSON config file for inspector-mock. Every setting resolves as
//! CLI flag > config file > environment > built-in default.

use crate::inspector::catalog;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Address to bind
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Region used when a request carries no credential scope
    #[serde(default)]
    pub default_region: Option<String>,
    /// Served regions
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("inspector-mock").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a given file; a missing file yields the
    /// defaults, an unreadable or malformed one an error
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config {:?}", path))
    }

    /// Get effective host (CLI > config > default)
    pub fn effective_host(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    /// Get effective port (CLI > config > default)
    pub fn effective_port(&self, cli: Option<u16>) -> u16 {
        cli.or(self.port).unwrap_or(DEFAULT_PORT)
    }

    /// Get effective default region (CLI > config > AWS env > default)
    pub fn effective_default_region(&self, cli: Option<&str>) -> String {
        self.default_region_with(cli, env_var)
    }

    fn default_region_with(&self, cli: Option<&str>, env: impl Fn(&str) -> Option<String>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.default_region.clone())
            .or_else(|| env("AWS_DEFAULT_REGION"))
            .or_else(|| env("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Get served regions (config > catalog)
    pub fn effective_regions(&self) -> Vec<String> {
        self.regions
            .clone()
            .filter(|regions| !regions.is_empty())
            .unwrap_or_else(|| catalog::supported_regions().to_vec())
    }

    /// Get effective account id (config > env > default)
    pub fn effective_account_id(&self) -> String {
        self.account_id_with(env_var)
    }

    fn account_id_with(&self, env: impl Fn(&str) -> Option<String>) -> String {
        self.account_id
            .clone()
            .or_else(|| env("INSPECTOR_MOCK_ACCOUNT_ID"))
            .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.effective_host(None), "127.0.0.1");
        assert_eq!(config.effective_port(None), 5000);
        assert_eq!(config.default_region_with(None, no_env), "us-east-1");
        assert_eq!(config.account_id_with(no_env), "123456789012");
        assert_eq!(config.effective_regions(), catalog::supported_regions().to_vec());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            host: Some("0.0.0.0".to_string()),
            port: Some(8080),
            default_region: Some("eu-west-1".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_host(Some("localhost")), "localhost");
        assert_eq!(config.effective_host(None), "0.0.0.0");
        assert_eq!(config.effective_port(Some(9000)), 9000);
        assert_eq!(config.effective_port(None), 8080);
        assert_eq!(config.default_region_with(Some("ap-south-1"), no_env), "ap-south-1");
        assert_eq!(config.default_region_with(None, no_env), "eu-west-1");
    }

    #[test]
    fn test_env_below_config() {
        let env = |key: &str| match key {
            "AWS_REGION" => Some("eu-central-1".to_string()),
            "INSPECTOR_MOCK_ACCOUNT_ID" => Some("999999999999".to_string()),
            _ => None,
        };

        let config = Config::default();
        assert_eq!(config.default_region_with(None, env), "eu-central-1");
        assert_eq!(config.account_id_with(env), "999999999999");

        let config = Config {
            default_region: Some("us-west-2".to_string()),
            account_id: Some("111111111111".to_string()),
            ..Default::default()
        };
        assert_eq!(config.default_region_with(None, env), "us-west-2");
        assert_eq!(config.account_id_with(env), "111111111111");
    }

    #[test]
    fn test_aws_default_region_wins_over_aws_region() {
        let env = |key: &str| match key {
            "AWS_DEFAULT_REGION" => Some("sa-east-1".to_string()),
            "AWS_REGION" => Some("eu-central-1".to_string()),
            _ => None,
        };
        assert_eq!(Config::default().default_region_with(None, env), "sa-east-1");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("inspector-mock-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"port": 4567, "regions": ["us-east-1"]}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.effective_port(None), 4567);
        assert_eq!(config.effective_regions(), vec!["us-east-1".to_string()]);
        assert!(config.host.is_none());

        std::fs::write(&path, "not json").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid config"));

        std::fs::remove_file(&path).unwrap();
        assert!(Config::load_from(&path).unwrap().port.is_none());
    }
}
