// src/config.rs

//! Tool configuration: `bulkctl.toml` in the working directory or the user
//! config dir, with `BULKCTL_*` environment overrides on top.

use crate::constants::{CONFIG_FILENAME, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_THREADS};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on concurrent batch workers.
    pub max_threads: usize,
    /// Attempt budget for one remote call.
    pub max_attempts: u32,
    /// Base URL of the directory API.
    pub api_base_url: String,
    /// Static bearer token presented to the API.
    pub auth_token: Option<String>,
    /// Default charset for batch and CSV input files.
    pub charset: String,
    /// Interactive debug mode; mutually exclusive with reading batch input
    /// from stdin.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            api_base_url: "https://api.directory.example.com/v1".to_string(),
            auth_token: None,
            charset: "utf-8".to_string(),
            debug: false,
        }
    }
}

/// Loads the configuration: the first `bulkctl.toml` found (working
/// directory, then user config dir), or the defaults, then environment
/// overrides.
pub fn load() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    for path in candidate_paths() {
        if path.is_file() {
            let text = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
            config = toml::from_str(&text)
                .map_err(|source| ConfigError::Parse { path, source })?;
            break;
        }
    }
    Ok(apply_env(config, |name| std::env::var(name).ok()))
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILENAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("bulkctl").join(CONFIG_FILENAME));
    }
    paths
}

/// Applies `BULKCTL_*` overrides through an injected lookup so tests do
/// not touch the process environment.
fn apply_env(mut config: Config, get: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(threads) = get("BULKCTL_THREADS").and_then(|v| v.parse().ok()) {
        config.max_threads = threads;
    }
    if let Some(attempts) = get("BULKCTL_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
        config.max_attempts = attempts;
    }
    if let Some(url) = get("BULKCTL_API_BASE_URL") {
        config.api_base_url = url;
    }
    if let Some(token) = get("BULKCTL_AUTH_TOKEN") {
        config.auth_token = Some(token);
    }
    if let Some(charset) = get("BULKCTL_CHARSET") {
        config.charset = charset;
    }
    if let Some(debug) = get("BULKCTL_DEBUG") {
        config.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "on" | "yes");
    }
    config
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_threads, DEFAULT_MAX_THREADS);
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.charset, "utf-8");
        assert!(!config.debug);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("max_threads = 12\n").unwrap();
        assert_eq!(config.max_threads, 12);
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_full_toml() {
        let text = r#"
            max_threads = 8
            max_attempts = 3
            api_base_url = "https://directory.corp.example/api"
            auth_token = "sekrit"
            charset = "utf-8"
            debug = true
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.max_threads, 8);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.api_base_url, "https://directory.corp.example/api");
        assert_eq!(config.auth_token.as_deref(), Some("sekrit"));
        assert!(config.debug);
    }

    #[test]
    fn test_env_overrides() {
        let config = apply_env(Config::default(), |name| match name {
            "BULKCTL_THREADS" => Some("9".to_string()),
            "BULKCTL_DEBUG" => Some("true".to_string()),
            "BULKCTL_AUTH_TOKEN" => Some("tok".to_string()),
            _ => None,
        });
        assert_eq!(config.max_threads, 9);
        assert!(config.debug);
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_malformed_env_value_is_ignored() {
        let config = apply_env(Config::default(), |name| match name {
            "BULKCTL_THREADS" => Some("many".to_string()),
            _ => None,
        });
        assert_eq!(config.max_threads, DEFAULT_MAX_THREADS);
    }
}
