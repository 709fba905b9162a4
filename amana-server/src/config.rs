//! Server configuration
//!
//! Defaults, then an optional TOML file, then environment overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file read when `AMANA_CONFIG` is not set, if it exists
pub const DEFAULT_CONFIG_FILE: &str = "amana.toml";

/// Built-in allow-list of API tokens
pub const DEFAULT_API_TOKENS: &[&str] = &[
    "amana-admin-7f3c9e2a41b8",
    "amana-staff-2d6b1f8c93e4",
    "amana-partner-5a9e7c3b1d20",
];

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An environment override has an invalid value
    #[error("Invalid value for {name}: {reason}")]
    Env { name: &'static str, reason: String },
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_address: String,

    /// Directory holding `books.json` and `reviews.json`
    pub data_dir: PathBuf,

    /// Tokens accepted by the write endpoints
    pub api_tokens: BTreeSet<String>,

    /// Verbose request logging
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            data_dir: PathBuf::from("data"),
            api_tokens: DEFAULT_API_TOKENS.iter().map(|t| t.to_string()).collect(),
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` for environment variables
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("AMANA_CONFIG") {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("AMANA_BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Some(dir) = lookup("AMANA_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(tokens) = lookup("AMANA_API_TOKENS") {
            let tokens: BTreeSet<String> = tokens
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if tokens.is_empty() {
                return Err(ConfigError::Env {
                    name: "AMANA_API_TOKENS",
                    reason: "no tokens given".to_string(),
                });
            }
            self.api_tokens = tokens;
        }
        if let Some(debug) = lookup("DEBUG") {
            self.debug = parse_flag(&debug);
        }
        Ok(())
    }
}

/// `1`, `true`, `yes` and `on` (any case) enable a flag; anything else disables it
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.api_tokens.len(), DEFAULT_API_TOKENS.len());
        assert!(!config.debug);
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::load_with(env(&[
            ("AMANA_BIND_ADDRESS", "127.0.0.1:8088"),
            ("AMANA_DATA_DIR", "/var/lib/amana"),
            ("AMANA_API_TOKENS", "alpha, beta,,"),
            ("DEBUG", "1"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:8088");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/amana"));
        assert_eq!(
            config.api_tokens.iter().cloned().collect::<Vec<_>>(),
            vec!["alpha", "beta"]
        );
        assert!(config.debug);
    }

    #[test]
    fn test_debug_flag_values() {
        for value in ["1", "true", "TRUE", "yes", "on"] {
            let config = ServerConfig::load_with(env(&[("DEBUG", value)])).unwrap();
            assert!(config.debug, "DEBUG={}", value);
        }
        for value in ["0", "false", "no", "off", ""] {
            let config = ServerConfig::load_with(env(&[("DEBUG", value)])).unwrap();
            assert!(!config.debug, "DEBUG={}", value);
        }
    }

    #[test]
    fn test_empty_token_override_rejected() {
        let err = ServerConfig::load_with(env(&[("AMANA_API_TOKENS", " , ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_address = \"127.0.0.1:9000\"").unwrap();
        writeln!(file, "api_tokens = [\"from-file\"]").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = ServerConfig::load_with(env(&[
            ("AMANA_CONFIG", path.as_str()),
            ("AMANA_DATA_DIR", "elsewhere"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.data_dir, PathBuf::from("elsewhere"));
        assert!(config.api_tokens.contains("from-file"));
        assert_eq!(config.api_tokens.len(), 1);
    }

    #[test]
    fn test_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_address = 42").unwrap();
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            ServerConfig::from_file("/definitely/not/here.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
