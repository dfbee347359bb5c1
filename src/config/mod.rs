//! Configuration management for the gateway.
//!
//! Configuration is read from `~/.config/runnel/config.toml` at startup
//! (or from the file passed with `--config`). If the default file doesn't
//! exist, a default configuration with comments is created.
//!
//! Command-line flags are collected into [`GatewayOptions`] and layered on
//! top of the file with [`Config::apply_options`].

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub feed: FeedConfig,
}

/// Listener and IRC server identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Server name used as the prefix of numerics, MODE and NOTICE lines
    pub name: String,
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 16672,
            name: "hatettergw".to_string(),
            version: "0.0.0".to_string(),
        }
    }
}

/// Remote feed and polling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub api_base: String,
    /// Value of the `source` query parameter sent with every API call
    pub source: String,
    pub channel: String,
    /// Upper bound of API requests per hour shared by all poll categories
    pub hourly_limit: u32,
    pub startup_delay_secs: u64,
    pub recent_window: usize,
    pub default_ratio: String,
    pub resolve_timeout_secs: u64,
    /// Replaces the client's real-name field as the option string
    pub name: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: "http://hatetter.blogdb.jp/".to_string(),
            source: "hig.rb".to_string(),
            channel: "#hatena".to_string(),
            hourly_limit: 150,
            startup_delay_secs: 3,
            recent_window: 200,
            default_ratio: "10:3:5".to_string(),
            resolve_timeout_secs: 3,
            name: None,
        }
    }
}

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
}

/// Process options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub log: Option<PathBuf>,
    pub debug: bool,
    pub foreground: bool,
    pub name: Option<String>,
}

impl GatewayOptions {
    /// `--debug` and `--foreground` force stdout, otherwise `--log` wins.
    pub fn log_target(&self) -> LogTarget {
        if self.debug || self.foreground {
            return LogTarget::Stdout;
        }
        match &self.log {
            Some(path) => LogTarget::File(path.clone()),
            None => LogTarget::Stdout,
        }
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// An explicit path must exist. A missing default file is created with
    /// commented defaults. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/runnel/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("runnel").join("config.toml"))
    }

    /// Command-line values override the file.
    pub fn apply_options(&mut self, options: &GatewayOptions) {
        if let Some(host) = &options.host {
            self.server.host = host.clone();
        }
        if let Some(port) = options.port {
            self.server.port = port;
        }
        if let Some(name) = &options.name {
            self.feed.name = Some(name.clone());
        }
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# Runnel Configuration
#
# Command-line flags (--host, --port, --name) override these values.

[server]
# Address the IRC listener binds to
host = "localhost"
port = 16672

# Name shown as the source of numerics, MODE and NOTICE lines
name = "hatettergw"
version = "0.0.0"

[feed]
# Base URL of the status API
api_base = "http://hatetter.blogdb.jp/"

# Sent as the `source` query parameter
source = "hig.rb"

# Channel the timeline is relayed into
channel = "#hatena"

# API requests per hour, split between poll categories by the client's ratio
hourly_limit = 150

# Seconds to wait after registration before the first poll
startup_delay_secs = 3

# Number of recently delivered status IDs remembered for deduplication
recent_window = 200

# Default ratio (timeline:friends:channel) when the client gives none
default_ratio = "10:3:5"

# Timeout in seconds when resolving short links
resolve_timeout_secs = 3

# Uncomment to ignore the client's real name and use this option string
# name = "hatena-id ratio=10:3:5"
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert_eq!(config.server.port, 16672);
        assert_eq!(config.server.name, "hatettergw");
        assert_eq!(config.feed.channel, "#hatena");
        assert_eq!(config.feed.hourly_limit, 150);
        assert_eq!(config.feed.default_ratio, "10:3:5");
        assert!(config.feed.name.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[feed]
channel = "#timeline"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.feed.channel, "#timeline");
        assert_eq!(config.feed.recent_window, 200);
        assert_eq!(config.server.host, "localhost");
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.feed.api_base, "http://hatetter.blogdb.jp/");
        assert_eq!(config.feed.resolve_timeout_secs, 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 6667\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.server.port, 6667);
        assert_eq!(config.server.name, "hatettergw");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_apply_options_overrides() {
        let mut config = Config::default();
        let options = GatewayOptions {
            port: Some(7000),
            host: Some("0.0.0.0".into()),
            name: Some("alice ratio=1:1:1".into()),
            ..Default::default()
        };

        config.apply_options(&options);

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.feed.name.as_deref(), Some("alice ratio=1:1:1"));
    }

    #[test]
    fn test_log_target() {
        let mut options = GatewayOptions {
            log: Some(PathBuf::from("/tmp/runnel.log")),
            ..Default::default()
        };
        assert_eq!(
            options.log_target(),
            LogTarget::File(PathBuf::from("/tmp/runnel.log"))
        );
        assert_eq!(options.log_level(), "info");

        options.foreground = true;
        assert_eq!(options.log_target(), LogTarget::Stdout);

        options.foreground = false;
        options.debug = true;
        assert_eq!(options.log_target(), LogTarget::Stdout);
        assert_eq!(options.log_level(), "debug");
    }
}
