//! Service configuration.
//!
//! Precedence: CLI > environment > config file > defaults. The config file is
//! `--config` (or `SNAKEBITE_CONFIG`) when given, else `./snakebite.toml` if present.

use crate::translate::QueryDefaults;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "snakebite.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("cannot parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("invalid listen address '{0}'")]
    Listen(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen: SocketAddr,
    /// `None` keeps the store in memory.
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    /// `None` logs to the console only.
    pub log_dir: Option<PathBuf>,
    pub query: QueryDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8000)),
            data_dir: None,
            log_level: "info".to_string(),
            log_dir: None,
            query: QueryDefaults::default(),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config: Option<PathBuf>,
    pub listen: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Loads using the process environment.
    ///
    /// # Errors
    /// See [`AppConfig::load_with`].
    pub fn load(cli: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_with(cli, |key| std::env::var(key).ok())
    }

    /// Loads with `env` standing in for the process environment.
    ///
    /// # Errors
    /// An explicit config file that cannot be read or parsed, or a listen
    /// address that is not `host:port`.
    pub fn load_with<F>(cli: &ConfigOverrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = cli.config.clone().or_else(|| env("SNAKEBITE_CONFIG").map(PathBuf::from));
        let mut cfg = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() { Self::from_file(&local)? } else { Self::default() }
            }
        };

        if let Some(s) = env("SNAKEBITE_LISTEN") {
            cfg.listen = parse_listen(&s)?;
        }
        if let Some(s) = env("SNAKEBITE_DATA_DIR") {
            cfg.data_dir = Some(PathBuf::from(s));
        }
        if let Some(s) = env("SNAKEBITE_LOG_LEVEL") {
            cfg.log_level = s;
        }
        if let Some(s) = env("SNAKEBITE_LOG_DIR") {
            cfg.log_dir = Some(PathBuf::from(s));
        }

        if let Some(s) = &cli.listen {
            cfg.listen = parse_listen(s)?;
        }
        if let Some(p) = &cli.data_dir {
            cfg.data_dir = Some(p.clone());
        }
        if let Some(l) = &cli.log_level {
            cfg.log_level.clone_from(l);
        }
        Ok(cfg)
    }

    /// # Errors
    /// The file cannot be read or is not valid TOML for this shape.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

fn parse_listen(s: &str) -> Result<SocketAddr, ConfigError> {
    s.trim().parse().map_err(|_| ConfigError::Listen(s.to_string()))
}
