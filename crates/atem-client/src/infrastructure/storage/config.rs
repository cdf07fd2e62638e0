//! TOML-based configuration for the client application.
//!
//! The config file lives at the platform-appropriate location unless a path
//! is given on the command line:
//! - Windows:  `%APPDATA%\AtemClient\config.toml`
//! - Linux:    `~/.config/atem-client/config.toml`
//! - macOS:    `~/Library/Application Support/AtemClient/config.toml`
//!
//! Example:
//!
//! ```toml
//! [switcher]
//! address = "192.168.10.240"
//! model = "ATEM Mini Pro"
//!
//! [client]
//! tick_interval_ms = 10
//! log_level = "debug"
//!
//! [engine]
//! connection_timeout_ms = 5000
//! ```
//!
//! Every field has a serde default, so a missing file, a missing table, or a
//! missing key all fall back to working values.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use atem_core::protocol::messages::ATEM_PORT;
use atem_core::EngineConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `switcher.address` is not an IP address.
    #[error("invalid switcher address {0:?}")]
    InvalidAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub switcher: SwitcherConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Where the switcher is and what it is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitcherConfig {
    /// IPv4 or IPv6 address of the switcher.
    #[serde(default = "default_address")]
    pub address: String,
    /// UDP control port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Product name used for advisory input validation, e.g. `"ATEM Mini"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Local runtime behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Local UDP port to bind.  0 picks an ephemeral port.
    #[serde(default)]
    pub local_port: u16,
    /// How often the engine is ticked.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_address() -> String {
    "192.168.10.240".to_string()
}
fn default_port() -> u16 {
    ATEM_PORT
}
fn default_tick_interval_ms() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            model: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            local_port: 0,
            tick_interval_ms: default_tick_interval_ms(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// The switcher's control endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `switcher.address` does not
    /// parse as an IP address.
    pub fn switcher_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .switcher
            .address
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.switcher.address.clone()))?;
        Ok(SocketAddr::new(ip, self.switcher.port))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path for this platform.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("AtemClient"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("atem-client"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("AtemClient")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
