//! Configuration loading and client settings resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and defaults are
//! used. A TOML file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default backend host
pub const DEFAULT_API_BASE_URL: &str = "https://api.yalecrush.com";

/// Environment variable overriding the backend host
pub const ENV_API_URL: &str = "CRUSH_API_URL";

/// Environment variable overriding the session file location
pub const ENV_SESSION_FILE: &str = "CRUSH_SESSION_FILE";

/// Environment variable overriding the TOML config file location
pub const ENV_CONFIG_FILE: &str = "CRUSH_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Backend host, e.g. `https://api.yalecrush.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Durable session storage file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,

    /// Transport timeout in seconds; unset means the transport decides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved client settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub request_timeout: Option<Duration>,
    pub logging: LoggingConfig,
}

/// Command-line overrides, highest priority
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

/// Resolves client settings from CLI → ENV → TOML → defaults
pub struct ClientConfigResolver {
    overrides: CliOverrides,
}

impl ClientConfigResolver {
    pub fn new(overrides: CliOverrides) -> Self {
        Self { overrides }
    }

    /// Resolve all settings
    pub fn resolve(&self) -> Result<ClientSettings> {
        let toml_config = match self.config_file_path() {
            Some(path) => load_toml_config(&path)?,
            None => TomlConfig::default(),
        };

        let api_base_url = self
            .overrides
            .api_base_url
            .clone()
            .or_else(|| non_empty_env(ENV_API_URL))
            .or_else(|| toml_config.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let session_file = self
            .overrides
            .session_file
            .clone()
            .or_else(|| non_empty_env(ENV_SESSION_FILE).map(PathBuf::from))
            .or_else(|| toml_config.session_file.clone())
            .unwrap_or_else(default_session_file);

        let settings = ClientSettings {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            session_file,
            request_timeout: toml_config.request_timeout_secs.map(Duration::from_secs),
            logging: toml_config.logging,
        };

        debug!(
            api_base_url = %settings.api_base_url,
            session_file = %settings.session_file.display(),
            "Client settings resolved"
        );

        Ok(settings)
    }

    /// Config file location: CLI → ENV → platform config dir
    pub fn config_file_path(&self) -> Option<PathBuf> {
        self.overrides
            .config_file
            .clone()
            .or_else(|| non_empty_env(ENV_CONFIG_FILE).map(PathBuf::from))
            .or_else(default_config_file)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load TOML config, treating a missing file as defaults
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write TOML config atomically
///
/// Writes to `<path>.tmp` then renames over the target. On Unix the file is
/// restricted to owner read/write.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    write_atomic(path, content.as_bytes())
}

/// Replace `path` with `content` via temp file + rename
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::Io(e));
    }

    Ok(())
}

/// Default TOML config file path for the platform
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("crush").join("client.toml"))
}

/// OS-dependent default session file path
fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("crush").join("session.toml"))
        .unwrap_or_else(|| PathBuf::from("./crush_data/session.toml"))
}
