//! Configuration loading and database path resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "AIRPLAY_CONFIG";

/// Environment variable naming the SQLite database file
pub const DATABASE_ENV_VAR: &str = "AIRPLAY_DATABASE";

/// Contents of the TOML config file; every section is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Database file path (overridden by CLI and environment)
    pub database: Option<PathBuf>,
    pub server: ServerConfig,
    pub database_pool: DatabasePoolConfig,
    pub logging: LoggingConfig,
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabasePoolConfig {
    pub max_connections: u32,
    /// SQLite busy_timeout applied to every connection
    pub busy_timeout_ms: u64,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback tracing filter when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Limit used by `get_top` when the request omits one
    pub default_limit: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self { default_limit: 40 }
    }
}

/// Config file resolution priority:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory, if the file exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    default_config_path().filter(|path| path.exists())
}

/// Where the loaded settings came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No config file was named or found
    Defaults,
    /// Settings read from this file
    File(PathBuf),
    /// The named file does not exist; defaults are in effect
    MissingFile(PathBuf),
}

/// Loaded settings together with their origin
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

/// Load the TOML config
///
/// A missing file is not fatal: defaults are used and the fallback is
/// reported as `ConfigSource::MissingFile` so the caller can log it once
/// logging is up. A file that exists but does not parse is a configuration
/// error.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    let Some(path) = path else {
        return Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Defaults,
        });
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LoadedConfig {
                config: TomlConfig::default(),
                source: ConfigSource::MissingFile(path.to_path_buf()),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    Ok(LoadedConfig {
        config,
        source: ConfigSource::File(path.to_path_buf()),
    })
}

/// Database path resolution priority:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.database {
        return path.clone();
    }

    default_database_path()
}

/// `<config dir>/airplay/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("airplay").join("config.toml"))
}

/// Get OS-dependent default database path
fn default_database_path() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/airplay (or /var/lib/airplay for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("airplay"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/airplay"))
            .join("airplay.db")
    } else if cfg!(target_os = "macos") || cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("airplay"))
            .unwrap_or_else(|| PathBuf::from("./airplay_data"))
            .join("airplay.db")
    } else {
        PathBuf::from("./airplay_data/airplay.db")
    }
}
