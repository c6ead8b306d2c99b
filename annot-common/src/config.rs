//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from a TOML file. Each value can be overridden,
//! in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "ANNOT_ROOT_FOLDER";

/// Environment variable naming an explicit config file
pub const CONFIG_FILE_ENV: &str = "ANNOT_CONFIG";

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5730";

/// Default database file name inside the root folder
pub const DEFAULT_DATABASE_FILE: &str = "annot.db";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional in the file; missing values fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database (and anything else the service persists)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Database file name, relative to the root folder unless absolute
    #[serde(default = "default_database_file")]
    pub database_file: PathBuf,

    /// HTTP bind address (host:port)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Allowed browser origin for CORS (None = no CORS layer)
    #[serde(default)]
    pub cors_origin: Option<String>,

    /// Upper bound for spreadsheet uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Token authentication
    #[serde(default)]
    pub auth: AuthSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_file: default_database_file(),
            bind_address: default_bind_address(),
            cors_origin: None,
            max_upload_bytes: default_max_upload_bytes(),
            auth: AuthSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Token authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret. Absent means development mode (X-User-Id header).
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued tokens in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_database_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_FILE)
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_token_ttl_secs() -> i64 {
    86_400
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, tolerating a missing file
    ///
    /// An explicit path (CLI or `ANNOT_CONFIG`) must exist. Without one, the
    /// platform config locations are probed and defaults are used when none exist.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            return Self::from_file(Path::new(&path));
        }

        match locate_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                tracing::warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Resolve the root folder: CLI → ENV → TOML → compiled default
    pub fn resolve_root_folder(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.root_folder {
            return path.clone();
        }

        default_root_folder()
    }

    /// Database path inside the resolved root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        if self.database_file.is_absolute() {
            self.database_file.clone()
        } else {
            root_folder.join(&self.database_file)
        }
    }
}

/// Find the first existing config file for the platform
fn locate_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("annot").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/annot/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/annot (or /var/lib/annot for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("annot"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/annot"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("annot"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/annot"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("annot"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\annot"))
    } else {
        PathBuf::from("./annot_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_is_empty() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.database_file, PathBuf::from(DEFAULT_DATABASE_FILE));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.auth.token_ttl_secs, 86_400);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_nested_sections_parse() {
        let config = TomlConfig::from_toml_str(
            r#"
            bind_address = "0.0.0.0:8080"
            cors_origin = "http://localhost:3001"

            [auth]
            jwt_secret = "s3cret"
            token_ttl_secs = 60

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:3001"));
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.token_ttl_secs, 60);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("bind_address = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_absolute_database_file_is_kept() {
        let config = TomlConfig {
            database_file: PathBuf::from("/srv/annot/data.db"),
            ..TomlConfig::default()
        };
        assert_eq!(
            config.database_path(Path::new("/tmp/root")),
            PathBuf::from("/srv/annot/data.db")
        );
    }

    #[test]
    fn test_relative_database_file_joins_root() {
        let config = TomlConfig::default();
        assert_eq!(
            config.database_path(Path::new("/tmp/root")),
            PathBuf::from("/tmp/root/annot.db")
        );
    }
}
