//! Environment-driven configuration structures shared by every service that
//! pulls in jetpack.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use thiserror::Error;

use crate::logging::LogLevel;

pub const DEFAULT_BASE_PATH: &str = "code/data";
pub const DEFAULT_MAX_BYTES: u64 = 100_000_000;
pub const DEFAULT_BACKUP_COUNT: usize = 5;
pub const DEFAULT_DEFER_MODULES: [&str; 2] = ["httpx", "pymongo"];
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";

/// Logging knobs read from `LOG_*`, `ENABLE_*_LOG` and `DEFER_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    log_level: LogLevel,
    enable_file_log: bool,
    enable_console_log: bool,
    enable_traceback: bool,
    defer_log_modules: Vec<String>,
    defer_additional_logs: Vec<String>,
    defer_log_level: LogLevel,
    max_bytes: u64,
    backup_count: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            enable_file_log: false,
            enable_console_log: true,
            enable_traceback: false,
            defer_log_modules: DEFAULT_DEFER_MODULES.iter().map(|m| m.to_string()).collect(),
            defer_additional_logs: Vec::new(),
            defer_log_level: LogLevel::Info,
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }
}

impl LogConfig {
    /// Loads the logging variables, falling back to the defaults for anything
    /// unset. Present-but-malformed values surface as `ConfigError`.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;
        let defaults = Self::default();

        Ok(Self {
            log_level: parse_var("LOG_LEVEL", parse_level)?.unwrap_or(defaults.log_level),
            enable_file_log: parse_var("ENABLE_FILE_LOG", parse_bool)?
                .unwrap_or(defaults.enable_file_log),
            enable_console_log: parse_var("ENABLE_CONSOLE_LOG", parse_bool)?
                .unwrap_or(defaults.enable_console_log),
            enable_traceback: parse_var("LOG_ENABLE_TRACEBACK", parse_bool)?
                .unwrap_or(defaults.enable_traceback),
            defer_log_modules: parse_var("DEFER_LOG_MODULES", parse_list)?
                .unwrap_or(defaults.defer_log_modules),
            defer_additional_logs: parse_var("DEFER_ADDITIONAL_LOGS", parse_list)?
                .unwrap_or(defaults.defer_additional_logs),
            defer_log_level: parse_var("DEFER_LOG_LEVEL", parse_level)?
                .unwrap_or(defaults.defer_log_level),
            max_bytes: parse_var("LOG_MAX_BYTES", parse_number)?.unwrap_or(defaults.max_bytes),
            backup_count: parse_var("LOG_BACKUP_COUNT", parse_number)?
                .unwrap_or(defaults.backup_count),
        })
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn enable_file_log(&self) -> bool {
        self.enable_file_log
    }

    pub fn enable_console_log(&self) -> bool {
        self.enable_console_log
    }

    /// Reserved; parsed so deployments can set it, not consulted yet.
    pub fn enable_traceback(&self) -> bool {
        self.enable_traceback
    }

    pub fn defer_log_modules(&self) -> &[String] {
        &self.defer_log_modules
    }

    pub fn defer_additional_logs(&self) -> &[String] {
        &self.defer_additional_logs
    }

    /// Default and additional deferred modules, in that order.
    pub fn deferred_modules(&self) -> impl Iterator<Item = &str> {
        self.defer_log_modules
            .iter()
            .chain(self.defer_additional_logs.iter())
            .map(String::as_str)
    }

    pub fn defer_log_level(&self) -> LogLevel {
        self.defer_log_level
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn backup_count(&self) -> usize {
        self.backup_count
    }
}

/// Base data directory plus the module name the log directory is derived
/// from. `logs_path` is recomputed whenever either input changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    base_path: PathBuf,
    module_name: String,
    logs_path: PathBuf,
}

impl PathConfig {
    pub fn new(base_path: impl Into<PathBuf>, module_name: impl Into<String>) -> Self {
        let base_path = base_path.into();
        let module_name = module_name.into();
        let logs_path = derive_logs_path(&base_path, &module_name);
        Self {
            base_path,
            module_name,
            logs_path,
        }
    }

    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let base_path =
            get_optional_var("BASE_PATH").unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());
        let module_name = get_optional_var("MODULE_NAME").unwrap_or_default();
        Ok(Self::new(base_path, module_name))
    }

    pub fn with_base_path(self, base_path: impl Into<PathBuf>) -> Self {
        Self::new(base_path, self.module_name)
    }

    pub fn with_module_name(self, module_name: impl Into<String>) -> Self {
        Self::new(self.base_path, module_name)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn logs_path(&self) -> &Path {
        &self.logs_path
    }

    /// Target file for the rotating sink of `project_name`.
    pub fn log_file_path(&self, project_name: &str) -> PathBuf {
        let stem = if project_name.is_empty() {
            "app"
        } else {
            project_name
        };
        self.logs_path.join(format!("{stem}.log"))
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PATH, "")
    }
}

/// `<base>/logs/<module with '-' replaced by '_'>`. An empty module name
/// yields `<base>/logs` without a trailing separator.
pub fn derive_logs_path(base_path: &Path, module_name: &str) -> PathBuf {
    let logs = base_path.join("logs");
    let segment = normalize_module_name(module_name);
    if segment.is_empty() {
        logs
    } else {
        logs.join(segment)
    }
}

pub fn normalize_module_name(module_name: &str) -> String {
    module_name.replace('-', "_")
}

/// Bind target for the reference HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    bind_address: String,
}

impl ServerConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        Ok(Self {
            bind_address: get_optional_var("API_BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
        })
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_var<T>(
    key: &'static str,
    parse: fn(&'static str, &str) -> Result<T, ConfigError>,
) -> Result<Option<T>, ConfigError> {
    get_optional_var(key)
        .map(|value| parse(key, &value))
        .transpose()
}

fn parse_level(key: &'static str, value: &str) -> Result<LogLevel, ConfigError> {
    LogLevel::from_str(value).map_err(|_| ConfigError::InvalidLevel {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    value
        .parse()
        .map_err(|source| ConfigError::InvalidNumber { key, source })
}

/// Accepts a JSON array of strings or a comma-separated string.
fn parse_list(key: &'static str, value: &str) -> Result<Vec<String>, ConfigError> {
    let items: Vec<String> = if value.starts_with('[') {
        serde_json::from_str(value).map_err(|source| ConfigError::InvalidList { key, source })?
    } else {
        value.split(',').map(str::to_string).collect()
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("JETPACK_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level `{value}` in `{key}`")]
    InvalidLevel { key: &'static str, value: String },
    #[error("invalid boolean `{value}` in `{key}`")]
    InvalidBool { key: &'static str, value: String },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid list in `{key}`: {source}")]
    InvalidList {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
