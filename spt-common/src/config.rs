//! Configuration loading and resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SPT_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the remaining tiers apply and the
//! outcome is kept in [`ServiceConfig::config_source`] for the caller to log
//! once tracing is up. A TOML file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DATA_FILE: &str = "SPT_DATA_FILE";
pub const ENV_BIND: &str = "SPT_BIND";
pub const ENV_PORT: &str = "SPT_PORT";
pub const ENV_ADMIN_TOKEN: &str = "SPT_ADMIN_TOKEN";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "SPT_FETCH_TIMEOUT_SECS";
pub const ENV_FIXED_AI_RESPONSE: &str = "SPT_FIXED_AI_RESPONSE";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_MODEL: &str = "SPT_OPENAI_MODEL";

const DATA_FILE_NAME: &str = "student_productivity_db.json";

/// Bootstrap configuration loaded from TOML file
///
/// All fields are optional; absent values fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path of the JSON store document
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// Listen address
    #[serde(default)]
    pub bind: Option<IpAddr>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Bearer token for the admin endpoints
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Upper bound on a coding-profile fetch, seconds
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,

    /// Per-room buffer of the live channel
    #[serde(default)]
    pub live_capacity: Option<usize>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Chat assistant configuration (optional)
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// Chat assistant settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Answer used when no stored record matches and no model is reachable
    #[serde(default)]
    pub fixed_response: Option<String>,

    /// Enables the OpenAI chat completion fallback
    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default)]
    pub openai_model: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_file: PathBuf,
    pub bind: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub fetch_timeout: Duration,
    pub live_capacity: usize,
    pub fixed_ai_response: String,
    pub openai_model: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        // ~/.local/share/spt on Linux, the platform data dir elsewhere
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("spt"))
            .unwrap_or_else(|| PathBuf::from("./spt_data"));

        Self {
            data_file: data_dir.join(DATA_FILE_NAME),
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5001,
            log_level: default_log_level(),
            fetch_timeout: Duration::from_secs(10),
            live_capacity: 64,
            fixed_ai_response: "This is the only approved response.".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
        }
    }
}

/// Command-line tier
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub admin_token: Option<String>,
}

/// Where the TOML tier came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Values were read from this file
    Loaded(PathBuf),
    /// This file was looked for and not found
    Missing(PathBuf),
    /// No config file given and no platform config directory
    Unavailable,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_file: PathBuf,
    pub bind: IpAddr,
    pub port: u16,
    /// `None` means admin endpoints refuse every request
    pub admin_token: Option<String>,
    pub fetch_timeout: Duration,
    pub live_capacity: usize,
    pub log_level: String,
    /// Fallback chat answer
    pub fixed_ai_response: String,
    /// `None` disables the model fallback
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub config_source: ConfigSource,
}

impl ServiceConfig {
    /// Resolve every setting across the four tiers
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let config_path = overrides.config_file.clone().or_else(default_config_path);
        let (toml, config_source) = match config_path {
            Some(path) if path.exists() => (load_toml_config(&path)?, ConfigSource::Loaded(path)),
            Some(path) => (TomlConfig::default(), ConfigSource::Missing(path)),
            None => (TomlConfig::default(), ConfigSource::Unavailable),
        };
        let defaults = CompiledDefaults::for_current_platform();

        let data_file = overrides
            .data_file
            .or(env_parsed::<PathBuf>(ENV_DATA_FILE)?)
            .or(toml.data_file)
            .unwrap_or(defaults.data_file);

        let bind = overrides
            .bind
            .or(env_parsed::<IpAddr>(ENV_BIND)?)
            .or(toml.bind)
            .unwrap_or(defaults.bind);

        let port = overrides
            .port
            .or(env_parsed::<u16>(ENV_PORT)?)
            .or(toml.port)
            .unwrap_or(defaults.port);

        let admin_token = overrides
            .admin_token
            .or(env_parsed::<String>(ENV_ADMIN_TOKEN)?)
            .or(toml.admin_token)
            .filter(|token| !token.trim().is_empty());

        let fetch_timeout = env_parsed::<u64>(ENV_FETCH_TIMEOUT_SECS)?
            .or(toml.fetch_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);

        let live_capacity = toml.live_capacity.unwrap_or(defaults.live_capacity);

        let fixed_ai_response = env_parsed::<String>(ENV_FIXED_AI_RESPONSE)?
            .or(toml.assistant.fixed_response)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(defaults.fixed_ai_response);

        let openai_api_key = env_parsed::<String>(ENV_OPENAI_API_KEY)?
            .or(toml.assistant.openai_api_key)
            .filter(|key| !key.trim().is_empty());

        let openai_model = env_parsed::<String>(ENV_OPENAI_MODEL)?
            .or(toml.assistant.openai_model)
            .unwrap_or(defaults.openai_model);

        Ok(Self {
            data_file,
            bind,
            port,
            admin_token,
            fetch_timeout,
            live_capacity,
            log_level: toml.logging.level,
            fixed_ai_response,
            openai_api_key,
            openai_model,
            config_source,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Default config file location: `<config_dir>/spt/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spt").join("config.toml"))
}

/// Load a TOML config file
///
/// Missing file → defaults. Unreadable or malformed file → error.
///
/// Runs before tracing is installed, so nothing is logged here.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok(config)
}

/// Read and parse an environment variable; unset or empty yields `None`
fn env_parsed<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {}: {}", name, e))),
        _ => Ok(None),
    }
}
