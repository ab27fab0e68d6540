//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `PANELPOST_DATA_DIR` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. With no file anywhere, runs on defaults
//!
//! ## Environment Variables
//! - `PANELPOST_DATA_DIR`: Durable state directory (selects env loading)
//! - `PANELPOST_SESSION_DIR`: Short-lived state directory
//! - `PANELPOST_CLIENT_ID`: OAuth client id (enables the OAuth block)
//! - `PANELPOST_REDIRECT_URI`: OAuth redirect URI
//! - `PANELPOST_SCOPE`: OAuth scope
//! - `PANELPOST_PDS_URL`: Authorization server / PDS origin
//! - `PANELPOST_PASSWORD_SERVICE`: Service used for app password login
//! - `PANELPOST_UPLOAD_CONCURRENCY`: Parallel uploads per thread
//! - `PANELPOST_MAX_UPLOAD_BYTES`: Byte budget per image
//! - `PANELPOST_COMPRESSION_MODE`: `standard`, `high-quality` or `disabled`
//! - `PANELPOST_SCHEDULER_INTERVAL_SECS`: Scheduler poll interval
//! - `PANELPOST_SCHEDULER_FAILURE_POLICY`: `retain-on-failure` or
//!   `delete-on-failure`
//! - `PANELPOST_LOG_JSON`: Emit JSON logs (true/false)
//! - `PANELPOST_LOG_FILTER`: `EnvFilter` directive
//!
//! ## File Locations
//! The loader probes `panelpost.{toml,json}` then `config.{toml,json}` in
//! the current directory, its parent, and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use panelpost_domain::{
    Config, LoggingConfig, OAuthConfig, PanelPostError, PasswordAuthConfig, PostingConfig, Result,
    SchedulerConfig, StorageConfig,
};

const FILE_NAMES: [&str; 4] = ["panelpost.toml", "panelpost.json", "config.toml", "config.json"];
const DEFAULT_SCOPE: &str = "atproto transition:generic";

/// Load configuration with automatic fallback strategy
///
/// Environment first, then the first config file found, then defaults.
///
/// # Errors
/// Returns `PanelPostError::Config` if the chosen source is invalid.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path)),
                None => {
                    tracing::info!("No configuration file found, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }
}

/// Load configuration from environment variables
///
/// `PANELPOST_DATA_DIR` is required; everything else falls back to its
/// default. Setting `PANELPOST_CLIENT_ID` enables OAuth, which then also
/// needs `PANELPOST_REDIRECT_URI` and `PANELPOST_PDS_URL`.
///
/// # Errors
/// Returns `PanelPostError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let data_dir = PathBuf::from(env_var("PANELPOST_DATA_DIR")?);
    let storage_defaults = StorageConfig::default();
    let session_dir = env_opt("PANELPOST_SESSION_DIR")
        .map(PathBuf::from)
        .unwrap_or(storage_defaults.session_dir);

    let oauth = match env_opt("PANELPOST_CLIENT_ID") {
        Some(client_id) => {
            let oauth = OAuthConfig {
                client_id,
                redirect_uri: env_var("PANELPOST_REDIRECT_URI")?,
                scope: env_opt("PANELPOST_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
                pds_url: env_var("PANELPOST_PDS_URL")?,
            };
            oauth.validate()?;
            Some(oauth)
        }
        None => None,
    };

    let password_defaults = PasswordAuthConfig::default();
    let posting_defaults = PostingConfig::default();
    let scheduler_defaults = SchedulerConfig::default();

    Ok(Config {
        oauth,
        password: PasswordAuthConfig {
            service: env_opt("PANELPOST_PASSWORD_SERVICE").unwrap_or(password_defaults.service),
        },
        posting: PostingConfig {
            concurrency: env_parse("PANELPOST_UPLOAD_CONCURRENCY", posting_defaults.concurrency)?,
            max_upload_bytes: env_parse(
                "PANELPOST_MAX_UPLOAD_BYTES",
                posting_defaults.max_upload_bytes,
            )?,
            compression_mode: env_parse(
                "PANELPOST_COMPRESSION_MODE",
                posting_defaults.compression_mode,
            )?,
        },
        scheduler: SchedulerConfig {
            interval_seconds: env_parse(
                "PANELPOST_SCHEDULER_INTERVAL_SECS",
                scheduler_defaults.interval_seconds,
            )?,
            failure_policy: env_parse(
                "PANELPOST_SCHEDULER_FAILURE_POLICY",
                scheduler_defaults.failure_policy,
            )?,
        },
        storage: StorageConfig { data_dir, session_dir },
        logging: LoggingConfig {
            json: env_bool("PANELPOST_LOG_JSON", false),
            filter: env_opt("PANELPOST_LOG_FILTER"),
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is chosen by
/// extension.
///
/// # Errors
/// Returns `PanelPostError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The OAuth block fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PanelPostError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PanelPostError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PanelPostError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    if let Some(oauth) = &config.oauth {
        oauth.validate()?;
    }
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PanelPostError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PanelPostError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(PanelPostError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first existing file, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        PanelPostError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Non-empty environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| PanelPostError::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
