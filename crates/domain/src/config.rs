//! Configuration management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SCHEDULER_INTERVAL_SECS, DEFAULT_UPLOAD_CONCURRENCY,
};
use crate::errors::{PanelPostError, Result};
use crate::types::image::CompressionMode;
use crate::types::schedule::FailurePolicy;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub oauth: Option<OAuthConfig>,
    pub password: PasswordAuthConfig,
    pub posting: PostingConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// OAuth client registration used to start and finish an authorization.
///
/// Also persisted with a pending authorization so the callback can finish the
/// flow against the same server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub pds_url: String,
}

impl OAuthConfig {
    /// Reject configurations with blank required fields.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("scope", &self.scope),
            ("pds_url", &self.pds_url),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(PanelPostError::Config(format!("OAuth {name} is missing")));
            }
        }
        Ok(())
    }
}

/// Legacy identifier + app password login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordAuthConfig {
    pub service: String,
}

impl Default for PasswordAuthConfig {
    fn default() -> Self {
        Self { service: "https://bsky.social".to_string() }
    }
}

/// Upload pipeline tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    pub concurrency: usize,
    pub max_upload_bytes: u64,
    pub compression_mode: CompressionMode,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            compression_mode: CompressionMode::Standard,
        }
    }
}

/// Scheduler polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_seconds: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_SCHEDULER_INTERVAL_SECS,
            failure_policy: FailurePolicy::DeleteOnFailure,
        }
    }
}

/// Where durable and short-lived state live.
///
/// `session_dir` holds the session encryption key and pending authorizations.
/// It defaults to a per-user runtime location (`$XDG_RUNTIME_DIR/panelpost`,
/// otherwise a user-named directory under the OS temp dir), so it is cleared
/// at logout or reboot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub session_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".panelpost"),
            session_dir: default_session_dir(),
        }
    }
}

fn default_session_dir() -> PathBuf {
    if let Some(runtime) = std::env::var_os("XDG_RUNTIME_DIR").filter(|dir| !dir.is_empty()) {
        return PathBuf::from(runtime).join("panelpost");
    }
    let user: String = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    let user = if user.is_empty() { "default".to_string() } else { user };
    std::env::temp_dir().join(format!("panelpost-session-{user}"))
}

/// Log output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth() -> OAuthConfig {
        OAuthConfig {
            client_id: "https://app.example/client-metadata.json".into(),
            redirect_uri: "https://app.example/callback".into(),
            scope: "atproto transition:generic".into(),
            pds_url: "https://pds.example".into(),
        }
    }

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = Config::default();
        assert_eq!(config.posting.concurrency, 3);
        assert_eq!(config.posting.max_upload_bytes, 900_000);
        assert_eq!(config.scheduler.interval_seconds, 30);
        assert_eq!(config.scheduler.failure_policy, FailurePolicy::DeleteOnFailure);
        assert!(config.oauth.is_none());
    }

    #[test]
    fn session_dir_is_not_a_shared_temp_path() {
        let dir = StorageConfig::default().session_dir;
        assert_ne!(dir, std::env::temp_dir().join("panelpost-session"));

        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name == "panelpost" || name.starts_with("panelpost-session-"), "{name}");
    }

    #[test]
    fn oauth_validation_rejects_blank_fields() {
        assert!(oauth().validate().is_ok());

        let mut missing_scope = oauth();
        missing_scope.scope = "  ".into();
        match missing_scope.validate() {
            Err(PanelPostError::Config(msg)) => assert!(msg.contains("scope")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn oauth_config_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(oauth()).unwrap();
        assert!(json.get("clientId").is_some());
        assert!(json.get("redirectUri").is_some());
        assert!(json.get("pdsUrl").is_some());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"posting": {"concurrency": 5}}"#).unwrap();
        assert_eq!(config.posting.concurrency, 5);
        assert_eq!(config.posting.max_upload_bytes, 900_000);
        assert_eq!(config.password.service, "https://bsky.social");
    }
}
