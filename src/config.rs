//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAIL2ISSUE_CONFIG` (environment variable)
//! 2. `~/.config/mail2issue/config.toml` (Linux/macOS)
//!    `%APPDATA%\mail2issue\config.toml` (Windows)
//! 3. Built-in defaults

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MailError, Result};
use crate::parser::DecodeOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where decoded images are published.
    pub images: ImagesConfig,
    /// Issue tracker target.
    pub tracker: TrackerConfig,
    /// Sender email → tracker login mappings.
    pub accounts: AccountsConfig,
    /// Chat notification settings.
    pub chat: ChatConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Title for messages without a subject. Unset means such messages are skipped.
    pub default_title: Option<String>,
}

/// Image hosting settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Directory uploaded images are written to.
    pub output_dir: Option<PathBuf>,
    /// Public URL prefix under which `output_dir` is served.
    /// Defaults to a `file://` URL of the directory.
    pub base_url: Option<String>,
}

/// Issue tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Repository slug, e.g. `"acme/support"`.
    pub repository: Option<String>,
    /// JSON-lines file issues are appended to.
    pub issues_file: Option<PathBuf>,
    /// Labels attached to every created issue.
    pub labels: Vec<String>,
}

/// Account directory used to attribute issues to known senders.
///
/// Lookups go owner → organization members → collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Repository owner.
    pub owner: Option<AccountEntry>,
    /// Organization members, email → login.
    pub members: BTreeMap<String, String>,
    /// Outside collaborators, email → login.
    pub collaborators: BTreeMap<String, String>,
}

/// A single known account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEntry {
    pub login: String,
    pub email: String,
}

/// Chat notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Send a notification for every published issue.
    pub enabled: bool,
    /// JSON-lines file webhook payloads are appended to.
    pub outbox_file: Option<PathBuf>,
    /// Maximum title length in characters.
    pub title_limit: usize,
    /// Maximum body length in characters.
    pub body_limit: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
            default_title: None,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            repository: None,
            issues_file: None,
            labels: vec!["email".to_string()],
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            outbox_file: None,
            title_limit: 256,
            body_limit: 4096,
        }
    }
}

impl Config {
    /// Decoder options derived from this configuration.
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            default_subject: self.general.default_title.clone(),
        }
    }

    /// Check everything `publish` needs, before any message is decoded.
    pub fn require_publish(&self) -> Result<()> {
        if self.images.output_dir.is_none() {
            return Err(MailError::MissingConfig("images.output_dir".into()));
        }
        if self.tracker.issues_file.is_none() {
            return Err(MailError::MissingConfig("tracker.issues_file".into()));
        }
        if self.tracker.repository.is_none() {
            return Err(MailError::MissingConfig("tracker.repository".into()));
        }
        if self.chat.enabled && self.chat.outbox_file.is_none() {
            return Err(MailError::MissingConfig("chat.outbox_file".into()));
        }
        Ok(())
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded config");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load config, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Load configuration from an explicit file.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| MailError::io(path, e))?;
    toml::from_str::<Config>(&contents).map_err(|e| MailError::InvalidConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAIL2ISSUE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mail2issue").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mail2issue")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert!(cfg.general.default_title.is_none());
        assert_eq!(cfg.tracker.labels, vec!["email".to_string()]);
        assert_eq!(cfg.chat.body_limit, 4096);
        assert!(!cfg.chat.enabled);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[general]
default_title = "Email to Issue"

[tracker]
repository = "acme/support"

[accounts.members]
"dev@acme.test" = "dev"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.general.default_title.as_deref(), Some("Email to Issue"));
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.tracker.repository.as_deref(), Some("acme/support"));
        assert_eq!(cfg.tracker.labels, vec!["email".to_string()]);
        assert_eq!(cfg.accounts.members.get("dev@acme.test").map(String::as_str), Some("dev"));
        assert_eq!(
            cfg.decode_options().default_subject.as_deref(),
            Some("Email to Issue")
        );
    }

    #[test]
    fn test_require_publish_fails_fast() {
        let cfg = Config::default();
        let err = cfg.require_publish().unwrap_err();
        assert!(matches!(err, MailError::MissingConfig(ref key) if key == "images.output_dir"));

        let mut cfg = Config::default();
        cfg.images.output_dir = Some(PathBuf::from("/tmp/img"));
        cfg.tracker.issues_file = Some(PathBuf::from("/tmp/issues.jsonl"));
        cfg.tracker.repository = Some("acme/support".to_string());
        assert!(cfg.require_publish().is_ok());

        cfg.chat.enabled = true;
        assert!(cfg.require_publish().is_err());
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.chat.title_limit, cfg.chat.title_limit);
        assert_eq!(parsed.tracker.labels, cfg.tracker.labels);
    }

    #[test]
    fn test_load_config_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general\nbroken").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(MailError::InvalidConfig { .. })
        ));
    }
}
