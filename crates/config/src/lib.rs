//! Configuration loading, validation, and management for PropDesk.
//!
//! Loads configuration from `~/.propdesk/config.toml` with environment
//! variable overrides. Validates all settings at startup, including the
//! access table: a protected resource with no allowed roles is unreachable
//! and is rejected here rather than at request time.

use propdesk_core::caller::RoleLabel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.propdesk/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Providers tried, in order, after the default provider fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<String>,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Identity resolution settings
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Assistant dispatch settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Protected resources and their allowed roles
    #[serde(default)]
    pub access: AccessConfig,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("fallback_providers", &self.fallback_providers)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .field("identity", &self.identity)
            .field("assistant", &self.assistant)
            .field("access", &self.access)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Per-provider timeout inside a fallback chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum accepted request body
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Requests per minute per client before 429
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,

    /// Extra allowed CORS origins
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Audit entries kept in memory; older ones are dropped
    #[serde(default = "default_audit_retention")]
    pub audit_retention: usize,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    64 * 1024
}
fn default_rate_limit() -> usize {
    60
}
fn default_audit_retention() -> usize {
    1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit(),
            rate_limit_per_minute: default_rate_limit(),
            allowed_origins: vec![],
            audit_retention: default_audit_retention(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Bounded wait for identity resolution
    #[serde(default = "default_identity_timeout_ms")]
    pub timeout_ms: u64,

    /// Static bearer-token sessions (development and tests)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sessions: Vec<SessionConfig>,
}

fn default_identity_timeout_ms() -> u64 {
    10_000
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_identity_timeout_ms(),
            sessions: vec![],
        }
    }
}

/// A bearer token mapped to a subject and its roles.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("token", &"[REDACTED]")
            .field("subject", &self.subject)
            .field("roles", &self.roles)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Bounded wait for each provider attempt
    #[serde(default = "default_assistant_timeout")]
    pub timeout_secs: u64,

    /// Total submissions per request (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between retries
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_assistant_timeout() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    1
}
fn default_retry_backoff() -> u64 {
    500
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_assistant_timeout(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Where unauthenticated callers are sent
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Resource id → allowed role labels. Every list must be non-empty.
    #[serde(default = "default_resources")]
    pub resources: BTreeMap<String, Vec<String>>,
}

fn default_login_path() -> String {
    "/login".into()
}

fn default_resources() -> BTreeMap<String, Vec<String>> {
    let staff = vec!["admin".to_string(), "superadmin".to_string()];
    let everyone = vec![
        "client".to_string(),
        "admin".to_string(),
        "superadmin".to_string(),
    ];
    BTreeMap::from([
        ("admin.dashboard".to_string(), staff.clone()),
        ("admin.assistant".to_string(), staff),
        ("client.dashboard".to_string(), everyone.clone()),
        ("client.assistant".to_string(), everyone),
    ])
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            resources: default_resources(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.propdesk/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `PROPDESK_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("PROPDESK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("PROPDESK_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("PROPDESK_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".propdesk")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.assistant.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.timeout_secs must be > 0".into(),
            ));
        }

        if self.assistant.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.max_attempts must be at least 1".into(),
            ));
        }

        if self.identity.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "identity.timeout_ms must be > 0".into(),
            ));
        }

        for (resource, roles) in &self.access.resources {
            if !roles.iter().any(|r| RoleLabel::parse(r).is_some()) {
                return Err(ConfigError::EmptyAllowedRoles {
                    resource: resource.clone(),
                });
            }
        }

        if self.identity.sessions.iter().any(|s| s.token.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "identity.sessions entries need a non-empty token".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            fallback_providers: vec![],
            providers: HashMap::new(),
            gateway: GatewayConfig::default(),
            identity: IdentityConfig::default(),
            assistant: AssistantConfig::default(),
            access: AccessConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Resource '{resource}' declares no allowed roles and would be unreachable")]
    EmptyAllowedRoles { resource: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openrouter");
        assert_eq!(config.gateway.port, 42618);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_access_table_guards_both_surfaces() {
        let access = AccessConfig::default();
        assert_eq!(access.login_path, "/login");
        assert_eq!(access.resources["admin.assistant"], vec!["admin", "superadmin"]);
        assert!(access.resources["client.assistant"].contains(&"client".to_string()));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.access.resources, config.access.resources);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_allowed_roles_rejected_at_load() {
        let toml_str = r#"
[access.resources]
"admin.dashboard" = ["admin"]
"admin.reports" = []
"#;
        match AppConfig::from_toml_str(toml_str) {
            Err(ConfigError::EmptyAllowedRoles { resource }) => assert_eq!(resource, "admin.reports"),
            other => panic!("Expected EmptyAllowedRoles, got: {other:?}"),
        }
    }

    #[test]
    fn blank_only_roles_count_as_empty() {
        let toml_str = r#"
[access.resources]
"client.dashboard" = ["  "]
"#;
        assert!(matches!(
            AppConfig::from_toml_str(toml_str),
            Err(ConfigError::EmptyAllowedRoles { .. })
        ));
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = AppConfig {
            assistant: AssistantConfig {
                max_attempts: 0,
                ..AssistantConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sessions_parse_and_redact() {
        let toml_str = r#"
[[identity.sessions]]
token = "tok-admin"
subject = "ops@example.com"
roles = ["admin"]
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.identity.sessions.len(), 1);
        assert_eq!(config.identity.sessions[0].roles, vec!["admin"]);
        let debug = format!("{config:?}");
        assert!(!debug.contains("tok-admin"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().default_provider, "openrouter");
    }

    #[test]
    fn load_from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_temperature = \"hot\"").unwrap();
        match AppConfig::load_from(&path) {
            Err(ConfigError::ParseError { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected ParseError, got: {other:?}"),
        }
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("admin.assistant"));
    }
}
