// crates/lti-provider-config/src/config.rs
// ============================================================================
// Module: LTI Provider Configuration
// Description: Configuration loading and validation for the LTI provider.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: lti-provider-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a provider with a bad
//! consumer table or auth block never starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use lti_provider_core::DEFAULT_LOGIN_URL;
use lti_provider_core::DEFAULT_MAX_SESSIONS;
use lti_provider_core::HandshakeConfig;
use lti_provider_core::RUN_PATH;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "lti-provider.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "LTI_PROVIDER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of LTI consumers.
pub const MAX_CONSUMERS: usize = 256;
/// Maximum number of bearer tokens.
pub const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a bearer token.
pub const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Default user header for `trusted_header` auth.
pub const DEFAULT_USER_HEADER: &str = "x-lti-provider-user";
/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "lti_provider_session";
/// Default bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default content root directory.
const DEFAULT_CONTENT_ROOT: &str = "content";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// LTI provider configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LtiProviderConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// LTI handshake configuration.
    #[serde(default)]
    pub lti: LtiConfig,
    /// User authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Session cookie and store configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Content renderer configuration.
    #[serde(default)]
    pub content: ContentConfig,
}

impl LtiProviderConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.lti.validate()?;
        self.auth.validate()?;
        self.session.validate()?;
        self.content.validate()
    }

    /// Returns the handshake settings derived from `[lti]`.
    #[must_use]
    pub fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            enabled: self.lti.enabled,
            login_url: self.lti.login_url.clone(),
            run_path: RUN_PATH.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// External base URL consumers sign against (scheme + authority).
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_base_url: None,
            max_body_bytes: default_max_body_bytes(),
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the bind address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Returns the public base URL without a trailing slash.
    #[must_use]
    pub fn public_base(&self) -> Option<&str> {
        self.public_base_url.as_deref().map(|url| url.trim().trim_end_matches('/'))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if let Some(base) = &self.public_base_url {
            let parsed = Url::parse(base.trim()).map_err(|_| {
                ConfigError::Invalid("server.public_base_url must be an absolute url".to_string())
            })?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                return Err(ConfigError::Invalid(
                    "server.public_base_url must include http:// or https:// and a host"
                        .to_string(),
                ));
            }
            if parsed.query().is_some() || parsed.fragment().is_some() {
                return Err(ConfigError::Invalid(
                    "server.public_base_url must not include a query or fragment".to_string(),
                ));
            }
        }
        self.audit.validate()
    }
}

/// Audit sink configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines). Stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: LTI
// ============================================================================

/// LTI handshake configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LtiConfig {
    /// Process-wide provider switch. Off unless explicitly enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Login page for unauthenticated launches.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Registered tool consumers.
    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,
}

impl Default for LtiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            login_url: default_login_url(),
            consumers: Vec::new(),
        }
    }
}

impl LtiConfig {
    /// Validates LTI configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.login_url.starts_with('/') || self.login_url.starts_with("//") {
            return Err(ConfigError::Invalid(
                "lti.login_url must be an absolute path".to_string(),
            ));
        }
        if self.login_url.contains(['?', '#']) || self.login_url.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "lti.login_url must not include a query, fragment, or whitespace".to_string(),
            ));
        }
        if self.consumers.len() > MAX_CONSUMERS {
            return Err(ConfigError::Invalid("too many lti consumers".to_string()));
        }
        let mut seen = BTreeSet::new();
        for consumer in &self.consumers {
            if consumer.key.trim().is_empty() {
                return Err(ConfigError::Invalid("consumer key must be non-empty".to_string()));
            }
            if consumer.secret.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "consumer secret must be non-empty: {}",
                    consumer.key
                )));
            }
            if !seen.insert(consumer.key.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate consumer key: {}",
                    consumer.key
                )));
            }
        }
        Ok(())
    }
}

/// A registered tool consumer and its shared secret.
#[derive(Clone, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer key sent as `oauth_consumer_key`.
    pub key: String,
    /// Shared HMAC secret.
    pub secret: String,
}

impl fmt::Debug for ConsumerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerConfig")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// SECTION: Auth
// ============================================================================

/// How inbound requests identify their user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// A fronting proxy asserts the user in a header.
    #[default]
    TrustedHeader,
    /// `Authorization: Bearer` tokens mapped to users.
    BearerToken,
}

/// User authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Authentication mode.
    #[serde(default)]
    pub mode: AuthMode,
    /// Header carrying the user in `trusted_header` mode.
    #[serde(default = "default_user_header")]
    pub header: String,
    /// Token table for `bearer_token` mode.
    #[serde(default)]
    pub bearer_tokens: Vec<BearerTokenConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            header: default_user_header(),
            bearer_tokens: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.header.is_empty()
            || !self.header.bytes().all(|byte| is_token_byte(byte) && !byte.is_ascii_uppercase())
        {
            return Err(ConfigError::Invalid(
                "auth.header must be a lower-case http header name".to_string(),
            ));
        }
        if self.bearer_tokens.len() > MAX_AUTH_TOKENS {
            return Err(ConfigError::Invalid("too many auth tokens".to_string()));
        }
        let mut seen = BTreeSet::new();
        for entry in &self.bearer_tokens {
            if entry.token.trim().is_empty() {
                return Err(ConfigError::Invalid("auth token must be non-empty".to_string()));
            }
            if entry.token.len() > MAX_AUTH_TOKEN_LENGTH {
                return Err(ConfigError::Invalid("auth token too long".to_string()));
            }
            if entry.user.trim().is_empty() {
                return Err(ConfigError::Invalid("auth token user must be non-empty".to_string()));
            }
            if !seen.insert(entry.token.as_str()) {
                return Err(ConfigError::Invalid("duplicate auth token".to_string()));
            }
        }
        if self.mode == AuthMode::BearerToken && self.bearer_tokens.is_empty() {
            return Err(ConfigError::Invalid(
                "bearer_token mode requires bearer_tokens".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bearer token mapped to a user.
#[derive(Clone, Deserialize)]
pub struct BearerTokenConfig {
    /// Raw token value.
    pub token: String,
    /// User the token authenticates as.
    pub user: String,
}

impl fmt::Debug for BearerTokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenConfig")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

// ============================================================================
// SECTION: Session & Content
// ============================================================================

/// Session cookie and store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session cookie name.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the cookie `Secure`.
    #[serde(default)]
    pub secure_cookie: bool,
    /// Maximum live sessions before oldest-first eviction.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure_cookie: false,
            max_sessions: default_max_sessions(),
        }
    }
}

impl SessionConfig {
    /// Validates session configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie_name.is_empty() || !self.cookie_name.bytes().all(is_token_byte) {
            return Err(ConfigError::Invalid(
                "session.cookie_name must be a non-empty token".to_string(),
            ));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "session.max_sessions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// File content renderer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Directory holding `<course_id>/<usage_id>.html` files.
    #[serde(default = "default_content_root")]
    pub root: String,
    /// Maximum rendered file size in bytes.
    #[serde(default = "default_content_max_bytes")]
    pub max_bytes: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: default_content_root(),
            max_bytes: default_content_max_bytes(),
        }
    }
}

impl ContentConfig {
    /// Validates content configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("content.root", &self.root)?;
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "content.max_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// RFC 9110 `tchar`.
const fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default login page.
fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

/// Default user header.
fn default_user_header() -> String {
    DEFAULT_USER_HEADER.to_string()
}

/// Default session cookie name.
fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

/// Default session bound.
const fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

/// Default content root.
fn default_content_root() -> String {
    DEFAULT_CONTENT_ROOT.to_string()
}

/// Default maximum rendered file size.
const fn default_content_max_bytes() -> usize {
    1024 * 1024
}
