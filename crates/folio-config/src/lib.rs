//! Configuration management for the Folio wiki.
//!
//! Parses `folio.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `github.token`
//! - `github.owner`
//! - `github.repository`
//! - `github.branch`
//! - `github.api_url`
//! - `redis.address`
//! - `redis.password`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

/// Characters escaped in the URL userinfo (everything but unreserved).
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Which backends hold the wiki.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Local directory only.
    #[default]
    Local,
    /// GitHub repository only.
    GitHub,
    /// Local directory mirrored to a GitHub repository.
    Dual,
}

impl StorageMode {
    /// Whether this mode talks to GitHub.
    #[must_use]
    pub fn uses_github(self) -> bool {
        matches!(self, Self::GitHub | Self::Dual)
    }
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend selection.
    pub storage_mode: StorageMode,
    /// Local storage configuration (paths are relative strings from TOML).
    local: LocalConfigRaw,
    /// GitHub configuration (required for `github` and `dual` modes).
    pub github: Option<GitHubConfig>,
    /// Redis cache configuration.
    pub redis: RedisConfig,
    /// Wiki policy.
    pub wiki: WikiConfig,

    /// Resolved local configuration (set after loading).
    #[serde(skip)]
    pub local_resolved: LocalConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw local configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LocalConfigRaw {
    data_dir: Option<String>,
}

/// Resolved local storage configuration with absolute paths.
#[derive(Debug, Default)]
pub struct LocalConfig {
    /// Directory holding documents and folders.
    pub data_dir: PathBuf,
}

/// GitHub configuration.
#[derive(Deserialize)]
pub struct GitHubConfig {
    /// Personal access token.
    pub token: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Branch receiving commits.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl GitHubConfig {
    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.token, "github.token")?;
        require_non_empty(&self.owner, "github.owner")?;
        require_non_empty(&self.repository, "github.repository")?;
        require_non_empty(&self.branch, "github.branch")?;
        require_non_empty(&self.api_url, "github.api_url")?;
        require_http_url(&self.api_url, "github.api_url")?;
        Ok(())
    }
}

fn default_branch() -> String {
    "main".to_owned()
}

fn default_api_url() -> String {
    "https://api.github.com".to_owned()
}

/// Redis cache configuration.
#[derive(Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Whether to use Redis at all.
    pub enabled: bool,
    /// `host:port` of the server.
    pub address: String,
    /// Optional password (empty for none).
    pub password: String,
    /// Database index.
    pub db: u32,
    /// Entry lifetime in seconds; 0 keeps entries until invalidated.
    pub expiration_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "localhost:6379".to_owned(),
            password: String::new(),
            db: 0,
            expiration_seconds: 900,
        }
    }
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("enabled", &self.enabled)
            .field("address", &self.address)
            .field("password", &(!self.password.is_empty()).then_some("<redacted>"))
            .field("db", &self.db)
            .field("expiration_seconds", &self.expiration_seconds)
            .finish()
    }
}

impl RedisConfig {
    /// Entry lifetime, `None` for no expiry.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        (self.expiration_seconds > 0).then(|| Duration::from_secs(self.expiration_seconds))
    }
}

/// Wiki policy enforced by callers.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// Maximum folder nesting depth.
    pub max_folder_depth: usize,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self { max_folder_depth: 3 }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`github.token`").
        field: String,
        /// Error message (e.g., "${`GITHUB_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `folio.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// an environment variable is missing, or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)
        } else {
            Ok(Self::default_with_cwd())
        }
    }

    /// Get validated GitHub configuration.
    ///
    /// Use this instead of accessing the `github` field directly when the
    /// storage mode requires GitHub.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_github(&self) -> Result<&GitHubConfig, ConfigError> {
        let github = self.github.as_ref().ok_or_else(|| {
            ConfigError::Validation("[github] section required in config".into())
        })?;
        github.validate()?;
        Ok(github)
    }

    /// Connection URL for the Redis client: `redis://[:password@]address/db`.
    ///
    /// The password is percent-encoded.
    #[must_use]
    pub fn redis_url(&self) -> String {
        let redis = &self.redis;
        if redis.password.is_empty() {
            format!("redis://{}/{}", redis.address, redis.db)
        } else {
            let password = utf8_percent_encode(&redis.password, USERINFO);
            format!("redis://:{password}@{}/{}", redis.address, redis.db)
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            storage_mode: StorageMode::default(),
            local: LocalConfigRaw::default(),
            github: None,
            redis: RedisConfig::default(),
            wiki: WikiConfig::default(),
            local_resolved: LocalConfig {
                data_dir: base.join("data"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before validation
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_mode.uses_github() {
            self.require_github()?;
        }
        if self.redis.enabled {
            require_non_empty(&self.redis.address, "redis.address")?;
        }
        if self.wiki.max_folder_depth == 0 {
            return Err(ConfigError::Validation(
                "wiki.max_folder_depth must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref mut github) = self.github {
            github.token = expand::expand_env(&github.token, "github.token")?;
            github.owner = expand::expand_env(&github.owner, "github.owner")?;
            github.repository = expand::expand_env(&github.repository, "github.repository")?;
            github.branch = expand::expand_env(&github.branch, "github.branch")?;
            github.api_url = expand::expand_env(&github.api_url, "github.api_url")?;
        }

        self.redis.address = expand::expand_env(&self.redis.address, "redis.address")?;
        self.redis.password = expand::expand_env(&self.redis.password, "redis.password")?;

        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.local_resolved = LocalConfig {
            data_dir: config_dir.join(self.local.data_dir.as_deref().unwrap_or("data")),
        };
    }
}
