//! Service configuration.
//!
//! Layered with the `config` crate: struct defaults, then an optional TOML
//! file, then `SSO__*` environment variables (`SSO__HTTP__PORT=8080`).

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable consulted for the config path when no flag is given.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "SSO";

const MIN_ADMIN_TOKEN_LEN: usize = 32;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("storage_path must not be empty")]
    EmptyStoragePath,

    #[error("invalid storage_path: {0}")]
    StoragePath(String),

    #[error("token_ttl must be greater than zero")]
    ZeroTokenTtl,

    #[error("http.timeout must be greater than zero")]
    ZeroTimeout,

    #[error("auth.password_cost must be between 4 and 31, got {0}")]
    InvalidPasswordCost(u32),

    #[error("http.admin_token must be at least 32 characters long")]
    AdminTokenTooShort,

    #[error("http.admin_token is required when env = \"prod\"")]
    AdminTokenRequired,

    #[error("invalid http.host: {0:?}")]
    InvalidHost(String),

    #[error("environment variable '{0}' not found (referenced via env:{0} in config)")]
    EnvVarNotFound(String),

    #[error("environment variable '{0}' is empty (referenced via env:{0} in config)")]
    EnvVarEmpty(String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    #[default]
    Local,
    Dev,
    Prod,
}

impl Env {
    /// Log level used when neither flags nor `RUST_LOG` say otherwise.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Env::Local | Env::Dev => "debug",
            Env::Prod => "info",
        }
    }

    /// Whether logs should be emitted as JSON.
    pub fn json_logs(&self) -> bool {
        matches!(self, Env::Prod)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub env: Env,

    /// SQLite database file, or `:memory:`.
    pub storage_path: PathBuf,

    /// Lifetime of minted tokens, e.g. `"1h"`.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,

    pub auth: AuthConfig,

    pub http: HttpConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Env::default(),
            storage_path: PathBuf::from("./storage/sso.db"),
            token_ttl: Duration::from_secs(60 * 60),
            auth: AuthConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Password hashing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// bcrypt cost factor.
    pub password_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,

    pub port: u16,

    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Bearer token guarding the administrative routes.
    /// Supports `env:VAR_NAME`. Administrative routes are open when unset.
    pub admin_token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 44044,
            timeout: Duration::from_secs(10),
            admin_token: None,
        }
    }
}

impl HttpConfig {
    /// Host to bind, with IPv6 brackets removed. May be a name such as `localhost`.
    pub fn bind_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    /// Whether `host` is an IP address or a syntactically valid host name.
    fn host_is_valid(&self) -> bool {
        let host = self.bind_host();
        if host.parse::<IpAddr>().is_ok() {
            return true;
        }
        !host.is_empty()
            && host.len() <= 253
            && host.split('.').all(|label| {
                !label.is_empty()
                    && label.len() <= 63
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
    }
}

/// Pick the config file: explicit flag first, then `CONFIG_PATH`.
pub fn resolve_config_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.or_else(|| {
        std::env::var_os(CONFIG_PATH_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
}

impl AppConfig {
    /// Load, resolve and validate configuration.
    ///
    /// A path that is given but missing is an error; without a path only
    /// defaults and environment variables apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_from(path, env)
    }

    fn load_from(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let built = builder.add_source(env).build()?;
        let config: AppConfig = built.try_deserialize()?;
        config.resolve()
    }

    /// Expand `storage_path`, resolve `env:` indirections and validate.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        let raw = self.storage_path.to_string_lossy().into_owned();
        if raw.trim().is_empty() {
            return Err(ConfigError::EmptyStoragePath);
        }
        let expanded =
            shellexpand::full(&raw).map_err(|e| ConfigError::StoragePath(e.to_string()))?;
        self.storage_path = PathBuf::from(expanded.as_ref());

        self.http.admin_token = self.resolve_admin_token()?;
        self.validate()?;
        Ok(self)
    }

    /// Resolve the admin token, expanding `env:VAR_NAME` syntax.
    pub fn resolve_admin_token(&self) -> Result<Option<String>, ConfigError> {
        match &self.http.admin_token {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(token) if !token.is_empty() => Ok(Some(token)),
                        Ok(_) => Err(ConfigError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStoragePath);
        }
        if self.token_ttl.is_zero() {
            return Err(ConfigError::ZeroTokenTtl);
        }
        if self.http.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(4..=31).contains(&self.auth.password_cost) {
            return Err(ConfigError::InvalidPasswordCost(self.auth.password_cost));
        }
        if !self.http.host_is_valid() {
            return Err(ConfigError::InvalidHost(self.http.host.clone()));
        }
        match &self.http.admin_token {
            Some(token) if token.len() < MIN_ADMIN_TOKEN_LEN => {
                return Err(ConfigError::AdminTokenTooShort);
            }
            None if self.env == Env::Prod => return Err(ConfigError::AdminTokenRequired),
            _ => {}
        }
        Ok(())
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.http.admin_token.is_some() {
            copy.http.admin_token = Some("<redacted>".to_string());
        }
        copy
    }
}
