use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Signing secret used when nothing else is configured. Accepted only in
/// development and testing.
pub const DEFAULT_JWT_SECRET: &str = "dev-secret-key-change-in-production";

/// Deployment profile. Selects validation strictness and hashing cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    /// Staging and production require real secrets.
    #[must_use]
    pub const fn is_hardened(self) -> bool {
        matches!(self, Self::Staging | Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "testing" | "test" => Ok(Self::Testing),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("Unknown environment: {other}"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub tokens: TokenConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub environment: Environment,

    pub database_url: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            database_url: "sqlite:data/tradeauth.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub host: String,

    pub port: u16,

    /// Origins allowed by CORS. A single "*" allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC secret used to sign access and refresh tokens
    pub jwt_secret: String,

    /// `iss` claim written into and required from every token
    pub issuer: String,

    pub access_ttl_seconds: i64,

    pub refresh_ttl_seconds: i64,

    /// Grace period applied to `exp` when decoding
    pub leeway_seconds: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            issuer: "tradeauth".to_string(),
            access_ttl_seconds: 60 * 60,
            refresh_ttl_seconds: 30 * 24 * 60 * 60,
            leeway_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Consecutive failed logins that lock the account.
    pub max_failed_logins: u32,

    /// How long a locked account stays locked.
    pub lockout_seconds: i64,

    pub password_reset_ttl_seconds: i64,

    pub email_verification_ttl_seconds: i64,

    /// Issue an email verification token right after registration.
    pub issue_verification_on_register: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            max_failed_logins: 5,
            lockout_seconds: 15 * 60,
            password_reset_ttl_seconds: 60 * 60,
            email_verification_ttl_seconds: 24 * 60 * 60,
            issue_verification_on_register: true,
        }
    }
}

impl SecurityConfig {
    #[must_use]
    pub fn lockout_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lockout_seconds)
    }

    #[must_use]
    pub fn password_reset_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.password_reset_ttl_seconds)
    }

    #[must_use]
    pub fn email_verification_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.email_verification_ttl_seconds)
    }
}

impl Config {
    /// Defaults adjusted for a deployment profile.
    ///
    /// The testing profile trades hashing cost for speed, the hardened
    /// profiles leave the secret empty so `validate` forces one to be set.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        let mut config = Self::default();
        config.general.environment = environment;

        match environment {
            Environment::Development => {
                config.general.log_level = "debug".to_string();
            }
            Environment::Testing => {
                config.general.database_url = "sqlite::memory:".to_string();
                config.security.argon2_memory_cost_kib = 1024;
                config.security.argon2_time_cost = 1;
                config.security.issue_verification_on_register = true;
            }
            Environment::Staging | Environment::Production => {
                config.tokens.jwt_secret = String::new();
            }
        }

        config
    }

    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        let environment = match std::env::var("TRADEAUTH_ENV") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::default(),
        };

        info!("No config file found, using {environment} defaults");
        Ok(Self::for_environment(environment))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables win over the config file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("TRADEAUTH_ENV") {
            self.general.environment = value.parse()?;
        }
        if let Some(value) = lookup("DATABASE_URL") {
            self.general.database_url = value;
        }
        if let Some(value) = lookup("JWT_SECRET_KEY") {
            self.tokens.jwt_secret = value;
        }
        if let Some(value) = lookup("LOG_LEVEL") {
            self.general.log_level = value.to_lowercase();
        }
        if let Some(value) = lookup("PORT") {
            self.server.port = value
                .parse()
                .with_context(|| format!("Invalid PORT value: {value}"))?;
        }
        if let Some(value) = lookup("CORS_ORIGINS") {
            self.server.cors_allowed_origins = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("tradeauth").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tradeauth").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let environment = self.general.environment;

        if environment.is_hardened() {
            if self.tokens.jwt_secret.is_empty() || self.tokens.jwt_secret == DEFAULT_JWT_SECRET {
                anyhow::bail!("JWT_SECRET_KEY must be set in {environment}");
            }
            if self.tokens.jwt_secret.len() < 32 {
                anyhow::bail!("JWT secret must be at least 32 characters in {environment}");
            }
        } else if self.tokens.jwt_secret.is_empty() {
            anyhow::bail!("JWT secret cannot be empty");
        }

        if self.tokens.access_ttl_seconds <= 0 {
            anyhow::bail!("Access token TTL must be positive");
        }

        if self.tokens.refresh_ttl_seconds <= self.tokens.access_ttl_seconds {
            anyhow::bail!("Refresh token TTL must be greater than access token TTL");
        }

        if self.tokens.leeway_seconds < 0 {
            anyhow::bail!("Token leeway cannot be negative");
        }

        if self.security.max_failed_logins == 0 {
            anyhow::bail!("max_failed_logins must be at least 1");
        }

        if self.security.lockout_seconds <= 0
            || self.security.password_reset_ttl_seconds <= 0
            || self.security.email_verification_ttl_seconds <= 0
        {
            anyhow::bail!("Lockout and token lifetimes must be positive");
        }

        if self.general.database_url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        Ok(())
    }

    /// Copy safe to print: the signing secret is replaced with a mask.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        if !config.tokens.jwt_secret.is_empty() {
            config.tokens.jwt_secret = "********".to_string();
        }
        config
    }
}
