use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use crate::error::app_error::AppError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/api";

/// Environment variables recognized without the `SHOWROOM_` prefix, with the
/// configuration key each one overrides.
const RAW_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("LOGIN_MAX_ATTEMPTS", "login.max_attempts"),
    ("LOGIN_LOCK_DURATION_MS", "login.lock_duration_ms"),
    ("PASSWORD_HASH_COST", "password.hash_cost"),
];

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub login: LoginConfig,
    pub password: PasswordConfig,
    pub provisioning: ProvisioningConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    pub enable_swagger: bool,
}

/// Lockout policy knobs for the login flow.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoginConfig {
    /// Consecutive failures that engage the lock.
    pub max_attempts: i32,
    pub lock_duration_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PasswordConfig {
    /// Argon2 time cost (iterations).
    pub hash_cost: u32,
}

/// Credentials for the one-off admin bootstrap run by the `provision` binary.
#[derive(Deserialize, Serialize, Clone, Default)]
pub struct ProvisioningConfig {
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub admin_phone: Option<String>,
    pub admin_password: Option<String>,
}

impl std::fmt::Debug for ProvisioningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningConfig")
            .field("admin_name", &self.admin_name)
            .field("admin_email", &self.admin_email)
            .field("admin_phone", &self.admin_phone)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/showroom".to_string(),
            max_connections: 16,
            min_connections: 2,
            acquire_timeout: 5,
            run_migrations: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            enable_swagger: false,
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_duration_ms: 7_200_000,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self { hash_cost: 12 }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Showroom.toml (optional)
    /// 3. Environment variables prefixed with SHOWROOM_, nested with `__`
    ///    (e.g. SHOWROOM_LOGGING__LEVEL)
    /// 4. The bare variables in `RAW_ENV_OVERRIDES` (LOGIN_MAX_ATTEMPTS, ...)
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("Showroom.toml"))
            .merge(Env::prefixed("SHOWROOM_").split("__"));

        for (var, key) in RAW_ENV_OVERRIDES {
            let key = *key;
            figment = figment.merge(Env::raw().only(&[*var]).map(move |_| key.into()));
        }

        figment
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.login.max_attempts < 1 {
            return Err(AppError::configuration(format!(
                "login.max_attempts must be at least 1, got {}",
                self.login.max_attempts
            )));
        }
        if self.login.lock_duration_ms == 0 {
            return Err(AppError::configuration("login.lock_duration_ms must be greater than zero"));
        }
        if !(1..=64).contains(&self.password.hash_cost) {
            return Err(AppError::configuration(format!(
                "password.hash_cost must be within 1..=64, got {}",
                self.password.hash_cost
            )));
        }
        Ok(())
    }
}
