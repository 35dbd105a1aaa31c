use secrecy::{ExposeSecret, SecretString};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::net::IpAddr;

/// Minimum accepted length of the HS256 signing secret.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreBackend,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub super_admin: Option<SuperAdminConfig>,
    pub magic_link: MagicLinkConfig,
    pub notifier: NotifierConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub access_token_expiry_minutes: i64,
}

/// The single out-of-band provisioned super admin.
#[derive(Debug, Clone)]
pub struct SuperAdminConfig {
    pub username: String,
    pub email: String,
    /// Argon2 PHC string; the plaintext is never configured.
    pub password_hash: SecretString,
}

#[derive(Debug, Clone)]
pub struct MagicLinkConfig {
    pub enabled: bool,
    pub ttl_minutes: i64,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotifierKind {
    Log,
    Smtp,
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: SecretString,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub register_attempts: u32,
    pub register_window_seconds: u64,
    pub status_limit: u32,
    pub status_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
    /// Peers whose `x-forwarded-for` is believed when keying limits.
    pub trusted_proxies: Vec<IpAddr>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let store: StoreBackend = get_env("STORE_BACKEND", Some("postgres"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let notifier_kind: NotifierKind = get_env("NOTIFIER", Some("log"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("family-auth-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            store,
            database: DatabaseConfig {
                url: match store {
                    StoreBackend::Postgres => get_env("DATABASE_URL", None, is_prod)?,
                    StoreBackend::Memory => get_optional_env("DATABASE_URL").unwrap_or_default(),
                },
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            jwt: JwtConfig {
                secret: SecretString::new(get_env("JWT_SECRET", None, is_prod)?),
                access_token_expiry_minutes: parse_env(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    "1440",
                    is_prod,
                )?,
            },
            super_admin: match get_optional_env("SUPERADMIN_USERNAME") {
                Some(username) => Some(SuperAdminConfig {
                    username,
                    email: get_env("SUPERADMIN_EMAIL", None, is_prod)?,
                    password_hash: SecretString::new(get_env(
                        "SUPERADMIN_PASSWORD_HASH",
                        None,
                        is_prod,
                    )?),
                }),
                None if is_prod => {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "SUPERADMIN_USERNAME is required in production but not set"
                    )))
                }
                None => None,
            },
            magic_link: MagicLinkConfig {
                enabled: parse_env("MAGIC_LINK_ENABLED", "false", is_prod)?,
                ttl_minutes: parse_env("MAGIC_LINK_TTL_MINUTES", "15", is_prod)?,
                base_url: get_env("MAGIC_LINK_BASE_URL", Some("http://localhost:3000"), is_prod)?,
            },
            notifier: NotifierConfig {
                kind: notifier_kind,
                smtp: match notifier_kind {
                    NotifierKind::Smtp => Some(SmtpConfig {
                        host: get_env("SMTP_HOST", None, is_prod)?,
                        user: get_env("SMTP_USER", None, is_prod)?,
                        password: SecretString::new(get_env("SMTP_PASSWORD", None, is_prod)?),
                        from: get_env("SMTP_FROM", None, is_prod)?,
                    }),
                    NotifierKind::Log => None,
                },
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            rate_limit: RateLimitConfig {
                login_attempts: parse_env("RATE_LIMIT_LOGIN_ATTEMPTS", "5", is_prod)?,
                login_window_seconds: parse_env("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "900", is_prod)?,
                register_attempts: parse_env("RATE_LIMIT_REGISTER_ATTEMPTS", "3", is_prod)?,
                register_window_seconds: parse_env(
                    "RATE_LIMIT_REGISTER_WINDOW_SECONDS",
                    "3600",
                    is_prod,
                )?,
                status_limit: parse_env("RATE_LIMIT_STATUS_LIMIT", "30", is_prod)?,
                status_window_seconds: parse_env("RATE_LIMIT_STATUS_WINDOW_SECONDS", "60", is_prod)?,
                global_ip_limit: parse_env("RATE_LIMIT_GLOBAL_IP_LIMIT", "100", is_prod)?,
                global_ip_window_seconds: parse_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    "60",
                    is_prod,
                )?,
                trusted_proxies: get_optional_env("TRUSTED_PROXIES")
                    .as_deref()
                    .map(parse_ip_list)
                    .transpose()?
                    .unwrap_or_default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.jwt.secret.expose_secret().len() < MIN_JWT_SECRET_LEN {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must be at least {} bytes",
                MIN_JWT_SECRET_LEN
            )));
        }

        if self.magic_link.enabled && self.magic_link.ttl_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MAGIC_LINK_TTL_MINUTES must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.store == StoreBackend::Memory {
                tracing::error!("In-memory store configured in production - data is lost on restart");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

/// Comma-separated IP addresses; blank entries are skipped.
fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<IpAddr>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("TRUSTED_PROXIES: {}: {}", entry, e))
            })
        })
        .collect()
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl std::str::FromStr for NotifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(NotifierKind::Log),
            "smtp" => Ok(NotifierKind::Smtp),
            _ => Err(format!("Invalid notifier: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuthConfig {
        AuthConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "family-auth-service".to_string(),
            service_version: "test".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            store: StoreBackend::Memory,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 5,
                min_connections: 1,
            },
            jwt: JwtConfig {
                secret: SecretString::new("x".repeat(MIN_JWT_SECRET_LEN)),
                access_token_expiry_minutes: 60,
            },
            super_admin: None,
            magic_link: MagicLinkConfig {
                enabled: false,
                ttl_minutes: 15,
                base_url: "http://localhost:3000".to_string(),
            },
            notifier: NotifierConfig {
                kind: NotifierKind::Log,
                smtp: None,
            },
            security: SecurityConfig {
                allowed_origins: vec!["*".to_string()],
            },
            rate_limit: RateLimitConfig {
                login_attempts: 5,
                login_window_seconds: 900,
                register_attempts: 3,
                register_window_seconds: 3600,
                status_limit: 30,
                status_window_seconds: 60,
                global_ip_limit: 100,
                global_ip_window_seconds: 60,
                trusted_proxies: Vec::new(),
            },
        }
    }

    #[test]
    fn test_valid_dev_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = sample();
        config.jwt.secret = SecretString::new("short".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_prod() {
        let mut config = sample();
        config.environment = Environment::Prod;
        assert!(config.validate().is_err());

        config.security.allowed_origins = vec!["https://family.example".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("mongo".parse::<StoreBackend>().is_err());
        assert_eq!("smtp".parse::<NotifierKind>(), Ok(NotifierKind::Smtp));
    }

    #[test]
    fn test_malformed_number_is_config_error() {
        env::set_var("FAMILY_AUTH_TEST_LOGIN_ATTEMPTS", "lots");
        let parsed = parse_env::<u32>("FAMILY_AUTH_TEST_LOGIN_ATTEMPTS", "5", false);
        assert!(matches!(parsed, Err(AppError::ConfigError(_))));

        env::set_var("FAMILY_AUTH_TEST_MAGIC_LINK", "yes please");
        let parsed = parse_env::<bool>("FAMILY_AUTH_TEST_MAGIC_LINK", "false", false);
        assert!(matches!(parsed, Err(AppError::ConfigError(_))));

        let parsed = parse_env::<u64>("FAMILY_AUTH_TEST_UNSET_WINDOW", "60", false);
        assert_eq!(parsed.unwrap(), 60);
    }

    #[test]
    fn test_trusted_proxy_list() {
        let proxies = parse_ip_list(" 10.0.0.1, ,::1 ").unwrap();
        assert_eq!(proxies, vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse().unwrap()]);
        assert!(parse_ip_list("10.0.0.1,proxy.local").is_err());
    }
}
