use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::errors::BootstrapError;

/// Signing key used outside production when `COOKIE_SECRET` is unset.
pub const DEV_COOKIE_SECRET: &str = "insecure-development-cookie-secret-change-me";

/// Minimum accepted length of a cookie signing secret, in bytes.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BOOTSTRAP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Production,
    Development,
}

impl RuntimeMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Read-only snapshot of the process configuration.
///
/// Absent values are expected states, not errors: a missing `DATABASE_URL`
/// routes the bootstrap into degraded mode rather than failing to load.
#[derive(Clone)]
pub struct EnvironmentConfig {
    pub database_url: Option<String>,
    pub cookie_secret: Option<String>,
    pub mode: RuntimeMode,
    pub bind_addr: SocketAddr,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub allowed_origins: Vec<String>,
    pub bootstrap_timeout: Duration,
    pub database_max_connections: u32,
}

impl EnvironmentConfig {
    /// Load `.env` if present, then snapshot the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = non_empty("APP_ENV")
            .or_else(|| non_empty("NODE_ENV"))
            .map(|v| RuntimeMode::parse(&v))
            .unwrap_or(RuntimeMode::Development);

        let port: u16 = parse_or_warn(non_empty("PORT"), "PORT").unwrap_or(DEFAULT_PORT);
        let host: IpAddr = parse_or_warn(non_empty("HOST"), "HOST")
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let bootstrap_timeout = parse_or_warn(non_empty("BOOTSTRAP_TIMEOUT_SECS"), "BOOTSTRAP_TIMEOUT_SECS")
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_BOOTSTRAP_TIMEOUT_SECS));

        let database_max_connections =
            parse_or_warn(non_empty("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let allowed_origins = non_empty("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            database_url: non_empty("DATABASE_URL"),
            cookie_secret: non_empty("COOKIE_SECRET"),
            mode,
            bind_addr: SocketAddr::new(host, port),
            admin_email: non_empty("ADMIN_EMAIL"),
            admin_password: non_empty("ADMIN_PASSWORD"),
            allowed_origins,
            bootstrap_timeout,
            database_max_connections,
        }
    }

    /// Decide which key signs admin sessions.
    ///
    /// Production never falls back to the development default: a missing or
    /// short secret is an initialization failure.
    pub fn resolve_cookie_secret(&self) -> Result<String, BootstrapError> {
        match (&self.cookie_secret, self.mode) {
            (Some(secret), RuntimeMode::Production) if secret.len() < MIN_COOKIE_SECRET_LEN => {
                Err(BootstrapError::InsecureCookieSecret {
                    min_len: MIN_COOKIE_SECRET_LEN,
                })
            }
            (Some(secret), RuntimeMode::Development) if secret.len() < MIN_COOKIE_SECRET_LEN => {
                tracing::warn!(
                    min_len = MIN_COOKIE_SECRET_LEN,
                    "COOKIE_SECRET is shorter than recommended; accepted in development only"
                );
                Ok(secret.clone())
            }
            (Some(secret), _) => Ok(secret.clone()),
            (None, RuntimeMode::Production) => Err(BootstrapError::MissingCookieSecret),
            (None, RuntimeMode::Development) => {
                tracing::warn!(
                    "COOKIE_SECRET not set; signing admin sessions with the insecure development default"
                );
                Ok(DEV_COOKIE_SECRET.to_string())
            }
        }
    }
}

impl fmt::Debug for EnvironmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("cookie_secret", &self.cookie_secret.as_ref().map(|_| "<redacted>"))
            .field("mode", &self.mode)
            .field("bind_addr", &self.bind_addr)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .field("allowed_origins", &self.allowed_origins)
            .field("bootstrap_timeout", &self.bootstrap_timeout)
            .field("database_max_connections", &self.database_max_connections)
            .finish()
    }
}

fn parse_or_warn<T>(value: Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.and_then(|s| {
        s.trim()
            .parse()
            .map_err(|e| {
                tracing::warn!("Invalid {} value '{}': {}", key, s, e);
                e
            })
            .ok()
    })
}
