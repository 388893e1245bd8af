use std::time::Duration;

use thiserror::Error;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment environment the process runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Development,
    Test,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "local" => Some(Environment::Local),
            "dev" | "development" => Some(Environment::Development),
            "test" => Some(Environment::Test),
            "prod" | "production" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Development => "dev",
            Environment::Test => "test",
            Environment::Production => "prod",
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

/// Telegram credentials for the alarm notifier.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service name attached to the startup log event
    pub app_name: String,

    /// Service version attached to the startup log event
    pub app_version: String,

    /// Environment: local, dev, test, prod
    pub environment: Environment,

    /// Server host (default: 127.0.0.1)
    pub server_host: String,

    /// Server port (default: 3000)
    pub server_port: u16,

    /// Upper bound for a single request, including its cache and database calls
    pub request_timeout: Duration,

    /// Database connection URL (e.g. sqlite://keystone.db, postgres://...)
    pub database_url: String,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_connect_timeout: Duration,

    /// Redis URL for sessions and caching (optional, e.g. redis://127.0.0.1:6379)
    pub redis_url: Option<String>,

    /// Deadline applied to every individual cache operation
    pub cache_op_timeout: Duration,

    /// Lifetime of a session record and of the session cookie
    pub session_ttl: Duration,

    /// Lifetime of cached user rows
    pub user_cache_ttl: Duration,

    /// Alarm notifier credentials (alarms are only logged when unset)
    pub telegram: Option<TelegramConfig>,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("ENVIRONMENT") {
            Some(raw) => Environment::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "ENVIRONMENT",
                value: raw.clone(),
                reason: "expected one of local, dev, test, prod".to_string(),
            })?,
            None => Environment::Local,
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected pretty, json or compact".to_string(),
                });
            }
            None if environment == Environment::Production => LogFormat::Json,
            None => LogFormat::Pretty,
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        Ok(Config {
            app_name: get("APP_NAME").unwrap_or_else(|| "keystone".to_string()),
            app_version: get("APP_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            environment,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(&get, "SERVER_PORT", 3000)?,
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?),
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://keystone.db?mode=rwc".to_string()),
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 20)?,
            db_min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", 2)?,
            db_connect_timeout: Duration::from_secs(parse_or(&get, "DB_CONNECT_TIMEOUT_SECS", 8)?),
            redis_url: get("REDIS_URL"),
            cache_op_timeout: Duration::from_millis(parse_or(&get, "CACHE_OP_TIMEOUT_MS", 2000)?),
            session_ttl: Duration::from_secs(parse_or(&get, "SESSION_TTL_SECS", 604_800)?),
            user_cache_ttl: Duration::from_secs(parse_or(&get, "USER_CACHE_TTL_SECS", 86_400)?),
            telegram,
            log_format,
        })
    }

    /// Configuration used by the test harness: in-memory SQLite and cache.
    pub fn for_tests() -> Self {
        let mut config = Self::from_lookup(|_| None).unwrap_or_else(|_| unreachable!());
        config.environment = Environment::Test;
        config.database_url = "sqlite::memory:".to_string();
        config.server_port = 0;
        config
    }

    /// Check if running in production. Drives the `Secure` cookie attribute.
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Check if running on a developer machine.
    pub fn is_local(&self) -> bool {
        self.environment == Environment::Local
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Local);
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
        assert_eq!(config.session_ttl, Duration::from_secs(604_800));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.redis_url.is_none());
        assert!(config.telegram.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_defaults_to_json_logs() {
        let config = Config::from_lookup(lookup(&[("ENVIRONMENT", "prod")])).unwrap();
        assert!(config.is_production());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "8080"),
            ("SESSION_TTL_SECS", "60"),
            ("REDIS_URL", "redis://cache:6379"),
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]))
        .unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.telegram.unwrap().chat_id, "42");
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[("SERVER_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }

    #[test]
    fn test_unknown_environment_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("ENVIRONMENT", "staging")])).is_err());
    }

    #[test]
    fn test_partial_telegram_config_is_ignored() {
        let config = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "token")])).unwrap();
        assert!(config.telegram.is_none());
    }
}
