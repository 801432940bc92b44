use std::str::FromStr;
use std::time::Duration;

use musicclub_notify::telegram::{TelegramConfig, DEFAULT_API_BASE};

use crate::auth::jwt::JwtConfig;

/// Detached role announcements get this many per-call timeouts as deadline:
/// the thread lookup, one message, and headroom. Completion attempts bound
/// their own steps and run without it.
const TASK_DEADLINE_FACTOR: u32 = 4;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for detached notification tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Telegram Bot API settings. Incomplete settings disable notifications.
    pub telegram: TelegramConfig,
    /// Period of the topic backfill scan; `0` runs it once at startup only.
    pub topic_backfill_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                    |
    /// |--------------------------------|----------------------------|
    /// | `HOST`                         | `0.0.0.0`                  |
    /// | `PORT`                         | `3000`                     |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                       |
    /// | `BOT_TOKEN`                    | empty (disabled)           |
    /// | `CHAT_ID`                      | empty (disabled)           |
    /// | `TELEGRAM_API_BASE`            | `https://api.telegram.org` |
    /// | `NOTIFY_TIMEOUT_SECS`          | `5`                        |
    /// | `TOPIC_BACKFILL_INTERVAL_SECS` | `3600`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = env_parse("SHUTDOWN_TIMEOUT_SECS", 30);

        let telegram = TelegramConfig {
            bot_token: std::env::var("BOT_TOKEN").unwrap_or_default(),
            chat_id: std::env::var("CHAT_ID").unwrap_or_default(),
            api_base: std::env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.into()),
            timeout: Duration::from_secs(env_parse("NOTIFY_TIMEOUT_SECS", 5)),
        };

        let topic_backfill_interval_secs: u64 = env_parse("TOPIC_BACKFILL_INTERVAL_SECS", 3600);

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            telegram,
            topic_backfill_interval_secs,
        }
    }

    /// Deadline of one detached role announcement.
    pub fn notify_task_deadline(&self) -> Duration {
        self.telegram.timeout * TASK_DEADLINE_FACTOR
    }

    /// `None` when the backfill only runs at startup.
    pub fn topic_backfill_interval(&self) -> Option<Duration> {
        (self.topic_backfill_interval_secs > 0)
            .then(|| Duration::from_secs(self.topic_backfill_interval_secs))
    }
}

/// Parse an env var, falling back to `default` when unset.
///
/// # Panics
///
/// Panics if the variable is set but does not parse.
fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
