use crate::app_config::{AppConfig, DeliveryConfig, DiscordConfig, Environment, TelegramConfig};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        match parse_u64(var, default)? {
            0 => Err(invalid(var, "must be greater than zero".to_string())),
            n => Ok(n),
        }
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                other => Err(invalid(var, format!("expected a boolean, got {other:?}"))),
            },
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("NELSON_ENV", "development"));
    let log_level = or_default("NELSON_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("NELSON_SOURCES_PATH", "./config/sources.yaml"));

    let db_max_connections = parse_u32("NELSON_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("NELSON_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("NELSON_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let store_query_timeout_secs = parse_positive_u64("NELSON_STORE_QUERY_TIMEOUT_SECS", "5")?;

    let fetch_timeout_secs = parse_positive_u64("NELSON_FETCH_TIMEOUT_SECS", "30")?;
    let fetch_user_agent = or_default("NELSON_FETCH_USER_AGENT", DEFAULT_USER_AGENT);
    let ingest_interval_secs = parse_positive_u64("NELSON_INGEST_INTERVAL_SECS", "3600")?;

    let queue_capacity = parse_positive_u64("NELSON_QUEUE_CAPACITY", "500")?;
    let delivery = DeliveryConfig {
        queue_capacity: usize::try_from(queue_capacity)
            .map_err(|e| invalid("NELSON_QUEUE_CAPACITY", e.to_string()))?,
        cadence_secs: parse_positive_u64("NELSON_DELIVERY_CADENCE_SECS", "5")?,
        inter_task_delay_ms: parse_u64("NELSON_DELIVERY_INTER_TASK_DELAY_MS", "1000")?,
        rate_limit_backoff_secs: parse_u64("NELSON_RATE_LIMIT_BACKOFF_SECS", "10")?,
        max_rate_limit_retries: parse_u32("NELSON_MAX_RATE_LIMIT_RETRIES", "1")?,
        sink_timeout_secs: parse_positive_u64("NELSON_SINK_TIMEOUT_SECS", "15")?,
        media_timeout_secs: parse_positive_u64("NELSON_MEDIA_TIMEOUT_SECS", "5")?,
        max_attachment_bytes: parse_u64("NELSON_MAX_ATTACHMENT_BYTES", "26214400")?,
    };

    let discord = if parse_bool("DISCORD_ENABLED", true)? {
        match (
            optional("DISCORD_BOT_TOKEN"),
            optional("DISCORD_FORUM_CHANNEL_ID"),
        ) {
            (Some(bot_token), Some(forum_channel_id)) => Some(DiscordConfig {
                bot_token,
                forum_channel_id,
                api_base: or_default("DISCORD_API_BASE", DEFAULT_DISCORD_API_BASE),
            }),
            _ => None,
        }
    } else {
        None
    };

    let telegram = if parse_bool("TELEGRAM_ENABLED", true)? {
        match (optional("TELEGRAM_BOT_TOKEN"), optional("TELEGRAM_CHANNEL_ID")) {
            (Some(bot_token), Some(channel_id)) => Some(TelegramConfig {
                bot_token,
                channel_id,
                api_base: or_default("TELEGRAM_API_BASE", DEFAULT_TELEGRAM_API_BASE),
            }),
            _ => None,
        }
    } else {
        None
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        store_query_timeout_secs,
        fetch_timeout_secs,
        fetch_user_agent,
        ingest_interval_secs,
        delivery,
        discord,
        telegram,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
