use crate::app_config::{AppConfig, Environment, PollConfig};
use crate::ConfigError;

/// Load server configuration from environment variables.
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

/// Load server configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load polling-client configuration from the environment (and `.env`).
///
/// Nothing is required here; every value has a default that matches the
/// onboarding screen's pacing (5 s checks, 240 attempts, 15 s settle).
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if a value is present but unparseable.
pub fn load_poll_config() -> Result<PollConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_poll_config(|key| std::env::var(key))
}

fn parse_var<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Build server configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can use a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let database_url =
        lookup("DATABASE_URL").map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".into()))?;

    let env = parse_environment(
        &lookup("AIVIS_ENV").unwrap_or_else(|_| "development".to_string()),
    )?;

    let bind_addr: SocketAddr = parse_var(&lookup, "AIVIS_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = lookup("AIVIS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let db_max_connections = parse_var(&lookup, "AIVIS_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_var(&lookup, "AIVIS_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_var(&lookup, "AIVIS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

fn build_poll_config<F>(lookup: F) -> Result<PollConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let log_level = lookup("AIVIS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let api_base_url =
        lookup("AIVIS_API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "AIVIS_API_BASE_URL".to_string(),
            reason: format!("expected an http(s) URL, got '{api_base_url}'"),
        });
    }

    let config = PollConfig {
        log_level,
        api_base_url,
        api_timeout_secs: parse_var(&lookup, "AIVIS_API_TIMEOUT_SECS", "30")?,
        api_max_retries: parse_var(&lookup, "AIVIS_API_MAX_RETRIES", "2")?,
        api_retry_backoff_ms: parse_var(&lookup, "AIVIS_API_RETRY_BACKOFF_MS", "500")?,
        initial_delay_ms: parse_var(&lookup, "AIVIS_POLL_INITIAL_DELAY_MS", "1000")?,
        interval_secs: parse_var(&lookup, "AIVIS_POLL_INTERVAL_SECS", "5")?,
        max_attempts: parse_var(&lookup, "AIVIS_POLL_MAX_ATTEMPTS", "240")?,
        settle_delay_secs: parse_var(&lookup, "AIVIS_POLL_SETTLE_DELAY_SECS", "15")?,
        animation_tick_ms: parse_var(&lookup, "AIVIS_POLL_ANIMATION_TICK_MS", "1000")?,
    };

    if config.max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "AIVIS_POLL_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.interval_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "AIVIS_POLL_INTERVAL_SECS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.animation_tick_ms == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "AIVIS_POLL_ANIMATION_TICK_MS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(config)
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "AIVIS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
