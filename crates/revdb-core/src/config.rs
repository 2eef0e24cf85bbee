use std::time::Duration;

use crate::app_config::{AppConfig, CollectorSettings, Environment};
use crate::ConfigError;

/// Upstream rate limits require at least this much wait before retrying a page.
const MIN_RETRY_BACKOFF_SECS: u64 = 5;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid, or if a value
/// required in production is missing.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid, or if a value
/// required in production is missing.
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
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
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

    let env = parse_environment(&or_default("REVDB_ENV", "development"));
    // Production must name its database file explicitly.
    let database_url = match lookup("DATABASE_URL") {
        Ok(url) => url,
        Err(_) if env == Environment::Production => {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }
        Err(_) => "sqlite://revdb.db?mode=rwc".to_string(),
    };
    let bind_addr = parse_addr("REVDB_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("REVDB_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("REVDB_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("REVDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("REVDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let reviews_base_url = or_default("REVDB_REVIEWS_BASE_URL", "https://store.steampowered.com");
    let app_id = parse_u32("REVDB_APP_ID", "578080")?;

    let page_size = parse_u32("REVDB_PAGE_SIZE", "100")?;
    if page_size == 0 {
        return Err(invalid("REVDB_PAGE_SIZE", "must be at least 1".to_string()));
    }

    let request_timeout_secs = parse_u64("REVDB_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("REVDB_USER_AGENT", "revdb/0.1 (review-collector)");
    let run_budget_secs = parse_u64("REVDB_RUN_BUDGET_SECS", "30")?;

    let retry_backoff_secs = parse_u64("REVDB_RETRY_BACKOFF_SECS", "5")?;
    if retry_backoff_secs < MIN_RETRY_BACKOFF_SECS {
        return Err(invalid(
            "REVDB_RETRY_BACKOFF_SECS",
            format!("must be at least {MIN_RETRY_BACKOFF_SECS}"),
        ));
    }

    let page_pause_ms = parse_u64("REVDB_PAGE_PAUSE_MS", "2000")?;
    let sync_interval_hours = parse_u32("REVDB_SYNC_INTERVAL_HOURS", "24")?;
    let collect_cron = or_default("REVDB_COLLECT_CRON", "0 0 * * * *");
    let trigger_cooldown_secs = parse_u64("REVDB_TRIGGER_COOLDOWN_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        collector: CollectorSettings {
            reviews_base_url,
            app_id,
            page_size,
            request_timeout_secs,
            user_agent,
            run_budget: Duration::from_secs(run_budget_secs),
            retry_backoff: Duration::from_secs(retry_backoff_secs),
            page_pause: Duration::from_millis(page_pause_ms),
            sync_interval: chrono::Duration::hours(i64::from(sync_interval_hours)),
        },
        collect_cron,
        trigger_cooldown: Duration::from_secs(trigger_cooldown_secs),
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
