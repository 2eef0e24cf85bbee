use std::collections::HashMap;
use std::env::VarError;
use std::time::Duration;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(parse_environment("development"), Environment::Development);
    assert_eq!(parse_environment("test"), Environment::Test);
    assert_eq!(parse_environment("production"), Environment::Production);
}

#[test]
fn parse_environment_unknown_defaults_to_development() {
    assert_eq!(parse_environment("staging"), Environment::Development);
}

#[test]
fn build_app_config_uses_defaults_for_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();

    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.database_url, "sqlite://revdb.db?mode=rwc");
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.db_max_connections, 5);
    assert_eq!(cfg.db_min_connections, 1);
    assert_eq!(cfg.db_acquire_timeout_secs, 10);
    assert_eq!(cfg.collect_cron, "0 0 * * * *");
    assert_eq!(cfg.trigger_cooldown, Duration::from_secs(10));

    let collector = &cfg.collector;
    assert_eq!(collector.reviews_base_url, "https://store.steampowered.com");
    assert_eq!(collector.app_id, 578_080);
    assert_eq!(collector.page_size, 100);
    assert_eq!(collector.run_budget, Duration::from_secs(30));
    assert_eq!(collector.retry_backoff, Duration::from_secs(5));
    assert_eq!(collector.page_pause, Duration::from_millis(2000));
    assert_eq!(collector.sync_interval, chrono::Duration::hours(24));
}

#[test]
fn build_app_config_matches_collector_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let defaults = CollectorSettings::default();

    assert_eq!(cfg.collector.app_id, defaults.app_id);
    assert_eq!(cfg.collector.page_size, defaults.page_size);
    assert_eq!(cfg.collector.user_agent, defaults.user_agent);
    assert_eq!(cfg.collector.run_budget, defaults.run_budget);
    assert_eq!(cfg.collector.sync_interval, defaults.sync_interval);
}

#[test]
fn build_app_config_applies_overrides() {
    let mut map = HashMap::new();
    map.insert("DATABASE_URL", "sqlite::memory:");
    map.insert("REVDB_APP_ID", "730");
    map.insert("REVDB_PAGE_SIZE", "20");
    map.insert("REVDB_RUN_BUDGET_SECS", "90");
    map.insert("REVDB_PAGE_PAUSE_MS", "0");
    map.insert("REVDB_SYNC_INTERVAL_HOURS", "6");
    map.insert("REVDB_TRIGGER_COOLDOWN_SECS", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();

    assert_eq!(cfg.database_url, "sqlite::memory:");
    assert_eq!(cfg.collector.app_id, 730);
    assert_eq!(cfg.collector.page_size, 20);
    assert_eq!(cfg.collector.run_budget, Duration::from_secs(90));
    assert_eq!(cfg.collector.page_pause, Duration::ZERO);
    assert_eq!(cfg.collector.sync_interval, chrono::Duration::hours(6));
    assert_eq!(cfg.trigger_cooldown, Duration::ZERO);
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = HashMap::new();
    map.insert("REVDB_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "REVDB_BIND_ADDR"),
        "expected InvalidEnvVar(REVDB_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_app_id() {
    let mut map = HashMap::new();
    map.insert("REVDB_APP_ID", "pubg");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "REVDB_APP_ID"),
        "expected InvalidEnvVar(REVDB_APP_ID), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_page_size() {
    let mut map = HashMap::new();
    map.insert("REVDB_PAGE_SIZE", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "REVDB_PAGE_SIZE"),
        "expected InvalidEnvVar(REVDB_PAGE_SIZE), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_retry_backoff_below_minimum() {
    let mut map = HashMap::new();
    map.insert("REVDB_RETRY_BACKOFF_SECS", "1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "REVDB_RETRY_BACKOFF_SECS"),
        "expected InvalidEnvVar(REVDB_RETRY_BACKOFF_SECS), got: {result:?}"
    );
}

#[test]
fn app_config_debug_redacts_database_url() {
    let mut map = HashMap::new();
    map.insert("DATABASE_URL", "sqlite:///srv/secret-path/reviews.db");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("secret-path"), "database_url leaked: {debug}");
    assert!(debug.contains("[redacted]"));
}

#[test]
fn build_app_config_requires_database_url_in_production() {
    let map: HashMap<&str, &str> = HashMap::from([("REVDB_ENV", "production")]);
    let err = build_app_config(lookup_from_map(&map)).unwrap_err();
    assert!(matches!(err, ConfigError::MissingEnvVar(ref var) if var == "DATABASE_URL"));

    let map: HashMap<&str, &str> = HashMap::from([
        ("REVDB_ENV", "production"),
        ("DATABASE_URL", "sqlite:///var/lib/revdb/revdb.db"),
    ]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
}
