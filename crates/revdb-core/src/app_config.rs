use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Knobs for one collection run: upstream identity, paging, and time budgets.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Base URL of the upstream review service (scheme + host).
    pub reviews_base_url: String,
    /// Application whose reviews are collected.
    pub app_id: u32,
    /// Reviews requested per page.
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Wall-clock cap for the paging loop of a single run.
    pub run_budget: Duration,
    /// Minimum wait before retrying a page after an upstream failure.
    pub retry_backoff: Duration,
    /// Pause between pages during incremental sync.
    pub page_pause: Duration,
    /// Minimum checkpoint age before an incremental sync runs.
    pub sync_interval: chrono::Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            reviews_base_url: "https://store.steampowered.com".to_string(),
            app_id: 578_080,
            page_size: 100,
            request_timeout_secs: 30,
            user_agent: "revdb/0.1 (review-collector)".to_string(),
            run_budget: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(5),
            page_pause: Duration::from_secs(2),
            sync_interval: chrono::Duration::hours(24),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub collector: CollectorSettings,
    pub collect_cron: String,
    /// Minimum spacing between accepted manual collection triggers.
    pub trigger_cooldown: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("collector", &self.collector)
            .field("collect_cron", &self.collect_cron)
            .field("trigger_cooldown", &self.trigger_cooldown)
            .finish()
    }
}
