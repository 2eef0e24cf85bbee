mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use revdb_fetcher::ReviewClient;
use revdb_pipeline::Collector;
use revdb_sentiment::LexiconClassifier;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::middleware::TriggerThrottle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = revdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = revdb_db::PoolConfig::from_app_config(&config);
    let pool = revdb_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = revdb_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let client = ReviewClient::from_settings(&config.collector)?;
    tracing::info!(app_id = client.app_id(), "review source configured");
    let collector = Arc::new(Collector::new(
        pool.clone(),
        Arc::new(client),
        config.collector.clone(),
    ));

    let _scheduler = scheduler::build_scheduler(Arc::clone(&collector), &config.collect_cron).await?;

    let state = AppState {
        pool,
        collector,
        classifier: Arc::new(LexiconClassifier),
    };
    let app = build_app(state, TriggerThrottle::new(config.trigger_cooldown));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "revdb-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
