mod collect;
mod report;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::report::ReportCommands;

#[derive(Debug, Parser)]
#[command(name = "revdb-cli")]
#[command(about = "Steam review collector command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one collection trigger (backfill, incremental sync, or idle)
    Collect,
    /// Score every stored review that has text but no sentiment score
    Enrich,
    /// Print an aggregate view as JSON
    Report {
        #[command(subcommand)]
        view: ReportCommands,
    },
    /// Show the collection checkpoint and recent runs
    Status {
        /// Number of recent runs to list
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("revdb-cli: no command given; see --help");
        return Ok(());
    };

    let config = revdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = revdb_db::PoolConfig::from_app_config(&config);
    let pool = revdb_db::connect_pool(&config.database_url, pool_config).await?;
    revdb_db::run_migrations(&pool).await?;

    match command {
        Commands::Collect => collect::run_collect(&pool, &config.collector).await?,
        Commands::Enrich => collect::run_enrich(&pool).await?,
        Commands::Report { view } => report::run_report(&pool, &view).await?,
        Commands::Status { limit } => {
            collect::run_status(&pool, config.collector.sync_interval, limit).await?;
        }
    }

    pool.close().await;
    Ok(())
}
