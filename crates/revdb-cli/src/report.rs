//! `report` sub-commands: aggregate views printed as JSON.

use clap::Subcommand;
use revdb_sentiment::LexiconClassifier;
use serde::Serialize;

#[derive(Debug, Subcommand)]
pub enum ReportCommands {
    /// Newest reviews with text
    Latest {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Reviews with the most comments
    Sensational {
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
    /// Most-liked review in each sentiment category
    Sentimental,
    /// Number of scored reviews per sentiment category
    OverallCount,
    /// Each author's most-liked review, ranked by likes
    MostLiked {
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
    /// Reviews with the most dislikes
    MostDisliked {
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
    /// Per-category counts of scored reviews containing KEYWORD
    Keyword { keyword: String },
}

#[derive(Debug, Serialize)]
struct KeywordReport<'a> {
    keyword: &'a str,
    categories: Vec<revdb_db::CategoryCount>,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn enrich_first(pool: &sqlx::SqlitePool) -> anyhow::Result<()> {
    let summary = revdb_pipeline::enrich_missing_scores(pool, &LexiconClassifier).await?;
    if summary.scored > 0 {
        tracing::info!(scored = summary.scored, "scored new reviews before report");
    }
    Ok(())
}

/// Run one report view and print it to stdout.
///
/// Sentiment views score any unscored reviews first.
///
/// # Errors
///
/// Returns an error if the keyword is invalid or a query fails.
pub(crate) async fn run_report(
    pool: &sqlx::SqlitePool,
    view: &ReportCommands,
) -> anyhow::Result<()> {
    match view {
        ReportCommands::Latest { limit } => {
            print_json(&revdb_db::latest_reviews(pool, (*limit).max(1)).await?)
        }
        ReportCommands::Sensational { limit } => {
            print_json(&revdb_db::most_commented(pool, (*limit).max(1)).await?)
        }
        ReportCommands::MostLiked { limit } => {
            print_json(&revdb_db::most_liked_authors(pool, (*limit).max(1)).await?)
        }
        ReportCommands::MostDisliked { limit } => {
            print_json(&revdb_db::most_disliked(pool, (*limit).max(1)).await?)
        }
        ReportCommands::Sentimental => {
            enrich_first(pool).await?;
            print_json(&revdb_db::top_liked_by_category(pool).await?)
        }
        ReportCommands::OverallCount => {
            enrich_first(pool).await?;
            print_json(&revdb_db::category_counts(pool).await?)
        }
        ReportCommands::Keyword { keyword } => {
            let keyword = revdb_core::normalize_keyword(keyword)?;
            enrich_first(pool).await?;
            let categories = revdb_db::keyword_counts_by_category(pool, keyword).await?;
            print_json(&KeywordReport {
                keyword,
                categories,
            })
        }
    }
}
