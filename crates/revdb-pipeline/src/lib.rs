//! Review collection and sentiment enrichment.
//!
//! [`Collector`] decides what a trigger should do (full backfill, incremental
//! sync, or nothing), pages reviews from a [`revdb_fetcher::ReviewSource`]
//! into the store, and records every run. [`enrich_missing_scores`] fills in
//! sentiment scores for stored reviews that lack one.

pub mod collect;
pub mod enrich;
pub mod error;
mod retry;

pub use collect::{
    select_mode, CollectionMode, CollectionOutcome, Collector, StopReason, TriggerSource,
    IDLE_RUN_RETENTION_DAYS,
};
pub use enrich::{enrich_missing_scores, EnrichSummary};
pub use error::CollectError;
