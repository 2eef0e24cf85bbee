pub mod client;
pub mod error;
pub mod types;

pub use client::{ReviewClient, ReviewSource, DEFAULT_BASE_URL};
pub use error::FetchError;
pub use types::{FetchedReview, ReviewPage};
