//! HTTP client for the public `appreviews` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use revdb_core::CollectorSettings;

use crate::error::FetchError;
use crate::types::{FetchedReview, ReviewPage, ReviewsResponse};

pub const DEFAULT_BASE_URL: &str = "https://store.steampowered.com";

/// Source of review pages, newest first.
///
/// The collection orchestrator only talks to upstream through this trait, so
/// it can be driven by [`ReviewClient`] or by an in-memory fake.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Fetch `page_size` reviews starting at `offset`.
    async fn fetch_page(&self, offset: u64, page_size: u32) -> Result<ReviewPage, FetchError>;

    /// Total number of reviews upstream reports for the app.
    async fn probe_total(&self) -> Result<u64, FetchError>;
}

/// HTTP client for the `appreviews/{app_id}` endpoint.
///
/// Non-success statuses map to [`FetchError::UpstreamUnavailable`] and bodies
/// that do not match the expected shape to [`FetchError::UpstreamMalformed`].
/// The client never retries; retry policy belongs to the caller, which knows
/// its remaining time budget.
pub struct ReviewClient {
    client: Client,
    base_url: String,
    app_id: u32,
}

impl ReviewClient {
    /// Creates a `ReviewClient` with configured timeout and `User-Agent`,
    /// pointed at the public store host.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str, app_id: u32) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id,
        })
    }

    /// Builds a client from collector settings, including the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the `reqwest::Client` cannot be built.
    pub fn from_settings(settings: &CollectorSettings) -> Result<Self, FetchError> {
        Ok(
            Self::new(settings.request_timeout_secs, &settings.user_agent, settings.app_id)?
                .with_base_url(&settings.reviews_base_url),
        )
    }

    /// Overrides the base URL. Used to point the client at a mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn app_id(&self) -> u32 {
        self.app_id
    }

    async fn get_page(
        &self,
        offset: u64,
        page_size: u32,
    ) -> Result<ReviewsResponse, FetchError> {
        let url = Self::reviews_url(&self.base_url, self.app_id, offset, page_size)?;

        tracing::debug!(%url, offset, page_size, "fetching review page");
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::UpstreamUnavailable {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<ReviewsResponse>(&body).map_err(|e| {
            FetchError::UpstreamMalformed {
                context: format!("review page at offset {offset}"),
                reason: e.to_string(),
            }
        })?;

        if let Some(flag) = parsed.success {
            if flag != 1 {
                return Err(FetchError::UpstreamMalformed {
                    context: format!("review page at offset {offset}"),
                    reason: format!("success flag was {flag}"),
                });
            }
        }

        Ok(parsed)
    }

    /// Builds the `appreviews` URL for the given app, offset, and page size.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidBaseUrl`] if `base_url` cannot be parsed.
    fn reviews_url(
        base_url: &str,
        app_id: u32,
        offset: u64,
        page_size: u32,
    ) -> Result<String, FetchError> {
        let base = format!("{}/appreviews/{app_id}", base_url.trim_end_matches('/'));
        let mut url = reqwest::Url::parse(&base).map_err(|e| FetchError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        url.query_pairs_mut()
            .append_pair("json", "1")
            .append_pair("num_per_page", &page_size.to_string())
            .append_pair("start_offset", &offset.to_string())
            .append_pair("filter", "recent");

        Ok(url.to_string())
    }
}

#[async_trait]
impl ReviewSource for ReviewClient {
    /// # Errors
    ///
    /// - [`FetchError::UpstreamUnavailable`] for any non-2xx status.
    /// - [`FetchError::Http`] for network or TLS failures.
    /// - [`FetchError::UpstreamMalformed`] if the body or any review in it does
    ///   not have the expected shape.
    async fn fetch_page(&self, offset: u64, page_size: u32) -> Result<ReviewPage, FetchError> {
        let parsed = self.get_page(offset, page_size).await?;

        let reviews = parsed
            .reviews
            .into_iter()
            .map(FetchedReview::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| FetchError::UpstreamMalformed {
                context: format!("review page at offset {offset}"),
                reason,
            })?;

        Ok(ReviewPage {
            reviews,
            total_reviews: parsed.query_summary.and_then(|s| s.total_reviews),
        })
    }

    async fn probe_total(&self) -> Result<u64, FetchError> {
        let parsed = self.get_page(0, 1).await?;
        parsed
            .query_summary
            .and_then(|s| s.total_reviews)
            .ok_or_else(|| FetchError::UpstreamMalformed {
                context: "total probe".to_string(),
                reason: "query_summary.total_reviews missing".to_string(),
            })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
