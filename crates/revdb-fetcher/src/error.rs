use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream unavailable: HTTP {status} from {url}")]
    UpstreamUnavailable { status: u16, url: String },

    #[error("malformed upstream response for {context}: {reason}")]
    UpstreamMalformed { context: String, reason: String },

    #[error("invalid reviews base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl FetchError {
    /// Whether a later attempt at the same request might succeed.
    ///
    /// Non-success statuses and transport failures are transient. A body that
    /// does not match the expected shape, or a bad base URL, will not improve
    /// on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Http(_) | FetchError::UpstreamUnavailable { .. }
        )
    }
}
