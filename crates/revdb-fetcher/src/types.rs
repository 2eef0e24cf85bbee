//! Wire types for the `appreviews` endpoint and their converted forms.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Top-level `appreviews` response body.
///
/// `reviews` is required; a body without it is treated as malformed.
#[derive(Debug, Deserialize)]
pub struct ReviewsResponse {
    #[serde(default)]
    pub success: Option<i64>,
    #[serde(default)]
    pub query_summary: Option<QuerySummary>,
    pub reviews: Vec<RawReview>,
}

#[derive(Debug, Deserialize)]
pub struct QuerySummary {
    #[serde(default)]
    pub total_reviews: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RawReview {
    pub author: RawAuthor,
    #[serde(default)]
    pub review: Option<String>,
    pub timestamp_created: i64,
    pub votes_up: i64,
    pub votes_funny: i64,
    pub comment_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct RawAuthor {
    pub steamid: String,
}

/// A review extracted from upstream, with timestamps and counts converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedReview {
    pub author_id: String,
    pub text: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
}

/// One page of reviews plus the upstream total, when it was reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewPage {
    pub reviews: Vec<FetchedReview>,
    pub total_reviews: Option<u64>,
}

impl TryFrom<RawReview> for FetchedReview {
    type Error = String;

    fn try_from(raw: RawReview) -> Result<Self, Self::Error> {
        let posted_at = Utc
            .timestamp_opt(raw.timestamp_created, 0)
            .single()
            .ok_or_else(|| format!("invalid timestamp_created {}", raw.timestamp_created))?;

        for (field, value) in [
            ("votes_up", raw.votes_up),
            ("votes_funny", raw.votes_funny),
            ("comment_count", raw.comment_count),
        ] {
            if value < 0 {
                return Err(format!("negative {field} ({value}) for author {}", raw.author.steamid));
            }
        }

        Ok(Self {
            author_id: raw.author.steamid,
            text: raw.review,
            posted_at,
            like_count: raw.votes_up,
            dislike_count: raw.votes_funny,
            comment_count: raw.comment_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_json() -> serde_json::Value {
        serde_json::json!({
            "author": { "steamid": "76561198000000001", "num_reviews": 3 },
            "review": "solid shooter",
            "timestamp_created": 1_700_000_000,
            "votes_up": 7,
            "votes_funny": 2,
            "comment_count": 1,
            "voted_up": true
        })
    }

    #[test]
    fn converts_fields_and_ignores_extras() {
        let raw: RawReview = serde_json::from_value(raw_json()).unwrap();
        let review = FetchedReview::try_from(raw).unwrap();

        assert_eq!(review.author_id, "76561198000000001");
        assert_eq!(review.text.as_deref(), Some("solid shooter"));
        assert_eq!(review.posted_at.timestamp(), 1_700_000_000);
        assert_eq!(review.like_count, 7);
        assert_eq!(review.dislike_count, 2);
        assert_eq!(review.comment_count, 1);
    }

    #[test]
    fn missing_text_becomes_none() {
        let mut json = raw_json();
        json.as_object_mut().unwrap().remove("review");
        let raw: RawReview = serde_json::from_value(json).unwrap();
        assert!(FetchedReview::try_from(raw).unwrap().text.is_none());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let mut json = raw_json();
        json["votes_up"] = serde_json::json!(-1);
        let raw: RawReview = serde_json::from_value(json).unwrap();
        let err = FetchedReview::try_from(raw).unwrap_err();
        assert!(err.contains("votes_up"), "unexpected reason: {err}");
    }

    #[test]
    fn missing_author_fails_to_deserialize() {
        let mut json = raw_json();
        json.as_object_mut().unwrap().remove("author");
        assert!(serde_json::from_value::<RawReview>(json).is_err());
    }
}
