//! Discrete sentiment categories and the score bands that define them.
//!
//! Bands are half-open intervals `[lower, next_lower)` sorted from the most
//! positive category down. The top band is closed at [`MAX_SCORE`], so every
//! score in `[MIN_SCORE, MAX_SCORE]` falls into exactly one category:
//!
//! | Category       | Band          |
//! |----------------|---------------|
//! | `VeryPositive` | `[0.5, 1.0]`  |
//! | `Positive`     | `[0.1, 0.5)`  |
//! | `Neutral`      | `[-0.1, 0.1)` |
//! | `Negative`     | `[-0.5, -0.1)`|
//! | `VeryNegative` | `[-1.0, -0.5)`|

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

pub const MIN_SCORE: f64 = -1.0;
pub const MAX_SCORE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentCategory {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

/// Lower bound of each band, ordered from the highest band to the lowest.
const BANDS: [(f64, SentimentCategory); 5] = [
    (0.5, SentimentCategory::VeryPositive),
    (0.1, SentimentCategory::Positive),
    (-0.1, SentimentCategory::Neutral),
    (-0.5, SentimentCategory::Negative),
    (MIN_SCORE, SentimentCategory::VeryNegative),
];

impl SentimentCategory {
    /// All categories, most positive first.
    pub const ALL: [SentimentCategory; 5] = [
        SentimentCategory::VeryPositive,
        SentimentCategory::Positive,
        SentimentCategory::Neutral,
        SentimentCategory::Negative,
        SentimentCategory::VeryNegative,
    ];

    /// Returns the category whose band contains `score`.
    ///
    /// Returns `None` for NaN or scores outside `[MIN_SCORE, MAX_SCORE]`.
    #[must_use]
    pub fn from_score(score: f64) -> Option<Self> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return None;
        }
        BANDS
            .iter()
            .find(|(lower, _)| score >= *lower)
            .map(|&(_, category)| category)
    }

    /// The `(lower, upper)` bounds of this category's band.
    ///
    /// The lower bound is inclusive. The upper bound is exclusive except for
    /// [`SentimentCategory::VeryPositive`], whose upper bound is [`MAX_SCORE`]
    /// inclusive.
    #[must_use]
    pub fn bounds(self) -> (f64, f64) {
        let idx = self.index();
        let lower = BANDS[idx].0;
        let upper = if idx == 0 { MAX_SCORE } else { BANDS[idx - 1].0 };
        (lower, upper)
    }

    /// Stable machine identifier, as stored and serialized.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            SentimentCategory::VeryPositive => "very_positive",
            SentimentCategory::Positive => "positive",
            SentimentCategory::Neutral => "neutral",
            SentimentCategory::Negative => "negative",
            SentimentCategory::VeryNegative => "very_negative",
        }
    }

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SentimentCategory::VeryPositive => "Very Positive",
            SentimentCategory::Positive => "Positive",
            SentimentCategory::Neutral => "Neutral",
            SentimentCategory::Negative => "Negative",
            SentimentCategory::VeryNegative => "Very Negative",
        }
    }

    /// Builds a SQL `CASE` expression mapping `column` to category slugs.
    ///
    /// Generated from the same band table as [`Self::from_score`], so SQL
    /// aggregation and in-process classification always agree. Rows with a
    /// NULL score evaluate to NULL.
    #[must_use]
    pub fn sql_case(column: &str) -> String {
        let mut sql = format!("CASE WHEN {column} IS NULL THEN NULL");
        for (lower, category) in BANDS {
            let _ = write!(sql, " WHEN {column} >= {lower:?} THEN '{}'", category.slug());
        }
        sql.push_str(" ELSE NULL END");
        sql
    }

    fn index(self) -> usize {
        match self {
            SentimentCategory::VeryPositive => 0,
            SentimentCategory::Positive => 1,
            SentimentCategory::Neutral => 2,
            SentimentCategory::Negative => 3,
            SentimentCategory::VeryNegative => 4,
        }
    }
}

impl std::fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_belong_to_the_upper_band() {
        assert_eq!(
            SentimentCategory::from_score(0.5),
            Some(SentimentCategory::VeryPositive)
        );
        assert_eq!(
            SentimentCategory::from_score(0.1),
            Some(SentimentCategory::Positive)
        );
        assert_eq!(
            SentimentCategory::from_score(-0.1),
            Some(SentimentCategory::Neutral)
        );
        assert_eq!(
            SentimentCategory::from_score(-0.5),
            Some(SentimentCategory::Negative)
        );
    }

    #[test]
    fn closed_outer_edges() {
        assert_eq!(
            SentimentCategory::from_score(1.0),
            Some(SentimentCategory::VeryPositive)
        );
        assert_eq!(
            SentimentCategory::from_score(-1.0),
            Some(SentimentCategory::VeryNegative)
        );
    }

    #[test]
    fn out_of_range_and_nan_have_no_category() {
        assert_eq!(SentimentCategory::from_score(1.01), None);
        assert_eq!(SentimentCategory::from_score(-1.01), None);
        assert_eq!(SentimentCategory::from_score(f64::NAN), None);
    }

    #[test]
    fn every_score_in_range_matches_exactly_one_band() {
        // Walk [-1, 1] in steps of 0.001 and check bounds agree with from_score.
        for step in -1000..=1000 {
            let score = f64::from(step) / 1000.0;
            let matching: Vec<_> = SentimentCategory::ALL
                .into_iter()
                .filter(|c| {
                    let (lower, upper) = c.bounds();
                    if *c == SentimentCategory::VeryPositive {
                        score >= lower && score <= upper
                    } else {
                        score >= lower && score < upper
                    }
                })
                .collect();
            assert_eq!(matching.len(), 1, "score {score} matched {matching:?}");
            assert_eq!(Some(matching[0]), SentimentCategory::from_score(score));
        }
    }

    #[test]
    fn bounds_are_contiguous() {
        let mut expected_upper = MAX_SCORE;
        for category in SentimentCategory::ALL {
            let (lower, upper) = category.bounds();
            assert!((upper - expected_upper).abs() < f64::EPSILON);
            assert!(lower < upper);
            expected_upper = lower;
        }
        assert!((expected_upper - MIN_SCORE).abs() < f64::EPSILON);
    }

    #[test]
    fn slug_round_trips() {
        for category in SentimentCategory::ALL {
            assert_eq!(SentimentCategory::from_slug(category.slug()), Some(category));
        }
        assert_eq!(SentimentCategory::from_slug("meh"), None);
    }

    #[test]
    fn serde_uses_slugs() {
        let json = serde_json::to_string(&SentimentCategory::VeryNegative).unwrap();
        assert_eq!(json, "\"very_negative\"");
    }

    #[test]
    fn sql_case_lists_bands_highest_first() {
        let sql = SentimentCategory::sql_case("sentiment_score");
        assert!(sql.starts_with("CASE WHEN sentiment_score IS NULL THEN NULL"));
        let vp = sql.find("'very_positive'").unwrap();
        let vn = sql.find("'very_negative'").unwrap();
        assert!(vp < vn);
        assert!(sql.contains("sentiment_score >= 0.5 THEN 'very_positive'"));
        assert!(sql.contains("sentiment_score >= -1.0 THEN 'very_negative'"));
    }
}
