//! Sentiment scoring for review text.
//!
//! Scores are polarity values in `[-1.0, 1.0]`. The default classifier is a
//! game-review lexicon with simple negation handling; anything implementing
//! [`SentimentClassifier`] can replace it.

pub mod scorer;

pub use scorer::lexicon_score;

/// Maps review text to a polarity score.
pub trait SentimentClassifier: Send + Sync {
    /// Score `text`. Implementations should return a finite value in
    /// `[-1.0, 1.0]`; callers clamp and reject NaN regardless.
    fn classify(&self, text: &str) -> f64;
}

/// Classifier backed by the built-in review lexicon.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconClassifier;

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> f64 {
        lexicon_score(text)
    }
}
