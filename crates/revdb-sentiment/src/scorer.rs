//! Lexicon scorer tuned for game reviews.

use revdb_core::{MAX_SCORE, MIN_SCORE};

/// Word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("good", 0.3),
    ("great", 0.4),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("awesome", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("best", 0.5),
    ("fun", 0.4),
    ("enjoy", 0.3),
    ("enjoyed", 0.3),
    ("recommend", 0.4),
    ("addictive", 0.3),
    ("beautiful", 0.4),
    ("stunning", 0.5),
    ("smooth", 0.3),
    ("polished", 0.4),
    ("masterpiece", 0.6),
    ("worth", 0.3),
    ("nice", 0.2),
    ("like", 0.2),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("worst", -0.6),
    ("hate", -0.5),
    ("boring", -0.4),
    ("broken", -0.5),
    ("buggy", -0.5),
    ("bugs", -0.3),
    ("lag", -0.3),
    ("laggy", -0.4),
    ("crash", -0.4),
    ("crashes", -0.4),
    ("cheaters", -0.5),
    ("cheater", -0.4),
    ("hackers", -0.5),
    ("refund", -0.4),
    ("trash", -0.6),
    ("garbage", -0.6),
    ("unplayable", -0.7),
    ("waste", -0.5),
    ("disappointing", -0.4),
    ("problem", -0.2),
];

/// Words that flip the polarity of the lexicon word immediately after them.
const NEGATORS: &[&str] = &["not", "no", "never", "don't", "isn't", "wasn't", "didn't"];

fn weight(word: &str) -> Option<f64> {
    LEXICON
        .iter()
        .find(|(lex_word, _)| *lex_word == word)
        .map(|&(_, w)| w)
}

/// Score a text string using the review lexicon.
///
/// Splits text into lowercase words and sums matching weights. A weight is
/// negated when the preceding word is a negator ("not fun" scores as
/// negative). The sum is clamped to `[-1.0, 1.0]`. Returns `0.0` for empty or
/// unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f64 {
    let mut score = 0.0_f64;
    let mut negate_next = false;

    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(weight) = weight(&w) {
            score += if negate_next { -weight } else { weight };
        }
        negate_next = NEGATORS.contains(&w.as_str());
    }

    score.clamp(MIN_SCORE, MAX_SCORE)
}
