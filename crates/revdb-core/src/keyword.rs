//! Keyword normalization shared by every entry point that counts keyword
//! mentions.

use thiserror::Error;

/// Longest accepted keyword, in bytes, after trimming.
pub const MAX_KEYWORD_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeywordError {
    #[error("keyword must not be blank")]
    Blank,
    #[error("keyword must be at most {MAX_KEYWORD_LEN} bytes")]
    TooLong,
}

/// Trims surrounding whitespace and checks the result is usable.
///
/// Matching stays case-sensitive; only the ends are trimmed.
///
/// # Errors
///
/// Returns [`KeywordError::Blank`] for empty or all-whitespace input, or
/// [`KeywordError::TooLong`] when the trimmed keyword exceeds
/// [`MAX_KEYWORD_LEN`].
pub fn normalize_keyword(raw: &str) -> Result<&str, KeywordError> {
    let keyword = raw.trim();
    if keyword.is_empty() {
        return Err(KeywordError::Blank);
    }
    if keyword.len() > MAX_KEYWORD_LEN {
        return Err(KeywordError::TooLong);
    }
    Ok(keyword)
}
