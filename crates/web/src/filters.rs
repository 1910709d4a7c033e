//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Percent-encodes a value for use in a URL path segment.
///
/// Usage in templates: `{{ tag|url_encode }}`
#[askama::filter_fn]
pub fn url_encode(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(urlencoding::encode(&value.to_string()).into_owned())
}

/// Truncates text to a word boundary for listing cards.
///
/// Usage in templates: `{{ store.description|excerpt(25) }}`
#[askama::filter_fn]
pub fn excerpt(
    value: impl Display,
    _env: &dyn askama::Values,
    words: usize,
) -> askama::Result<String> {
    Ok(truncate_words(&value.to_string(), words))
}

/// Keep the first `words` whitespace-separated words, appending an ellipsis
/// if anything was dropped.
fn truncate_words(text: &str, words: usize) -> String {
    let mut taken: Vec<&str> = text.split_whitespace().take(words).collect();
    if taken.len() == words && text.split_whitespace().nth(words).is_some() {
        taken.push("...");
    }
    taken.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_words("a few words only", 25), "a few words only");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate_words("one two three four five", 3), "one two three ...");
    }

    #[test]
    fn test_truncate_exact_length_untouched() {
        assert_eq!(truncate_words("one two three", 3), "one two three");
    }
}
