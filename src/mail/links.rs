use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

static LIST_UNSUBSCRIBE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(https?://[^>]+)>").expect("valid header pattern"));

/// Body fallbacks, tried in order. The first pattern that matches anywhere wins.
static BODY_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"https?://\S+unsubscribe\S*",
        r"https?://\S+opt-out\S*",
        r"https?://\S+remove\S*",
    ]
    .into_iter()
    .map(|pattern| {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("valid body pattern")
    })
    .collect()
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ')'];

pub fn extract_unsubscribe_url(list_unsubscribe: Option<&str>, body_text: &str) -> Option<String> {
    if let Some(url) = list_unsubscribe.and_then(from_list_unsubscribe) {
        return Some(url);
    }

    from_body(body_text)
}

fn from_list_unsubscribe(header: &str) -> Option<String> {
    LIST_UNSUBSCRIBE_URL
        .captures(header)
        .and_then(|captures| captures.get(1))
        .map(|url| url.as_str().to_string())
}

fn from_body(body_text: &str) -> Option<String> {
    BODY_URL_PATTERNS.iter().find_map(|pattern| {
        pattern
            .find(body_text)
            .map(|found| found.as_str().trim_end_matches(TRAILING_PUNCTUATION).to_string())
            .filter(|url| !url.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_list_unsubscribe_header() {
        let url = extract_unsubscribe_url(
            Some("<mailto:leave@x.com>, <https://x.com/u>"),
            "see https://y.com/unsubscribe",
        );
        assert_eq!(url.as_deref(), Some("https://x.com/u"));
    }

    #[test]
    fn mailto_only_header_falls_back_to_body() {
        let url = extract_unsubscribe_url(
            Some("<mailto:leave@x.com>"),
            "Manage: https://y.com/opt-out/42.",
        );
        assert_eq!(url.as_deref(), Some("https://y.com/opt-out/42"));
    }

    #[test]
    fn pattern_order_beats_position_in_body() {
        let body = "first https://a.com/remove-me then https://b.com/Unsubscribe?id=1";
        assert_eq!(
            from_body(body).as_deref(),
            Some("https://b.com/Unsubscribe?id=1")
        );
    }

    #[test]
    fn strips_stacked_trailing_punctuation() {
        assert_eq!(
            from_body("(link: https://c.com/unsubscribe/9);").as_deref(),
            Some("https://c.com/unsubscribe/9")
        );
    }

    #[test]
    fn no_candidate_yields_none() {
        assert_eq!(extract_unsubscribe_url(None, "just text https://c.com/home"), None);
    }
}
