//! Engagement count parsing.
//!
//! Posts expose their counts in an aggregate accessible label such as
//! `"11882 replies, 9777 reposts, 66222 likes, 3696 bookmarks, 9039187 views"`.
//! Counts are pulled out with label-anchored patterns. When no explicit
//! `views` entry exists, the last number in the label is used as a
//! best-effort view count and flagged [`ViewSource::TrailingNumber`].

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{Metrics, MetricsOrigin, ViewCount, ViewSource};

struct LabelPatterns {
    replies: Regex,
    reposts: Regex,
    likes: Regex,
    views: Regex,
    any_number: Regex,
}

fn patterns() -> &'static LabelPatterns {
    static PATTERNS: OnceLock<LabelPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LabelPatterns {
        replies: Regex::new(r"(\d[\d,]*)\s+repl(?:y|ies)\b").expect("replies regex is valid"),
        reposts: Regex::new(r"(\d[\d,]*)\s+reposts?\b").expect("reposts regex is valid"),
        likes: Regex::new(r"(\d[\d,]*)\s+likes?\b").expect("likes regex is valid"),
        views: Regex::new(r"(\d[\d,]*)\s+views?\b").expect("views regex is valid"),
        any_number: Regex::new(r"\d[\d,]*").expect("number regex is valid"),
    })
}

/// Remove thousands separators from a comma-grouped digit string.
fn strip_separators(raw: &str) -> String {
    raw.chars().filter(|c| *c != ',').collect()
}

fn labeled_count(re: &Regex, label: &str) -> Option<u64> {
    re.captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| strip_separators(m.as_str()).parse().ok())
}

/// Parse an aggregate accessible label into engagement counts.
///
/// Counts that do not appear default to zero. A label that names none of
/// replies, reposts or likes is reported as [`MetricsOrigin::AggregateUnparsed`].
pub fn parse_aggregate_label(label: &str) -> Metrics {
    let p = patterns();

    let replies = labeled_count(&p.replies, label);
    let reposts = labeled_count(&p.reposts, label);
    let likes = labeled_count(&p.likes, label);

    let views = match p
        .views
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| strip_separators(m.as_str()))
    {
        Some(v) => ViewCount::new(v, ViewSource::Labeled),
        None => trailing_number(label)
            .map(|v| ViewCount::new(v, ViewSource::TrailingNumber))
            .unwrap_or_default(),
    };

    let origin = if replies.is_some() || reposts.is_some() || likes.is_some() {
        MetricsOrigin::Aggregate
    } else {
        MetricsOrigin::AggregateUnparsed
    };

    Metrics {
        replies: replies.unwrap_or(0),
        reposts: reposts.unwrap_or(0),
        likes: likes.unwrap_or(0),
        views,
        origin,
    }
}

/// Last number in the label, separators removed.
fn trailing_number(label: &str) -> Option<String> {
    patterns()
        .any_number
        .find_iter(label)
        .last()
        .map(|m| strip_separators(m.as_str()))
        .and_then(|digits| digits.parse::<u64>().ok())
        .map(|n| n.to_string())
}

/// Parse the text of a single count control (`"1,234"`).
///
/// Blank text reads as zero; anything that is not a comma-grouped integer
/// yields `None`.
pub fn parse_count(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    strip_separators(trimmed).parse().ok()
}

/// Parse the accessible label of a dedicated views control
/// (`"1,234 views. View post analytics"`).
///
/// Only the number anchored to `view`/`views` is taken; a bare
/// comma-grouped number is accepted as-is. Anything else yields `None`.
pub fn parse_views_label(label: &str) -> Option<String> {
    if let Some(n) = labeled_count(&patterns().views, label) {
        return Some(n.to_string());
    }
    parse_count(label)
        .filter(|_| !label.trim().is_empty())
        .map(|n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_label() {
        let m = parse_aggregate_label("3 replies, 5 reposts, 10 likes, 1200 views");
        assert_eq!(m.replies, 3);
        assert_eq!(m.reposts, 5);
        assert_eq!(m.likes, 10);
        assert_eq!(m.views.as_output(), "1200");
        assert_eq!(m.views.source, ViewSource::Labeled);
        assert_eq!(m.origin, MetricsOrigin::Aggregate);
    }

    #[test]
    fn test_parse_strips_thousands_separators() {
        let m = parse_aggregate_label("11,882 replies, 9,777 reposts, 1,066,222 likes");
        assert_eq!(m.replies, 11882);
        assert_eq!(m.reposts, 9777);
        assert_eq!(m.likes, 1_066_222);
    }

    #[test]
    fn test_reply_count_for_comma_grouped_values() {
        for (raw, expected) in [
            ("0", 0u64),
            ("7", 7),
            ("1,000", 1000),
            ("12,345,678", 12_345_678),
            ("999,999,999,999", 999_999_999_999),
        ] {
            let m = parse_aggregate_label(&format!("{raw} replies, 2 likes"));
            assert_eq!(m.replies, expected, "label value {raw}");
        }
    }

    #[test]
    fn test_trailing_number_heuristic_for_unlabeled_views() {
        let m = parse_aggregate_label("11882 replies, 9777 reposts, 66222 likes, 9039187");
        assert_eq!(m.views.as_output(), "9039187");
        assert_eq!(m.views.source, ViewSource::TrailingNumber);
        assert!(m.views.source.is_heuristic());
    }

    #[test]
    fn test_trailing_number_can_be_bookmarks() {
        // Known imprecision: the trailing bookmark count is taken as views.
        let m = parse_aggregate_label("4 replies, 2 reposts, 8 likes, 3 bookmarks");
        assert_eq!(m.views.as_output(), "3");
        assert_eq!(m.views.source, ViewSource::TrailingNumber);
    }

    #[test]
    fn test_label_without_known_counts_is_unparsed() {
        let m = parse_aggregate_label("View post engagements");
        assert_eq!((m.replies, m.reposts, m.likes), (0, 0, 0));
        assert_eq!(m.views.as_output(), "N/A");
        assert_eq!(m.origin, MetricsOrigin::AggregateUnparsed);
    }

    #[test]
    fn test_singular_forms() {
        let m = parse_aggregate_label("1 reply, 1 repost, 1 like, 1 view");
        assert_eq!((m.replies, m.reposts, m.likes), (1, 1, 1));
        assert_eq!(m.views.as_output(), "1");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count("  "), Some(0));
        assert_eq!(parse_count("12"), Some(12));
        assert_eq!(parse_count("1.2K"), None);
    }

    #[test]
    fn test_parse_views_label() {
        assert_eq!(parse_views_label("1,234 views"), Some("1234".to_string()));
        assert_eq!(parse_views_label(" views"), None);
        assert_eq!(
            parse_views_label("9,039,187 views. View post analytics"),
            Some("9039187".to_string())
        );
        assert_eq!(parse_views_label("1 view"), Some("1".to_string()));
        assert_eq!(parse_views_label("4,500"), Some("4500".to_string()));
        assert_eq!(parse_views_label("View post analytics"), None);
    }
}
