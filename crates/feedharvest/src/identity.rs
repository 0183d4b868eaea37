//! Post identifier extraction from permalinks.

use url::Url;

/// Parse the post identifier from a permalink.
///
/// Uses the path segment following `status`, or the last non-empty path
/// segment when there is none. Query strings and fragments are ignored.
/// Relative paths (`/user/status/123`) are accepted.
pub fn parse_post_id(permalink: &str) -> Option<String> {
    let trimmed = permalink.trim();
    if trimmed.is_empty() {
        return None;
    }

    let path = match Url::parse(trimmed) {
        Ok(url) => url.path().to_string(),
        Err(_) => trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let after_status = segments
        .iter()
        .position(|s| *s == "status")
        .and_then(|i| segments.get(i + 1));

    after_status
        .or_else(|| segments.last())
        .map(|s| s.to_string())
}
