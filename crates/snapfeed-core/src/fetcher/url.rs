//! Post URL and ID parsing.

use regex::Regex;
use std::sync::OnceLock;

/// Extract a post ID from any of the accepted URL shapes.
///
/// Accepted inputs: `twitter.com/<user>/status/<id>`,
/// `x.com/<user>/status/<id>`, any `.../status/<id>` suffix, or a bare
/// 19-digit ID. Returns `None` for anything else; never errors.
pub fn extract_post_id(input: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"twitter\.com/\w+/status/(\d+)").unwrap(),
            Regex::new(r"x\.com/\w+/status/(\d+)").unwrap(),
            Regex::new(r"/status/(\d+)").unwrap(),
            Regex::new(r"^(\d{19})$").unwrap(),
        ]
    });

    patterns
        .iter()
        .find_map(|p| p.captures(input))
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_twitter_url() {
        assert_eq!(
            extract_post_id("https://twitter.com/karpathy/status/1928105439368995193"),
            Some("1928105439368995193".to_string())
        );
    }

    #[test]
    fn extracts_from_x_url() {
        assert_eq!(
            extract_post_id("https://x.com/AndrewYNg/status/1000000000000000001"),
            Some("1000000000000000001".to_string())
        );
    }

    #[test]
    fn extracts_from_bare_status_path() {
        assert_eq!(
            extract_post_id("/status/1234567890"),
            Some("1234567890".to_string())
        );
    }

    #[test]
    fn extracts_bare_19_digit_id() {
        assert_eq!(
            extract_post_id("1928105439368995193"),
            Some("1928105439368995193".to_string())
        );
    }

    #[test]
    fn rejects_non_matching_input() {
        assert_eq!(extract_post_id("https://example.com/foo"), None);
        assert_eq!(extract_post_id("not a url"), None);
        assert_eq!(extract_post_id("12345"), None);
        assert_eq!(extract_post_id(""), None);
    }

    #[test]
    fn url_with_query_string_still_matches() {
        assert_eq!(
            extract_post_id("https://twitter.com/user/status/42?s=20"),
            Some("42".to_string())
        );
    }
}
