//! Deterministic input gate for proposal text.
//!
//! Runs after the validation stage's model call and regardless of what the
//! model said — a hard gate, not advisory. Submissions that are mostly URLs
//! (scraped link lists, pasted bookmarks) are rejected before any further
//! model calls are spent on them.

/// Maximum tolerated URL occurrences in a submission.
const MAX_URL_COUNT: usize = 3;

/// Submissions shorter than this that still contain a URL are rejected.
const MIN_CHARS_WITH_URL: usize = 100;

/// Returns true when the proposal is URL-dominant or too short to evaluate.
pub fn rejects(proposal_text: &str) -> bool {
    let urls = count_url_prefixes(proposal_text);
    let chars = proposal_text.chars().count();
    urls > MAX_URL_COUNT || (urls > 0 && chars < MIN_CHARS_WITH_URL)
}

/// Case-insensitive count of `http://` and `https://` occurrences.
fn count_url_prefixes(text: &str) -> usize {
    let lowered = text.to_lowercase();
    lowered.matches("http://").count() + lowered.matches("https://").count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_urls_in_short_text_rejected() {
        let text = format!("{}xx", "http://a.cn ".repeat(4));
        assert_eq!(text.chars().count(), 50);
        assert!(rejects(&text));
    }

    #[test]
    fn test_one_url_in_tiny_text_rejected() {
        let text = format!("{}{}", "https://example.com/x ", "材料".repeat(9));
        assert_eq!(text.chars().count(), 40);
        assert!(rejects(&text));
    }

    #[test]
    fn test_two_urls_in_long_text_passes() {
        let text = format!(
            "http://a.cn https://b.cn {}",
            "本人长期从事凝聚态物理研究。".repeat(34)
        );
        assert!(text.chars().count() >= 500);
        assert!(!rejects(&text));
    }

    #[test]
    fn test_no_urls_always_passes() {
        assert!(!rejects("短"));
        assert!(!rejects(&"很长的申请材料。".repeat(100)));
    }

    #[test]
    fn test_url_counting_is_case_insensitive() {
        let text = "HTTP://a.cn Https://b.cn HTTPS://c.cn http://d.cn";
        assert!(rejects(text));
    }

    #[test]
    fn test_exactly_three_urls_with_enough_text_passes() {
        let text = format!("http://a http://b http://c {}", "研究内容".repeat(30));
        assert!(!rejects(&text));
    }
}
