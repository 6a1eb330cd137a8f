//! Extracts a numeric confidence from model answers.

use std::sync::LazyLock;

use regex::Regex;

/// Confidence assigned to a "High" rating.
pub const HIGH_CONFIDENCE: f32 = 0.9;
/// Confidence assigned to a "Medium" rating.
pub const MEDIUM_CONFIDENCE: f32 = 0.6;
/// Confidence assigned to a "Low" rating.
pub const LOW_CONFIDENCE: f32 = 0.3;

static CONFIDENCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)confidence\**\s*(?:level)?\s*[:\-]\s*\**\s*\[?\s*(high|medium|low|\d+(?:\.\d+)?\s*%?)")
        .expect("Invalid regex")
});

/// Parses the "Confidence:" line of an answer into `[0, 1]`.
///
/// Accepts `High`/`Medium`/`Low`, a percentage, or a fraction. Returns
/// `None` when no confidence is stated or the value is out of range.
#[must_use]
pub fn parse_confidence(answer: &str) -> Option<f32> {
    let captures = CONFIDENCE_LINE.captures(answer)?;
    let value = captures.get(1)?.as_str().trim();

    match value.to_ascii_lowercase().as_str() {
        "high" => Some(HIGH_CONFIDENCE),
        "medium" => Some(MEDIUM_CONFIDENCE),
        "low" => Some(LOW_CONFIDENCE),
        numeric => {
            let (number, is_percent) = numeric
                .strip_suffix('%')
                .map_or((numeric, false), |n| (n.trim(), true));
            let parsed: f32 = number.parse().ok()?;
            let scaled = if is_percent || parsed > 1.0 {
                parsed / 100.0
            } else {
                parsed
            };
            (0.0..=1.0).contains(&scaled).then_some(scaled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("3. Confidence: High", Some(HIGH_CONFIDENCE) ; "high")]
    #[test_case("3. Confidence: medium - the image is blurry", Some(MEDIUM_CONFIDENCE) ; "medium_lowercase")]
    #[test_case("**Confidence:** Low", Some(LOW_CONFIDENCE) ; "markdown_bold")]
    #[test_case("3. Confidence: [High]", Some(HIGH_CONFIDENCE) ; "bracketed")]
    #[test_case("Confidence level: 85%", Some(0.85) ; "percentage")]
    #[test_case("Confidence: 0.7", Some(0.7) ; "fraction")]
    #[test_case("Confidence: 70", Some(0.7) ; "bare_percentage")]
    #[test_case("Confidence: 250%", None ; "out_of_range")]
    #[test_case("The picture shows a cat.", None ; "missing")]
    #[test_case("Confidence: unsure", None ; "unparseable")]
    fn test_parse_confidence(answer: &str, expected: Option<f32>) {
        let parsed = parse_confidence(answer);
        match (parsed, expected) {
            (Some(p), Some(e)) => assert!((p - e).abs() < 1e-6, "{p} != {e}"),
            (p, e) => assert_eq!(p, e),
        }
    }

    #[test]
    fn test_parse_from_full_answer() {
        let answer = "1. Direct Answer: A golden retriever.\n\
                      2. Details: The dog is sitting on grass.\n\
                      3. Confidence: High based on clear visibility";

        assert_eq!(parse_confidence(answer), Some(HIGH_CONFIDENCE));
    }
}
