//! Provider-agnostic normalization of raw model output into `{score, reasoning}`.
//!
//! Three tiers, tried in order: a JSON object carrying `score`, a
//! `score: N` pattern in free text, then the fixed default.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCORE: u8 = 50;
pub const DEFAULT_REASONING: &str = "No reasoning provided";

/// Pattern-tier reasoning is the raw text cut to this many characters.
const MAX_PATTERN_REASONING_CHARS: usize = 500;

lazy_static! {
    // Whole signed number; the range check happens in `pattern`.
    static ref SCORE_PATTERN: Regex = Regex::new(r"(?i)score[^\w-]{0,4}(-?\d+(?:\.\d+)?)")
        .expect("SCORE_PATTERN regex is valid");
}

/// Canonical judge output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub score: u8,
    pub reasoning: String,
}

impl Default for ParsedResponse {
    fn default() -> Self {
        Self {
            score: DEFAULT_SCORE,
            reasoning: DEFAULT_REASONING.to_string(),
        }
    }
}

/// Which tier produced the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAttempt {
    Structured(ParsedResponse),
    Pattern(ParsedResponse),
    Default(ParsedResponse),
}

impl ParsedAttempt {
    pub fn resolve(raw: &str) -> Self {
        if let Some(parsed) = structured(raw) {
            return ParsedAttempt::Structured(parsed);
        }
        if let Some(parsed) = pattern(raw) {
            return ParsedAttempt::Pattern(parsed);
        }
        ParsedAttempt::Default(ParsedResponse::default())
    }

    pub fn response(&self) -> &ParsedResponse {
        match self {
            ParsedAttempt::Structured(r) | ParsedAttempt::Pattern(r) | ParsedAttempt::Default(r) => r,
        }
    }

    pub fn into_response(self) -> ParsedResponse {
        match self {
            ParsedAttempt::Structured(r) | ParsedAttempt::Pattern(r) | ParsedAttempt::Default(r) => r,
        }
    }
}

/// Normalize raw provider text.
pub fn normalize(raw: &str) -> ParsedResponse {
    ParsedAttempt::resolve(raw).into_response()
}

/// Coerce a score value to 0..=100, or `None` with a warning.
fn coerce_score(value: &serde_json::Value) -> Option<u8> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number.map(f64::round) {
        Some(n) if (0.0..=100.0).contains(&n) => Some(n as u8),
        _ => {
            tracing::warn!(score = %value, default = DEFAULT_SCORE, "Invalid provider score, using default");
            None
        }
    }
}

/// Candidate JSON objects: the whole text, a fenced block, then the
/// outermost braces.
fn json_candidates(raw: &str) -> Vec<&str> {
    let trimmed = raw.trim();
    let mut candidates = vec![trimmed];
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map_or(0, |i| i + 1);
        if let Some(end) = after[body_start..].find("```") {
            candidates.push(after[body_start..body_start + end].trim());
        }
    }
    if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if open < close {
            candidates.push(&trimmed[open..=close]);
        }
    }
    candidates
}

fn structured(raw: &str) -> Option<ParsedResponse> {
    let object = json_candidates(raw)
        .into_iter()
        .filter_map(|c| serde_json::from_str::<serde_json::Value>(c).ok())
        .find(serde_json::Value::is_object)?;
    let score = object.get("score")?;
    let reasoning = object
        .get("reasoning")
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| DEFAULT_REASONING.to_string(), str::to_string);
    Some(ParsedResponse {
        score: coerce_score(score).unwrap_or(DEFAULT_SCORE),
        reasoning,
    })
}

fn pattern(raw: &str) -> Option<ParsedResponse> {
    let captures = SCORE_PATTERN.captures(raw)?;
    let value = captures.get(1)?.as_str();
    let score = value
        .parse::<f64>()
        .ok()
        .map(f64::round)
        .filter(|n| (0.0..=100.0).contains(n))
        .map(|n| n as u8)
        .unwrap_or_else(|| {
            tracing::warn!(score = value, default = DEFAULT_SCORE, "Out-of-range score in text, using default");
            DEFAULT_SCORE
        });
    let reasoning: String = raw.trim().chars().take(MAX_PATTERN_REASONING_CHARS).collect();
    Some(ParsedResponse {
        score,
        reasoning: if reasoning.is_empty() {
            DEFAULT_REASONING.to_string()
        } else {
            reasoning
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response() {
        let attempt = ParsedAttempt::resolve(r#"{"score": 85, "reasoning": "ok"}"#);
        assert_eq!(
            attempt,
            ParsedAttempt::Structured(ParsedResponse {
                score: 85,
                reasoning: "ok".into()
            })
        );
    }

    #[test]
    fn test_free_text_score() {
        let attempt = ParsedAttempt::resolve("Score: 92 - nice");
        assert!(matches!(attempt, ParsedAttempt::Pattern(_)));
        assert_eq!(attempt.response().score, 92);
        assert_eq!(attempt.response().reasoning, "Score: 92 - nice");
    }

    #[test]
    fn test_garbage_uses_default() {
        let attempt = ParsedAttempt::resolve("I cannot evaluate this.");
        assert_eq!(attempt, ParsedAttempt::Default(ParsedResponse::default()));
        assert_eq!(attempt.response().reasoning, "No reasoning provided");
    }

    #[test]
    fn test_embedded_and_fenced_json() {
        let prose = r#"Here you go: {"score": 70, "reasoning": "fine"} hope it helps"#;
        assert_eq!(normalize(prose).score, 70);
        let fenced = "```json\n{\"score\": 64, \"reasoning\": \"gap in step 2\"}\n```";
        let parsed = normalize(fenced);
        assert_eq!(parsed.score, 64);
        assert_eq!(parsed.reasoning, "gap in step 2");
    }

    #[test]
    fn test_invalid_score_replaced_by_default() {
        let attempt = ParsedAttempt::resolve(r#"{"score": "not-a-number", "reasoning": "bad format"}"#);
        assert!(matches!(attempt, ParsedAttempt::Structured(_)));
        assert_eq!(attempt.response().score, 50);
        assert_eq!(normalize(r#"{"score": 150}"#).score, 50);
        assert_eq!(normalize(r#"{"score": -3}"#).score, 50);
    }

    #[test]
    fn test_float_and_string_scores_rounded() {
        assert_eq!(normalize(r#"{"score": 87.6}"#).score, 88);
        assert_eq!(normalize(r#"{"score": "90"}"#).score, 90);
        assert_eq!(normalize("score = 71.4").score, 71);
    }

    #[test]
    fn test_missing_score_key_falls_through() {
        let attempt = ParsedAttempt::resolve(r#"{"verdict": "good", "note": "score: 77"}"#);
        assert!(matches!(attempt, ParsedAttempt::Pattern(_)));
        assert_eq!(attempt.response().score, 77);
    }

    #[test]
    fn test_missing_reasoning_defaults() {
        assert_eq!(normalize(r#"{"score": 10}"#).reasoning, DEFAULT_REASONING);
    }

    #[test]
    fn test_pattern_reasoning_truncated() {
        let raw = format!("The proof score: 78. {}", "x".repeat(1000));
        let parsed = normalize(&raw);
        assert_eq!(parsed.score, 78);
        assert_eq!(parsed.reasoning.chars().count(), 500);
    }

    #[test]
    fn test_pattern_out_of_range() {
        assert_eq!(normalize("score: 450").score, 50);
        assert_eq!(normalize("Score: 1000").score, 50);
        assert_eq!(normalize("Score: -5").score, 50);
        assert_eq!(normalize("score 250 out of 100").score, 50);
        assert_eq!(normalize("score: 100.4").score, 100);
    }

    #[test]
    fn test_pattern_out_of_range_stays_pattern_tier() {
        let attempt = ParsedAttempt::resolve("Final score: 1000 (very confident)");
        assert!(matches!(attempt, ParsedAttempt::Pattern(_)));
        assert_eq!(attempt.response().score, DEFAULT_SCORE);
        assert_eq!(attempt.response().reasoning, "Final score: 1000 (very confident)");
    }

    #[test]
    fn test_pattern_markdown_label() {
        assert_eq!(normalize("**Score:** 85\nSolid argument.").score, 85);
    }
}
