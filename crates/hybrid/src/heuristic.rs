//! Deterministic text heuristics for proof steps, claims and whole proofs.
//!
//! Every function here is pure: same input, same score, no I/O.

use std::collections::HashSet;

use symbolic::{Domain, Equation, ProofStep};

/// Connectives that signal an inference in a step's reasoning.
const CONNECTIVES: &[&str] = &[
    "implies",
    "therefore",
    "hence",
    "thus",
    "so",
    "because",
    "since",
    "if",
    "then",
    "by",
];

/// Vocabulary of written mathematics.
const PROOF_TERMS: &[&str] = &[
    "theorem",
    "proof",
    "lemma",
    "corollary",
    "definition",
    "assume",
    "suppose",
    "given",
    "let",
    "denote",
    "conclude",
    "derive",
    "follows",
    "equivalently",
];

/// Characters a well-formed equation may consist of (after lowercasing and
/// stripping spaces and underscores).
const EQUATION_OPERATORS: &str = "+-*/=<>";

/// Patterns of an undefined or degenerate algebraic expression.
const DEGENERATE_PATTERNS: &[&str] = &["0/0", "1/0", "**0", "0**"];

const GEOMETRY_TERMS: &[&str] = &["angle", "parallel", "perpendicular"];

const LOGIC_TERMS: &[&str] = &["and", "or", "not", "implies", "iff"];

/// Keywords credited in a whole proof text.
const PROOF_KEYWORDS: &[&str] = &[
    "qed",
    "therefore",
    "by",
    "since",
    "assume",
    "contradiction",
    "implies",
];

const MATH_SYMBOLS: &[&str] = &["=", "=>", "≤", "≥", "∈", "∀", "∃"];

const VAGUE_PHRASES: &[&str] = &[
    "obviously",
    "clearly",
    "trivially",
    "it is known",
    "somehow",
    "basically",
];

const CLAIM_OPERATORS: &[&str] = &["=", "+", "-", "*", "/", "^", "sqrt", "log", "sin", "cos"];

const CLAIM_CONNECTIVES: &[&str] = &[
    "therefore", "thus", "hence", "because", "since", "implies", "if", "then",
];

fn count_present(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| haystack.contains(*n)).count()
}

fn equation_text(step: &ProofStep) -> String {
    step.equation
        .as_ref()
        .map(Equation::as_text)
        .unwrap_or_default()
}

/// Form of a step in [0, 1].
///
/// Points: balanced parentheses +10, equation restricted to letters, digits
/// and `+-*/=<>` +20, 15 per connective in the reasoning (max 30), 10 per
/// proof term (max 30). Divided by 100.
pub fn structural_score(step: &ProofStep) -> f64 {
    let equation: String = equation_text(step)
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .collect();
    let mut points = 0.0;

    if equation.matches('(').count() == equation.matches(')').count() {
        points += 10.0;
    }
    if equation
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || EQUATION_OPERATORS.contains(c))
    {
        points += 20.0;
    }

    let reasoning = step.reasoning.to_lowercase();
    points += (count_present(&reasoning, CONNECTIVES) as f64 * 15.0).min(30.0);
    points += (count_present(&reasoning, PROOF_TERMS) as f64 * 10.0).min(30.0);

    (points / 100.0).clamp(0.0, 1.0)
}

/// Domain-aware plausibility of a step in [0, 1], starting from 0.5.
///
/// Algebra: -0.3 for a degenerate pattern, +0.1 otherwise. Geometry and
/// logic: +0.15 when the reasoning uses domain vocabulary. Then +0.1 for
/// reasoning longer than 20 characters and +0.1 when claim and reasoning
/// share a word.
pub fn plausibility_score(step: &ProofStep) -> f64 {
    let mut score: f64 = 0.5;
    let reasoning = step.reasoning.to_lowercase();

    match step.domain {
        Domain::Algebra => {
            let equation = equation_text(step);
            if DEGENERATE_PATTERNS.iter().any(|p| equation.contains(p)) {
                score -= 0.3;
            } else {
                score += 0.1;
            }
        }
        Domain::Geometry => {
            if count_present(&reasoning, GEOMETRY_TERMS) > 0 {
                score += 0.15;
            }
        }
        Domain::Logic => {
            if count_present(&reasoning, LOGIC_TERMS) > 0 {
                score += 0.15;
            }
        }
    }

    if step.reasoning.trim().chars().count() > 20 {
        score += 0.1;
    }

    let claim = step.claim.to_lowercase();
    let claim_words: HashSet<&str> = claim.split_whitespace().collect();
    let reasoning_words: HashSet<&str> = reasoning.split_whitespace().collect();
    if !claim_words.is_disjoint(&reasoning_words) {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

/// Heuristic quality of a full proof text in [0, 100], starting from 50.
pub fn proof_text_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score = 50.0;

    if lower.contains("qed") {
        score += 20.0;
    } else if lower.contains("therefore") || lower.contains("thus") {
        score += 15.0;
    }

    score += (count_present(&lower, PROOF_KEYWORDS) as f64 * 2.0).min(15.0);

    if MATH_SYMBOLS.iter().any(|s| text.contains(s)) {
        score += 10.0;
    }
    if lower.contains("contradiction") {
        score += 5.0;
    }

    let len = text.chars().count();
    if len < 100 {
        score -= 10.0;
    } else if len > 500 {
        score += 5.0;
    }

    score.clamp(0.0, 100.0)
}

/// Offline quality of a single claim in 0..=100, starting from 75.
///
/// Vague phrases cost 5 each, claims under 10 characters cost 10. Math
/// operators and logical connectives earn 2 each, capped at 10 per group.
pub fn claim_score(claim: &str) -> u8 {
    let lower = claim.to_lowercase();
    let mut score: i64 = 75;

    score -= 5 * count_present(&lower, VAGUE_PHRASES) as i64;
    if claim.chars().count() < 10 {
        score -= 10;
    }
    score += (2 * count_present(claim, CLAIM_OPERATORS) as i64).min(10);
    score += (2 * count_present(&lower, CLAIM_CONNECTIVES) as i64).min(10);

    score.clamp(0, 100) as u8
}
