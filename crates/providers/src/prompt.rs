//! Prompt text for judge calls.

/// System instruction shared by every provider.
pub const SYSTEM_PROMPT: &str = "You are a rigorous mathematics referee. \
Grade the logical soundness of the claim and its justification. \
Reply with a single JSON object and nothing else.";

/// Build the user message asking for `{"score": 0-100, "reasoning": "..."}`.
pub fn format_evaluation_prompt(claim: &str, reasoning: &str) -> String {
    let reasoning = reasoning.trim();
    let justification = if reasoning.is_empty() {
        "(none given)"
    } else {
        reasoning
    };
    format!(
        "Evaluate this mathematical claim for logical soundness.\n\n\
         Claim:\n{claim}\n\n\
         Justification:\n{justification}\n\n\
         Respond as JSON: {{\"score\": <integer 0-100>, \"reasoning\": \"<one or two sentences>\"}}"
    )
}
