// Prompt constants for the Anthropic-backed fragment producer.
// Templates are filled with `.replace("{name}", ..)` before sending.

use crate::constraints::ConstraintSet;

/// System prompt for every generation round.
pub const GENERATION_SYSTEM: &str = "You are a careful writer who follows structural \
    requirements exactly. Each turn you receive a status margin that reports how much \
    text exists so far and which constraints are met. \
    Write plain text only. Do NOT add headings, commentary or explanations about the margin.";

/// First-round prompt. Replace `{instruction}`, `{constraints}` and `{margin}`.
pub const INITIAL_PROMPT_TEMPLATE: &str = r#"You are generating a response to: {instruction}{constraints}

The margin below shows your current generation state and constraint satisfaction status.
Pay close attention to the constraint checklist and current counts shown in the margin.
Generate text while monitoring the margin to ensure you satisfy all constraints.

{margin}"#;

/// Later-round prompt. Replace `{instruction}`, `{generated}` and `{margin}`.
pub const CONTINUE_PROMPT_TEMPLATE: &str = r#"You are continuing to generate a response to: {instruction}

You have generated so far:
{generated}

The margin below shows your current generation state and constraint satisfaction status.
Pay close attention to the constraint checklist and current counts shown in the margin.
Continue generation while monitoring the margin to ensure you satisfy all constraints.

{margin}

Important: Only generate the next portion of text. Do not repeat what you've already generated."#;

pub fn build_initial_prompt(instruction: &str, constraints: &ConstraintSet, margin: &str) -> String {
    INITIAL_PROMPT_TEMPLATE
        .replace("{instruction}", instruction)
        .replace("{constraints}", &describe_constraints(constraints))
        .replace("{margin}", margin)
}

pub fn build_continue_prompt(instruction: &str, generated: &str, margin: &str) -> String {
    // `{margin}` first: generated text may itself contain a literal "{margin}".
    CONTINUE_PROMPT_TEMPLATE
        .replace("{margin}", margin)
        .replace("{instruction}", instruction)
        .replace("{generated}", generated)
}

/// `\n\nConstraints to satisfy:\n- lines: {"target":4,"tolerance":0}\n...`, or
/// nothing when the set is empty.
fn describe_constraints(constraints: &ConstraintSet) -> String {
    if constraints.dimensions().is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\nConstraints to satisfy:\n");
    for dimension in constraints.dimensions() {
        let payload = constraints
            .get(dimension)
            .and_then(|c| serde_json::to_string(c).ok())
            .unwrap_or_else(|| "unreadable".to_string());
        out.push_str(&format!("- {dimension}: {payload}\n"));
    }
    out
}
