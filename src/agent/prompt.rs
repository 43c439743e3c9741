use std::borrow::Cow;

use crate::protocol::QUESTION_COUNT;

pub fn system_prompt_for_questions() -> String {
    format!(
        r#"You are pr-guard, a senior engineer checking that the author of a pull request understands their own change.

You will be given the unified diff of the pull request. Write exactly {QUESTION_COUNT} questions for the author.

## What to ask
1. One question about the rationale: why this approach, and what alternative was rejected.
2. One question about failure modes: what breaks, or what input or state would make this change misbehave.
3. One question about validation: how the author checked that the change works.

## Guidelines
- Refer to concrete functions, files, or lines from the diff.
- Keep each question short: one or two sentences.
- Never ask the author to restate what the diff does line by line.
- Do not ask about code style or formatting.

Respond with JSON: {{"questions": ["...", "...", "..."]}}"#
    )
}

pub fn system_prompt_for_evaluation() -> String {
    r#"You are pr-guard, judging whether the author of a pull request understands their own change.

You will be given the diff, the questions that were asked, and the author's answers.

## Policy
Be lenient. Decide PASS when the answers, taken together, show the author knows what the change does and why. All of these count toward PASS:
- Answers that are brief or generic but still refer concretely to the code.
- Honest acknowledgment of shortcuts, hacks, or known limitations.
- Statements that something is out of scope or was deliberately not handled.

Decide FAIL only when the answers:
- are generic filler that could apply to any change,
- contradict what the diff actually does, or
- ignore the questions.

## Output
Respond with JSON: {"decision": "PASS" | "FAIL", "reason": "..."}.
The reason is one or two sentences addressed to the author."#
        .to_string()
}

pub fn user_message_for_questions(diff: &str) -> String {
    format!("Here is the pull request diff:\n\n```diff\n{diff}\n```")
}

pub fn user_message_for_evaluation(diff: &str, questions: &[String], answers: &str) -> String {
    let numbered = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {q}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## Diff\n\n```diff\n{diff}\n```\n\n## Questions\n\n{numbered}\n\n## Author's answers\n\n{answers}"
    )
}

/// Cut `diff` to at most `max_bytes` on a char boundary, appending a notice
/// so the model knows it is seeing part of the change.
pub fn truncate_diff(diff: &str, max_bytes: usize) -> Cow<'_, str> {
    if diff.len() <= max_bytes {
        return Cow::Borrowed(diff);
    }

    let mut cut = max_bytes;
    while !diff.is_char_boundary(cut) {
        cut -= 1;
    }

    Cow::Owned(format!(
        "{}\n\n[diff truncated: showing {cut} of {} bytes]",
        &diff[..cut],
        diff.len()
    ))
}
