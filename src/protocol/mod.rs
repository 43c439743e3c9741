//! The comment-thread protocol: how pr-guard recognises its own comments and
//! recovers where a pull request stands from nothing but its comment history.

pub mod codec;
pub mod phase;

use serde::Deserialize;

/// Tags the hidden payload of a questions comment.
pub const QUESTIONS_MARKER: &str = "pr-guard:questions";

/// Tags a result comment.
pub const RESULT_MARKER: &str = "pr-guard:result";

/// Literal prefix an author's answers comment must start with.
pub const ANSWERS_PREFIX: &str = "/answers";

/// Number of questions asked per pull request.
pub const QUESTION_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Pass,
    Fail,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Pass => f.write_str("PASS"),
            Decision::Fail => f.write_str("FAIL"),
        }
    }
}

/// The judge's structured answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: String,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.decision == Decision::Pass
    }
}
