use crate::protocol::Verdict;

/// Exit status for a passed gate.
pub const EXIT_PASSED: u8 = 0;
/// Exit status while the gate is blocked or the verdict is FAIL.
pub const EXIT_BLOCKED: u8 = 1;
/// Exit status when the run itself failed.
pub const EXIT_ERROR: u8 = 2;

/// What a single gate run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Questions were generated and posted; waiting for the author.
    QuestionsPosted { comment_id: u64 },
    /// The diff is empty, so there was nothing to ask about.
    NothingToAsk,
    /// Questions exist but nobody has answered yet.
    AwaitingAnswers { questions_comment_id: u64 },
    /// The answers were judged and the result comment written.
    Evaluated {
        verdict: Verdict,
        comment_id: u64,
        /// True when an existing result comment was edited in place.
        updated: bool,
    },
    /// Dry run: the action for this phase was skipped.
    DryRun { phase: &'static str },
}

impl GateOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, GateOutcome::Evaluated { verdict, .. } if verdict.passed())
    }

    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            EXIT_PASSED
        } else {
            EXIT_BLOCKED
        }
    }
}
