use crate::platform::types::Comment;
use crate::protocol::codec::{HiddenPayload, QUESTIONS_PAYLOAD, RESULT_PAYLOAD};
use crate::protocol::ANSWERS_PREFIX;

/// Where a pull request stands in the question/answer protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase<'a> {
    /// No questions have been posted yet.
    NeedsQuestions,
    /// Questions are posted; the author has not replied with `/answers`.
    AwaitingAnswers { questions: &'a Comment },
    /// Both questions and answers exist.
    ReadyToEvaluate {
        questions: &'a Comment,
        answers: &'a Comment,
    },
}

impl Phase<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::NeedsQuestions => "NEEDS_QUESTIONS",
            Phase::AwaitingAnswers { .. } => "AWAITING_ANSWERS",
            Phase::ReadyToEvaluate { .. } => "READY_TO_EVALUATE",
        }
    }
}

impl std::fmt::Display for Phase<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub phase: Phase<'a>,
    /// Newest existing result comment, updated in place on the next verdict.
    pub result_comment_id: Option<u64>,
}

pub fn is_answers_comment(body: &str) -> bool {
    body.trim().starts_with(ANSWERS_PREFIX)
}

/// Classify a pull request from its comments.
///
/// `comments` is taken to be in creation order; when several comments qualify
/// for a role the one latest in the slice wins. An answers comment is only ever
/// an answers comment, whatever it quotes. Never fails: malformed payloads are
/// only detected when the questions comment is decoded.
pub fn resolve_phase(comments: &[Comment]) -> Resolution<'_> {
    let tagged = |c: &Comment, payload: HiddenPayload| {
        !is_answers_comment(&c.body) && payload.is_present(&c.body)
    };

    let result_comment_id = newest(comments, |c| tagged(c, RESULT_PAYLOAD)).map(|c| c.id);

    let phase = match newest(comments, |c| tagged(c, QUESTIONS_PAYLOAD)) {
        None => Phase::NeedsQuestions,
        Some(questions) => match newest(comments, |c| is_answers_comment(&c.body)) {
            None => Phase::AwaitingAnswers { questions },
            Some(answers) => Phase::ReadyToEvaluate { questions, answers },
        },
    };

    Resolution {
        phase,
        result_comment_id,
    }
}

fn newest<'a>(comments: &'a [Comment], pred: impl Fn(&Comment) -> bool) -> Option<&'a Comment> {
    comments.iter().rev().find(|&c| pred(c))
}
