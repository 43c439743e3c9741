use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::protocol::{Verdict, ANSWERS_PREFIX, QUESTIONS_MARKER, RESULT_MARKER};

/// A JSON document hidden inside an HTML comment and tagged with a marker:
///
/// ```text
/// <!-- marker
/// {"key": "value"}
/// -->
/// ```
///
/// The block is invisible in rendered markdown. `<`, `>` and `&` are written
/// as `\u003c`-style escapes so payload text can never close the comment early.
/// A marker only counts when it opens an HTML comment; the bare token in
/// ordinary text is ignored.
#[derive(Debug, Clone, Copy)]
pub struct HiddenPayload {
    marker: &'static str,
}

impl HiddenPayload {
    pub const fn new(marker: &'static str) -> Self {
        Self { marker }
    }

    pub fn is_present(&self, body: &str) -> bool {
        body.match_indices("<!--").any(|(at, open)| {
            body[at + open.len()..]
                .trim_start()
                .strip_prefix(self.marker)
                .is_some_and(|tail| {
                    tail.is_empty() || tail.starts_with(char::is_whitespace) || tail.starts_with("-->")
                })
        })
    }

    /// A marker-only block, for comments that are recognised but never re-read.
    pub fn tag(&self) -> String {
        format!("<!-- {} -->", self.marker)
    }

    pub fn embed<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = serde_json::to_string(value)?
            .replace('<', "\\u003c")
            .replace('>', "\\u003e")
            .replace('&', "\\u0026");
        Ok(format!("<!-- {}\n{json}\n-->", self.marker))
    }

    /// Decode the payload. `Ok(None)` when the marker is absent; an error when
    /// the marker is present but the block is missing or does not decode as `T`.
    pub fn extract<T: DeserializeOwned>(&self, body: &str) -> Result<Option<T>> {
        if !self.is_present(body) {
            return Ok(None);
        }

        let pattern = format!(r"(?s)<!--\s*{}\s*(\{{.*?\}})\s*-->", regex::escape(self.marker));
        let re = Regex::new(&pattern)
            .map_err(|e| AppError::Protocol(format!("Invalid marker pattern: {e}")))?;

        let json = re
            .captures(body)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| {
                AppError::Protocol(format!("Marker {} found but its payload is missing", self.marker))
            })?
            .as_str();

        serde_json::from_str(json).map(Some).map_err(|e| {
            AppError::Protocol(format!("Payload behind {} is not valid: {e}", self.marker))
        })
    }
}

pub const QUESTIONS_PAYLOAD: HiddenPayload = HiddenPayload::new(QUESTIONS_MARKER);
pub const RESULT_PAYLOAD: HiddenPayload = HiddenPayload::new(RESULT_MARKER);

/// Neutralise `<` in text shown to humans, so model or author text cannot
/// open an HTML comment that looks like one of ours.
fn escape_markup(text: &str) -> String {
    text.replace('<', "&lt;")
}

#[derive(Debug, Serialize, Deserialize)]
struct QuestionsPayload {
    questions: Vec<String>,
}

pub fn render_questions(questions: &[String]) -> Result<String> {
    let numbered = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, escape_markup(q.trim()).replace('\n', "\n   ")))
        .collect::<Vec<_>>()
        .join("\n");

    let payload = QUESTIONS_PAYLOAD.embed(&QuestionsPayload {
        questions: questions.to_vec(),
    })?;

    Ok(format!(
        r#"### Questions about this change

Before this check can pass, please answer the questions below in **one** comment that starts with `{ANSWERS_PREFIX}`:

{numbered}

For example:

```
{ANSWERS_PREFIX}
1. ...
2. ...
3. ...
```

Then re-run the check. Short, concrete answers that refer to the code are enough.

{payload}"#
    ))
}

/// Recover the question list from a questions comment.
pub fn parse_questions(body: &str) -> Result<Vec<String>> {
    let payload: QuestionsPayload = QUESTIONS_PAYLOAD.extract(body)?.ok_or_else(|| {
        AppError::Protocol(format!("Comment does not carry the {QUESTIONS_MARKER} marker"))
    })?;

    Ok(payload
        .questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect())
}

pub fn render_result(verdict: &Verdict, answers_comment_id: u64) -> String {
    let headline = if verdict.passed() {
        "### ✅ pr-guard: PASS"
    } else {
        "### ❌ pr-guard: FAIL"
    };

    let next_step = if verdict.passed() {
        "The answers show a working understanding of this change."
    } else {
        "Post a new comment starting with `/answers` that addresses the questions, then re-run the check."
    };

    format!(
        "{headline}\n\n**Reason:** {reason}\n\n{next_step}\n\n_Evaluated answers from comment {answers_comment_id}._\n\n{tag}",
        reason = escape_markup(verdict.reason.trim()),
        tag = RESULT_PAYLOAD.tag(),
    )
}
