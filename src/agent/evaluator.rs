use serde_json::json;

use crate::agent::openai::{Completion, ResponseSchema, StructuredModel};
use crate::agent::prompt;
use crate::error::{AppError, Result};
use crate::protocol::Verdict;

fn verdict_schema() -> ResponseSchema {
    ResponseSchema {
        name: "pr_guard_verdict",
        schema: json!({
            "type": "object",
            "properties": {
                "decision": { "type": "string", "enum": ["PASS", "FAIL"] },
                "reason": { "type": "string" }
            },
            "required": ["decision", "reason"],
            "additionalProperties": false
        }),
    }
}

/// Asks the model to judge the author's answers.
pub struct AnswerEvaluator<'a> {
    model: &'a dyn StructuredModel,
}

impl<'a> AnswerEvaluator<'a> {
    pub fn new(model: &'a dyn StructuredModel) -> Self {
        Self { model }
    }

    pub async fn evaluate(&self, diff: &str, questions: &[String], answers: &str) -> Result<Verdict> {
        let completion = self
            .model
            .complete(
                &prompt::system_prompt_for_evaluation(),
                &prompt::user_message_for_evaluation(diff, questions, answers),
                &verdict_schema(),
            )
            .await?;

        match completion {
            Completion::Structured(value) => serde_json::from_value(value).map_err(|e| {
                AppError::ModelApi(format!("Verdict response does not match schema: {e}"))
            }),
            Completion::Refused(reason) => Err(AppError::ModelRefusal(reason)),
        }
    }
}
