use serde::Deserialize;
use serde_json::json;

use crate::agent::openai::{Completion, ResponseSchema, StructuredModel};
use crate::agent::prompt;
use crate::error::{AppError, Result};
use crate::protocol::QUESTION_COUNT;

#[derive(Debug, Deserialize)]
struct GeneratedQuestions {
    questions: Vec<String>,
}

fn questions_schema() -> ResponseSchema {
    ResponseSchema {
        name: "pr_guard_questions",
        schema: json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["questions"],
            "additionalProperties": false
        }),
    }
}

/// Asks the model for questions about a diff.
pub struct QuestionGenerator<'a> {
    model: &'a dyn StructuredModel,
}

impl<'a> QuestionGenerator<'a> {
    pub fn new(model: &'a dyn StructuredModel) -> Self {
        Self { model }
    }

    /// Exactly [`QUESTION_COUNT`] trimmed, non-empty questions, or an error.
    pub async fn generate(&self, diff: &str) -> Result<Vec<String>> {
        let completion = self
            .model
            .complete(
                &prompt::system_prompt_for_questions(),
                &prompt::user_message_for_questions(diff),
                &questions_schema(),
            )
            .await?;

        let value = match completion {
            Completion::Structured(value) => value,
            Completion::Refused(reason) => return Err(AppError::ModelRefusal(reason)),
        };

        let generated: GeneratedQuestions = serde_json::from_value(value).map_err(|e| {
            AppError::ModelApi(format!("Questions response does not match schema: {e}"))
        })?;

        let questions: Vec<String> = generated
            .questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if questions.len() != QUESTION_COUNT {
            return Err(AppError::ModelApi(format!(
                "Expected {QUESTION_COUNT} questions, model returned {}",
                questions.len()
            )));
        }

        Ok(questions)
    }
}
