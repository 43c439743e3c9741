pub mod evaluator;
pub mod openai;
pub mod prompt;
pub mod questions;

pub use evaluator::AnswerEvaluator;
pub use openai::{Completion, OpenAiClient, ResponseSchema, StructuredModel};
pub use questions::QuestionGenerator;
