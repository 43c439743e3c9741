use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::error::{AppError, Result};

/// Output schema a structured completion must conform to.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

/// Outcome of a structured completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A JSON object conforming to the requested schema.
    Structured(serde_json::Value),
    /// The model declined to answer.
    Refused(String),
}

#[async_trait]
pub trait StructuredModel: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        schema: &ResponseSchema,
    ) -> Result<Completion>;
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("pr-guard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    fn build_request(&self, system: &str, user: &str, schema: &ResponseSchema) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema.name.to_string(),
                    strict: true,
                    schema: schema.schema.clone(),
                },
            },
        }
    }
}

#[async_trait]
impl StructuredModel for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        schema: &ResponseSchema,
    ) -> Result<Completion> {
        let request = self.build_request(system, user, schema);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ModelApi(format!("API returned {status}: {body}")));
        }

        let body = response.json::<ChatResponse>().await?;

        if let Some(usage) = &body.usage {
            tracing::info!(
                model = %self.model,
                schema = schema.name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model response"
            );
        }

        interpret(body)
    }
}

/// Turn a chat-completions response into a [`Completion`]. A refusal wins over
/// any content; anything else that is not a complete JSON object is an error.
fn interpret(response: ChatResponse) -> Result<Completion> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::ModelApi("Response contained no choices".to_string()))?;

    if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
        return Ok(Completion::Refused(refusal));
    }

    if choice.finish_reason.as_deref() == Some("length") {
        return Err(AppError::ModelApi(
            "Response was cut off before the JSON was complete".to_string(),
        ));
    }

    let content = choice
        .message
        .content
        .ok_or_else(|| AppError::ModelApi("Response had no content".to_string()))?;

    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| AppError::ModelApi(format!("Response is not valid JSON: {e}")))?;

    if !value.is_object() {
        return Err(AppError::ModelApi(
            "Response JSON is not an object".to_string(),
        ));
    }

    Ok(Completion::Structured(value))
}

// --- Request types ---

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
