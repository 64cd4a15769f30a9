use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::OracleSettings;
use crate::error::{AppError, AppResult};

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> AppResult<String>;
}

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    http: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn from_settings(http: Client, settings: &OracleSettings) -> AppResult<Self> {
        let endpoint = chat_endpoint(settings.base_url())?;

        Ok(Self {
            http,
            endpoint,
            api_key: settings.api_key()?.to_string(),
            model: settings.model().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionModel for OpenAiChat {
    async fn complete(&self, request: ChatRequest) -> AppResult<String> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Oracle(format!(
                "chat completion failed ({status}): {}",
                body.trim()
            )));
        }

        let payload: ChatCompletionResponse = response.json().await?;
        first_choice_content(payload)
    }
}

// Appends to the configured path so prefixes like `/api/v1` survive.
fn chat_endpoint(base_url: &str) -> AppResult<Url> {
    let base = Url::parse(&format!("{}/", base_url.trim().trim_end_matches('/')))?;
    Ok(base.join(CHAT_COMPLETIONS_PATH)?)
}

fn first_choice_content(payload: ChatCompletionResponse) -> AppResult<String> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| AppError::Oracle("chat completion returned no content".to_string()))
}
