use std::env;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::request::FeedbackRequest;
use crate::settings::{FeedbackProviderKind, FeedbackSettings};

const CONNECT_TIMEOUT_SECS: u64 = 5;

const TRAINER_SYSTEM_PROMPT: &str = "You are a professional, motivating personal trainer. \
You analyze exercise performance and give constructive, specific and encouraging feedback. \
Use a friendly but professional tone and focus on practical, actionable points.";

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("no endpoint configured for the {0} feedback provider")]
    MissingEndpoint(&'static str),

    #[error("environment variable {0} holding the API key is not set")]
    MissingApiKey(String),

    #[error("feedback request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feedback service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("feedback service returned an unexpected payload: {0}")]
    Malformed(String),

    #[error("feedback service returned no text")]
    Empty,
}

/// Something that turns a [`FeedbackRequest`] into coaching text.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &FeedbackRequest) -> Result<String, FeedbackError>;
}

fn http_client(timeout: Duration) -> Result<Client, FeedbackError> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(timeout)
        .build()?)
}

/// Builds the provider selected in `settings`, or `None` when feedback is
/// generated locally.
pub fn from_settings(
    settings: &FeedbackSettings,
) -> Result<Option<Box<dyn FeedbackProvider>>, FeedbackError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    match settings.provider {
        FeedbackProviderKind::None => Ok(None),
        FeedbackProviderKind::Relay => {
            let endpoint = settings
                .endpoint
                .clone()
                .ok_or(FeedbackError::MissingEndpoint("relay"))?;
            Ok(Some(Box::new(RelayProvider::new(endpoint, timeout)?)))
        }
        FeedbackProviderKind::ChatCompletions => {
            let api_key = env::var(&settings.api_key_env)
                .map_err(|_| FeedbackError::MissingApiKey(settings.api_key_env.clone()))?;
            let base_url = settings
                .endpoint
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            Ok(Some(Box::new(ChatCompletionsProvider {
                client: http_client(timeout)?,
                base_url,
                api_key,
                model: settings.model.clone(),
                temperature: settings.temperature,
                max_tokens: settings.max_tokens,
            })))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    feedback: Option<String>,
}

/// Posts `{prompt, metadata}` to a relay service that answers `{feedback}`.
#[derive(Debug, Clone)]
pub struct RelayProvider {
    client: Client,
    url: String,
}

impl RelayProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedbackError> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedbackProvider for RelayProvider {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn generate(&self, request: &FeedbackRequest) -> Result<String, FeedbackError> {
        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FeedbackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RelayResponse =
            serde_json::from_str(&body).map_err(|e| FeedbackError::Malformed(e.to_string()))?;
        non_empty(parsed.feedback)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
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

/// Calls an OpenAI-compatible `/chat/completions` endpoint directly.
#[derive(Clone)]
pub struct ChatCompletionsProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl fmt::Debug for ChatCompletionsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsProvider {
    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl FeedbackProvider for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        "chat_completions"
    }

    async fn generate(&self, request: &FeedbackRequest) -> Result<String, FeedbackError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: TRAINER_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FeedbackError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| FeedbackError::Malformed(e.to_string()))?;
        non_empty(
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        )
    }
}

fn non_empty(text: Option<String>) -> Result<String, FeedbackError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(FeedbackError::Empty),
    }
}
