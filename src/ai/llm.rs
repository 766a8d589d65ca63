use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::ProviderError;

/// One generation call: the prompt plus its output limits.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Maximum length of the returned text, in characters.
    pub max_length: usize,
    /// Completion token budget handed to the provider.
    pub token_budget: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_length: usize, token_budget: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_length,
            token_budget,
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.prompt.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("prompt is empty".to_string()));
        }
        if self.max_length == 0 {
            return Err(ProviderError::InvalidRequest(
                "max_length must be positive".to_string(),
            ));
        }
        if self.token_budget == 0 {
            return Err(ProviderError::InvalidRequest(
                "token_budget must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

// ── YandexGPT wire types ───────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: &'a str,
    completion_options: CompletionOptions,
    messages: Vec<YandexMessage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f32,
    /// int64 fields travel as strings in the REST API
    max_tokens: String,
}

#[derive(Debug, Serialize)]
struct YandexMessage<'a> {
    role: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
    usage: Option<YandexUsage>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: AlternativeMessage,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlternativeMessage {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YandexUsage {
    pub input_text_tokens: Option<String>,
    pub completion_tokens: Option<String>,
    pub total_tokens: Option<String>,
}

pub struct YandexGptClient {
    client: Client,
    api_url: String,
    api_key: String,
    model_uri: String,
    temperature: f32,
}

impl YandexGptClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            api_url: config.yandex_api_url.clone(),
            api_key: config.yandex_api_key.clone(),
            model_uri: config.yandex_model_uri.clone(),
            temperature: config.temperature,
        })
    }

    fn build_body<'a>(&'a self, request: &'a GenerationRequest) -> CompletionRequest<'a> {
        CompletionRequest {
            model_uri: &self.model_uri,
            completion_options: CompletionOptions {
                stream: false,
                temperature: self.temperature,
                max_tokens: request.token_budget.to_string(),
            },
            messages: vec![YandexMessage {
                role: "user",
                text: &request.prompt,
            }],
        }
    }
}

#[async_trait]
impl TextGenerator for YandexGptClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        request.validate()?;

        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&self.build_body(request))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let raw = resp.text().await?;
        let text = parse_completion(&raw)?;
        Ok(fit_to_length(&text, request.max_length))
    }
}

/// Pull the first alternative's text out of a completion response body.
fn parse_completion(raw: &str) -> Result<String, ProviderError> {
    let parsed: CompletionResponse =
        serde_json::from_str(raw).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    if let Some(usage) = &parsed.result.usage {
        tracing::debug!(
            model_version = parsed.result.model_version.as_deref().unwrap_or("?"),
            input = usage.input_text_tokens.as_deref().unwrap_or("?"),
            completion = usage.completion_tokens.as_deref().unwrap_or("?"),
            total = usage.total_tokens.as_deref().unwrap_or("?"),
            "YandexGPT usage"
        );
    }

    let first = parsed
        .result
        .alternatives
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("no alternatives in response".to_string()))?;

    let text = first.message.text.trim().to_string();
    if text.is_empty() {
        return Err(ProviderError::Malformed(format!(
            "empty alternative (status {})",
            first.status.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

/// Cap `text` at `max_len` characters without splitting a code point.
fn fit_to_length(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}
