use crate::config::Config;
use crate::i18n::Locale;
use crate::retry::{with_retry_if, RetryConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Most strings sent in one chat completion, so the reply fits the
/// completion token budget
pub const MAX_ITEMS_PER_REQUEST: usize = 40;

/// Sub-requests of one batch that may be in flight at once
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Machine-translation backend.
///
/// Receives a batch of distinct source strings and returns their
/// translations keyed by source text. Any error fails the whole batch.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate_batch(
        &self,
        texts: &[String],
        target: Locale,
    ) -> Result<HashMap<String, String>>;
}

/// Non-success HTTP status returned by the provider API
#[derive(Debug, thiserror::Error)]
#[error("Translation API error ({status}): {body}")]
pub struct ApiStatusError {
    pub status: u16,
    pub body: String,
}

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// One source string, tagged with its position in the batch
#[derive(Debug, Serialize, Deserialize)]
struct BatchItem {
    id: usize,
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchReply {
    translations: Vec<BatchItem>,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

fn build_system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You translate user interface strings of a solar-energy savings website from {source} to {target}.

## Input
A JSON array of objects {{"id": number, "text": string}}.

## Output
Reply with a JSON object {{"translations": [{{"id": number, "text": string}}]}} containing exactly one entry per input id.

## Rules
- Keep placeholders such as {{name}} or {{{{amount}}}} exactly as written
- Keep URLs, e-mail addresses and HTML tags unchanged
- Keep brand and product names untranslated
- Keep numbers, units (kWh, kWc, €) and punctuation style appropriate for {target}
- Translate short labels as labels, not sentences
- Never add explanations"#,
        source = source_language,
        target = target_language
    )
}

fn build_user_prompt(items: &[BatchItem]) -> Result<String> {
    serde_json::to_string(items).context("Failed to encode translation batch")
}

/// Strip a markdown code fence the model may wrap its JSON in
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Map the model's id-tagged reply back onto the source strings.
///
/// Result order in the reply does not matter. Every input id must be
/// answered; unknown ids are an error.
fn map_reply(texts: &[String], reply: BatchReply) -> Result<HashMap<String, String>> {
    let mut translated: HashMap<String, String> = HashMap::with_capacity(texts.len());
    for item in reply.translations {
        let source = texts
            .get(item.id)
            .with_context(|| format!("Translation reply referenced unknown id {}", item.id))?;
        translated.insert(source.clone(), item.text);
    }

    if let Some(missing) = texts.iter().find(|text| !translated.contains_key(*text)) {
        anyhow::bail!(
            "Translation reply incomplete: {} of {} entries, first missing {:?}",
            translated.len(),
            texts.len(),
            missing
        );
    }

    Ok(translated)
}

/// Retry 429 and 5xx responses plus transport failures; other 4xx are final
fn is_retryable_error(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<ApiStatusError>() {
        Some(api_error) => api_error.status == 429 || api_error.status >= 500,
        None => true,
    }
}

/// Provider backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    retry: RetryConfig,
    items_per_request: usize,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.openai_api_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            retry: RetryConfig::provider_call(config.provider_max_attempts),
            items_per_request: MAX_ITEMS_PER_REQUEST,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_items_per_request(mut self, items: usize) -> Self {
        self.items_per_request = items.max(1);
        self
    }

    fn build_request(&self, texts: &[String], target: Locale) -> Result<TranslationRequest> {
        let items: Vec<BatchItem> = texts
            .iter()
            .enumerate()
            .map(|(id, text)| BatchItem {
                id,
                text: text.clone(),
            })
            .collect();

        let is_reasoning = is_reasoning_model(&self.model);
        let source = Locale::default_locale();

        Ok(TranslationRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(source.name(), target.name()),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(&items)?,
                },
            ],
            max_completion_tokens: if is_reasoning { 16000 } else { 4000 },
            temperature: if is_reasoning { None } else { Some(0.2) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
            response_format: ResponseFormat {
                kind: "json_object",
            },
        })
    }
}

impl OpenAiProvider {
    /// One chat completion for at most `items_per_request` strings.
    async fn translate_chunk(
        &self,
        texts: &[String],
        target: Locale,
    ) -> Result<HashMap<String, String>> {
        let request = self.build_request(texts, target)?;

        let content = with_retry_if(
            &self.retry,
            &format!("Translation of {} strings to {}", texts.len(), target.code()),
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                    .context("Failed to send translation request")?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    return Err(ApiStatusError { status, body }.into());
                }

                let chat_response: ChatResponse = response
                    .json()
                    .await
                    .context("Failed to parse translation response")?;

                chat_response
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .context("Translation response contained no choices")
            },
            is_retryable_error,
        )
        .await?;

        let reply: BatchReply = serde_json::from_str(strip_code_fence(&content))
            .context("Translation reply was not the expected JSON shape")?;

        map_reply(texts, reply)
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    /// Large batches are split into bounded sub-requests. Any failing
    /// sub-request fails the whole batch.
    async fn translate_batch(
        &self,
        texts: &[String],
        target: Locale,
    ) -> Result<HashMap<String, String>> {
        let chunks = texts.len().div_ceil(self.items_per_request);
        if chunks > 1 {
            debug!(
                count = texts.len(),
                chunks,
                target = %target,
                "Splitting translation batch"
            );
        }

        let requests: Vec<_> = texts
            .chunks(self.items_per_request)
            .map(|chunk| self.translate_chunk(chunk, target))
            .collect();
        let mut results = stream::iter(requests).buffer_unordered(MAX_CONCURRENT_REQUESTS);

        let mut translated = HashMap::with_capacity(texts.len());
        while let Some(result) = results.next().await {
            translated.extend(result?);
        }
        Ok(translated)
    }
}
