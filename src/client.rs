//! Client side of the translation API.
//!
//! `HttpTranslateClient` speaks to the server's batch endpoint and plugs
//! into the `RequestCoalescer`. `ClientTranslator` ties the coalescer to the
//! `LocaleContext`, and `LocalizedText` is the leaf primitive a renderer
//! holds for each displayed string.

use crate::coalescer::RequestCoalescer;
use crate::config::ClientConfig;
use crate::context::LocaleContext;
use crate::error::TranslateError;
use crate::i18n::Locale;
use crate::resolver::{distinct_texts, BatchTranslate, TranslationMap};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest<'a> {
    texts: &'a [String],
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    translations: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    supported: Vec<String>,
}

/// HTTP client for `/api/translate/batch`.
#[derive(Debug, Clone)]
pub struct HttpTranslateClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTranslateClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client, config.translate_api_url.clone()))
    }
}

#[async_trait]
impl BatchTranslate for HttpTranslateClient {
    async fn translate_many(
        &self,
        texts: &[String],
        target: &str,
    ) -> Result<TranslationMap, TranslateError> {
        debug!(count = texts.len(), target = %target, "Requesting translation batch");

        let response = self
            .client
            .post(format!("{}/api/translate/batch", self.base_url))
            .json(&BatchRequest {
                texts,
                target_lang: target,
            })
            .send()
            .await
            .map_err(unavailable)?;

        let response = check_status(response, target).await?;
        let mut body: BatchResponse = response.json().await.map_err(unavailable)?;

        Ok(distinct_texts(texts)
            .into_iter()
            .map(|text| {
                let translated = body
                    .translations
                    .remove(&text)
                    .unwrap_or_else(|| text.clone());
                (text, translated)
            })
            .collect())
    }
}

fn unavailable(error: reqwest::Error) -> TranslateError {
    TranslateError::ProviderUnavailable(error.to_string())
}

/// Turn 400 bodies back into caller errors; anything else non-2xx is
/// treated as the service being unavailable.
async fn check_status(
    response: reqwest::Response,
    target: &str,
) -> Result<reqwest::Response, TranslateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::BAD_REQUEST {
        if let Ok(body) = response.json::<ErrorBody>().await {
            match body.error.as_str() {
                "invalid_locale" => {
                    return Err(TranslateError::InvalidLocale {
                        code: target.to_string(),
                        supported: body.supported,
                    })
                }
                "empty_input" => return Err(TranslateError::EmptyInput),
                _ => return Err(TranslateError::ProviderUnavailable(body.message)),
            }
        }
    }

    Err(TranslateError::ProviderUnavailable(format!(
        "translation service returned {}",
        status
    )))
}

/// Translation entry point for rendering code.
///
/// Pairs the locale context with the coalescer that `LocalizedText`
/// resolves through.
#[derive(Clone)]
pub struct ClientTranslator {
    context: Arc<LocaleContext>,
    coalescer: Arc<RequestCoalescer>,
}

impl ClientTranslator {
    pub fn new(context: Arc<LocaleContext>, coalescer: Arc<RequestCoalescer>) -> Self {
        Self { context, coalescer }
    }

    pub fn context(&self) -> &LocaleContext {
        &self.context
    }

    /// Locale-change notifications, used to trigger re-rendering.
    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.context.subscribe()
    }

    pub async fn shutdown(&self) {
        self.coalescer.shutdown().await;
    }
}

/// One displayed string.
///
/// Shows the source text until the first translation arrives, and keeps
/// showing the previous locale's text while a new one is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedText {
    source: String,
    display: String,
    locale: Option<Locale>,
}

impl LocalizedText {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            display: source.clone(),
            source,
            locale: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Text to render right now.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Locale the displayed text belongs to, once resolved.
    pub fn locale(&self) -> Option<Locale> {
        self.locale
    }

    /// Bring the displayed text up to date with the active locale.
    ///
    /// A result that arrives after the locale changed again is dropped.
    pub async fn refresh(&mut self, translator: &ClientTranslator) -> &str {
        let locale = translator.context().active();
        if self.locale == Some(locale) {
            return &self.display;
        }

        let translated = translator.coalescer.request(&self.source, locale).await;
        if translator.context().active() == locale {
            self.display = translated;
            self.locale = Some(locale);
        }
        &self.display
    }
}
