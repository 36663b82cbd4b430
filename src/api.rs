//! HTTP routes exposing the resolver.

use crate::error::TranslateError;
use crate::i18n::{Locale, LocaleRegistry, MetricsReport};
use crate::resolver::{TranslationMap, Translator};
use crate::security::is_authorized;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<Translator>,
    /// Bearer token required by the metrics endpoint, if set
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(translator: Arc<Translator>, api_key: Option<String>) -> Self {
        Self {
            translator,
            api_key,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/locales", get(locales))
        .route("/api/translate", post(translate))
        .route("/api/translate/batch", post(translate_batch))
        .route("/api/translate/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Request / response bodies

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: Option<String>,
    pub target_lang: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTranslateRequest {
    pub texts: Option<Vec<String>>,
    pub target_lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchTranslateResponse {
    pub translations: TranslationMap,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleView {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    pub dir: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LocalesResponse {
    pub default: &'static str,
    pub locales: Vec<LocaleView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported: Vec<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            supported: Vec::new(),
        }
    }
}

impl IntoResponse for TranslateError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            TranslateError::InvalidLocale { supported, .. } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    supported,
                    ..ErrorResponse::new("invalid_locale", message)
                },
            ),
            TranslateError::EmptyInput => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("empty_input", message),
            ),
            TranslateError::ProviderUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("provider_unavailable", message),
            ),
        };
        (status, Json(body)).into_response()
    }
}

// Handlers

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache_entries: state.translator.cache().len().await,
    })
}

async fn locales() -> Json<LocalesResponse> {
    let locales = LocaleRegistry::get()
        .list_enabled()
        .into_iter()
        .map(|config| LocaleView {
            code: config.code,
            name: config.name,
            native_name: config.native_name,
            dir: config.direction.as_str(),
        })
        .collect();

    Json(LocalesResponse {
        default: Locale::default_locale().code(),
        locales,
    })
}

async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, TranslateError> {
    let locale = Locale::from_code(request.target_lang.as_deref().unwrap_or_default())?;
    let text = request.text.ok_or(TranslateError::EmptyInput)?;

    let translated = state.translator.translate_one(&text, locale).await;
    Ok(Json(TranslateResponse { translated }))
}

async fn translate_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchTranslateRequest>,
) -> Result<Json<BatchTranslateResponse>, TranslateError> {
    let texts = request.texts.unwrap_or_default();
    let target = request.target_lang.unwrap_or_default();
    debug!(count = texts.len(), target = %target, "Batch translation request");

    let translations = state.translator.translate_many(&texts, &target).await?;
    Ok(Json(BatchTranslateResponse { translations }))
}

async fn metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if !is_authorized(state.api_key.as_deref(), authorization) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("unauthorized", "Missing or invalid API key")),
        )
            .into_response();
    }

    let report: MetricsReport = state.translator.metrics().report();
    Json(report).into_response()
}
