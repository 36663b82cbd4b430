use crate::i18n::LocaleRegistry;
use thiserror::Error;

/// Errors produced by the translation layer.
///
/// Only `InvalidLocale` and `EmptyInput` ever reach a caller. Provider
/// failures are absorbed by the resolver, which falls back to source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("Unsupported locale '{code}', expected one of: {}", .supported.join(", "))]
    InvalidLocale {
        code: String,
        supported: Vec<String>,
    },

    #[error("No text supplied for translation")]
    EmptyInput,

    #[error("Translation provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl TranslateError {
    /// Build an `InvalidLocale` error listing every enabled locale code.
    pub fn invalid_locale(code: impl Into<String>) -> Self {
        TranslateError::InvalidLocale {
            code: code.into(),
            supported: LocaleRegistry::get()
                .supported_codes()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Whether the error was caused by the caller rather than a transient failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            TranslateError::InvalidLocale { .. } | TranslateError::EmptyInput
        )
    }
}
