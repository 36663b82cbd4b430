//! Locale type: validated handle onto a registry entry.

use crate::error::TranslateError;
use crate::i18n::{Direction, LocaleConfig, LocaleRegistry};
use serde::{Serialize, Serializer};
use std::fmt;

/// A validated locale.
///
/// Only codes that are present and enabled in the registry can be turned
/// into a `Locale`, so every value downstream is a valid translation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locale {
    code: &'static str,
}

impl Locale {
    /// Create a Locale from a code string.
    ///
    /// Matching is exact: "FR" or " fr" are rejected.
    ///
    /// # Errors
    /// `TranslateError::InvalidLocale` listing the supported codes.
    pub fn from_code(code: &str) -> Result<Locale, TranslateError> {
        match LocaleRegistry::get().get_by_code(code) {
            Some(config) if config.enabled => Ok(Locale { code: config.code }),
            _ => Err(TranslateError::invalid_locale(code)),
        }
    }

    /// The source locale UI strings are authored in.
    pub fn default_locale() -> Locale {
        Locale {
            code: LocaleRegistry::get().canonical().code,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Full configuration from the registry.
    ///
    /// # Panics
    /// Never for a Locale built through `from_code` or `default_locale`.
    pub fn config(&self) -> &'static LocaleConfig {
        LocaleRegistry::get()
            .get_by_code(self.code)
            .expect("Locale code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn direction(&self) -> Direction {
        self.config().direction
    }

    /// `true` if this is the source language and needs no translation.
    pub fn is_default(&self) -> bool {
        self.config().is_canonical
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::default_locale()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

/// Check whether `code` names a supported, enabled locale.
pub fn is_valid_locale(code: &str) -> bool {
    LocaleRegistry::get().is_enabled(code)
}

/// Text direction of a locale.
pub fn direction(locale: Locale) -> Direction {
    locale.direction()
}

/// The source locale.
pub fn default_locale() -> Locale {
    Locale::default_locale()
}
