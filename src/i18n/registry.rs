//! Locale registry: Single source of truth for all supported locales.
//!
//! Every other component asks the registry whether a code is valid, which
//! locale is the source language and which way text flows. Adding a locale
//! means adding one entry to `default_locales()`.

use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Layout flow of text for a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left-to-right
    Ltr,
    /// Right-to-left
    Rtl,
}

impl Direction {
    /// Value of the document-level `dir` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a supported locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// ISO 639-1 code (e.g., "fr", "he")
    pub code: &'static str,

    /// English name (e.g., "French", "Hebrew")
    pub name: &'static str,

    /// Native name (e.g., "Français", "עברית")
    pub native_name: &'static str,

    /// Text direction used for layout
    pub direction: Direction,

    /// Whether this is the source language UI strings are authored in
    /// (exactly one entry must be true)
    pub is_canonical: bool,

    /// Whether this locale may be used as a translation target
    pub enabled: bool,
}

/// Global locale registry.
///
/// Immutable after first access.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global locale registry instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
        })
    }

    /// Get a locale configuration by its code, enabled or not.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|locale| locale.code == code)
    }

    /// Get all enabled locales in registry order.
    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|locale| locale.enabled).collect()
    }

    /// Codes of all enabled locales in registry order.
    ///
    /// This is the list reported back to callers that send an unknown code.
    pub fn supported_codes(&self) -> Vec<&'static str> {
        self.locales
            .iter()
            .filter(|locale| locale.enabled)
            .map(|locale| locale.code)
            .collect()
    }

    /// Get the canonical (source) locale configuration.
    ///
    /// # Panics
    /// Panics if the table does not contain exactly one canonical locale.
    pub fn canonical(&self) -> &LocaleConfig {
        let canonical: Vec<_> = self
            .locales
            .iter()
            .filter(|locale| locale.is_canonical)
            .collect();

        match canonical.len() {
            0 => panic!("No canonical locale found in registry"),
            1 => canonical[0],
            _ => panic!("Multiple canonical locales found in registry"),
        }
    }

    /// Check if a locale code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|locale| locale.enabled)
            .unwrap_or(false)
    }
}

/// Default locale table.
///
/// UI strings are authored in French; Hebrew and Arabic are the RTL locales.
fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            direction: Direction::Ltr,
            is_canonical: true,
            enabled: true,
        },
        LocaleConfig {
            code: "en",
            name: "English",
            native_name: "English",
            direction: Direction::Ltr,
            is_canonical: false,
            enabled: true,
        },
        LocaleConfig {
            code: "he",
            name: "Hebrew",
            native_name: "עברית",
            direction: Direction::Rtl,
            is_canonical: false,
            enabled: true,
        },
        LocaleConfig {
            code: "ru",
            name: "Russian",
            native_name: "Русский",
            direction: Direction::Ltr,
            is_canonical: false,
            enabled: true,
        },
        LocaleConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            direction: Direction::Ltr,
            is_canonical: false,
            enabled: true,
        },
        LocaleConfig {
            code: "ar",
            name: "Arabic",
            native_name: "العربية",
            direction: Direction::Rtl,
            is_canonical: false,
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LocaleRegistry::get();
        let registry2 = LocaleRegistry::get();
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_french() {
        let config = LocaleRegistry::get().get_by_code("fr").unwrap();
        assert_eq!(config.name, "French");
        assert_eq!(config.native_name, "Français");
        assert_eq!(config.direction, Direction::Ltr);
        assert!(config.is_canonical);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        assert!(LocaleRegistry::get().get_by_code("xx").is_none());
    }

    #[test]
    fn test_get_by_code_is_case_sensitive() {
        assert!(LocaleRegistry::get().get_by_code("FR").is_none());
    }

    #[test]
    fn test_supported_codes_in_registry_order() {
        assert_eq!(
            LocaleRegistry::get().supported_codes(),
            vec!["fr", "en", "he", "ru", "es", "ar"]
        );
    }

    #[test]
    fn test_exactly_one_direction_per_locale() {
        for locale in LocaleRegistry::get().list_enabled() {
            let expected = match locale.code {
                "he" | "ar" => Direction::Rtl,
                _ => Direction::Ltr,
            };
            assert_eq!(locale.direction, expected, "{}", locale.code);
        }
    }

    #[test]
    fn test_canonical_is_french() {
        assert_eq!(LocaleRegistry::get().canonical().code, "fr");
    }

    #[test]
    fn test_is_enabled() {
        let registry = LocaleRegistry::get();
        assert!(registry.is_enabled("he"));
        assert!(registry.is_enabled("ar"));
        assert!(!registry.is_enabled("de"));
        assert!(!registry.is_enabled(""));
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Rtl).unwrap(), "\"rtl\"");
        assert_eq!(Direction::Ltr.to_string(), "ltr");
    }
}
