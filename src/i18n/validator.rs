//! Translation quality validation module.
//!
//! UI strings often carry tokens that must survive translation untouched:
//! `{placeholders}`, URLs and inline markup tags. The validator compares the
//! source string with what the provider returned and reports differences.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make the translation unusable
    pub errors: Vec<String>,

    /// Suspicious differences that are logged but accepted
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for translated UI strings.
pub struct TranslationValidator;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate that a translation preserves the tokens of its source.
    ///
    /// Token order is ignored since word order legitimately changes between
    /// languages. An empty translation of a non-empty source is an error.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        if !original.trim().is_empty() && translated.trim().is_empty() {
            report
                .errors
                .push("Translation is empty for a non-empty source".to_string());
            return report;
        }

        let orig_placeholders = Self::extract_placeholders(original);
        let trans_placeholders = Self::extract_placeholders(translated);
        if orig_placeholders != trans_placeholders {
            report.warnings.push(format!(
                "Placeholder mismatch: original has {:?}, translation has {:?}",
                orig_placeholders, trans_placeholders
            ));
        }

        let orig_urls = Self::extract_urls(original);
        let trans_urls = Self::extract_urls(translated);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        let orig_tags = Self::extract_tags(original);
        let trans_tags = Self::extract_tags(translated);
        if orig_tags != trans_tags {
            report.warnings.push(format!(
                "Markup tag mismatch: original has {:?}, translation has {:?}",
                orig_tags, trans_tags
            ));
        }

        report
    }

    /// Extract `{name}` placeholders, sorted
    fn extract_placeholders(text: &str) -> Vec<String> {
        let regex = PLACEHOLDER_REGEX
            .get_or_init(|| Regex::new(r"\{\{?\s*[A-Za-z0-9_.]+\s*\}?\}").unwrap());
        Self::sorted_matches(regex, text)
    }

    /// Extract http(s) URLs, sorted
    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s)\]<>]+").unwrap());
        Self::sorted_matches(regex, text)
    }

    /// Extract opening and closing markup tags, sorted
    fn extract_tags(text: &str) -> Vec<String> {
        let regex = TAG_REGEX.get_or_init(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*\s*/?>").unwrap());
        Self::sorted_matches(regex, text)
    }

    fn sorted_matches(regex: &Regex, text: &str) -> Vec<String> {
        let mut found: Vec<String> = regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        found.sort();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Extraction Tests ====================

    #[test]
    fn test_extract_placeholders() {
        let text = "Bonjour {name}, vous économisez {{ amount }} par an";
        let found = TranslationValidator::extract_placeholders(text);
        assert_eq!(found, vec!["{name}", "{{ amount }}"]);
    }

    #[test]
    fn test_extract_placeholders_none() {
        assert!(TranslationValidator::extract_placeholders("Simulez vos économies").is_empty());
    }

    #[test]
    fn test_extract_urls() {
        let text = "Voir https://example.com et http://test.org";
        let urls = TranslationValidator::extract_urls(text);
        assert_eq!(urls, vec!["http://test.org", "https://example.com"]);
    }

    #[test]
    fn test_extract_tags() {
        let text = "Économisez <strong>jusqu'à 70%</strong><br/>";
        let tags = TranslationValidator::extract_tags(text);
        assert_eq!(tags, vec!["</strong>", "<br/>", "<strong>"]);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_validate_clean_translation() {
        let original = "Bonjour {name}, voir <b>https://example.com</b>";
        let translated = "Hello {name}, see <b>https://example.com</b>";
        assert!(TranslationValidator::validate(original, translated).is_clean());
    }

    #[test]
    fn test_validate_reordered_placeholders_is_clean() {
        let original = "{count} panneaux pour {name}";
        let translated = "עבור {name}: {count} פאנלים";
        assert!(TranslationValidator::validate(original, translated).is_clean());
    }

    #[test]
    fn test_validate_missing_placeholder() {
        let report = TranslationValidator::validate("Bonjour {name}", "Hello");
        assert!(report.has_warnings());
        assert!(!report.has_errors());
        assert!(report.warnings[0].contains("Placeholder mismatch"));
    }

    #[test]
    fn test_validate_missing_url() {
        let report = TranslationValidator::validate("Voir https://example.com", "See here");
        assert!(report.warnings[0].contains("URL mismatch"));
    }

    #[test]
    fn test_validate_missing_tag() {
        let report = TranslationValidator::validate("<em>Gratuit</em>", "Free");
        assert!(report.warnings[0].contains("Markup tag mismatch"));
    }

    #[test]
    fn test_validate_empty_translation_is_error() {
        let report = TranslationValidator::validate("Bonjour", "   ");
        assert!(report.has_errors());
    }

    #[test]
    fn test_validate_empty_source_and_translation() {
        assert!(TranslationValidator::validate("", "").is_clean());
    }

    #[test]
    fn test_validation_report_flags() {
        let mut report = ValidationReport::new();
        assert!(report.is_clean());
        report.warnings.push("w".to_string());
        assert!(report.has_warnings());
        assert!(!report.has_errors());
        assert!(!report.is_clean());
    }
}
