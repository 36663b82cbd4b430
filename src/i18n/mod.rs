//! Locale support for the translation layer.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for supported locales and their direction
//! - `locale`: Validated `Locale` handle plus the registry contract functions
//! - `validator`: Token-preservation checks on provider output
//! - `metrics`: Cache and provider counters
//!
//! # Example
//!
//! ```rust
//! use site_translator::i18n::{default_locale, is_valid_locale, Direction, Locale};
//!
//! assert_eq!(default_locale().code(), "fr");
//! assert!(is_valid_locale("he"));
//! assert_eq!(Locale::from_code("he").unwrap().direction(), Direction::Rtl);
//! ```

mod locale;
mod metrics;
mod registry;
mod validator;

pub use locale::{default_locale, direction, is_valid_locale, Locale};
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{Direction, LocaleConfig, LocaleRegistry};
pub use validator::{TranslationValidator, ValidationReport};
