//! Client-side locale context.
//!
//! Holds the active locale for one client session. The first access reads
//! the persisted preference and applies `lang`/`dir` to the document before
//! returning, so nothing is rendered with the wrong direction. Later changes
//! go through `change_locale`, which persists, updates the document and then
//! notifies subscribers so they re-request their strings.

use crate::error::TranslateError;
use crate::i18n::{Direction, Locale};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Where the user's locale choice survives between sessions.
pub trait PreferenceStore: Send + Sync {
    /// The stored locale code, if any. Not validated.
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, code: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPreference {
    locale: String,
}

/// Preference stored as a small JSON file.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let stored: StoredPreference = serde_json::from_str(&content)
            .with_context(|| format!("Malformed locale preference in {}", self.path.display()))?;
        Ok(Some(stored.locale))
    }

    fn save(&self, code: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string(&StoredPreference {
            locale: code.to_string(),
        })?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Preference kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    value: Mutex<Option<String>>,
}

impl MemoryPreferenceStore {
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            value: Mutex::new(initial.map(String::from)),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(lock(&self.value).clone())
    }

    fn save(&self, code: &str) -> Result<()> {
        *lock(&self.value) = Some(code.to_string());
        Ok(())
    }
}

/// Document-level attributes derived from the active locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentAttributes {
    pub lang: Locale,
    pub dir: Direction,
}

impl DocumentAttributes {
    pub fn for_locale(locale: Locale) -> Self {
        Self {
            lang: locale,
            dir: locale.direction(),
        }
    }
}

/// Receiver of the global `lang`/`dir` attributes.
pub trait Document: Send + Sync {
    fn apply(&self, attributes: DocumentAttributes);
}

/// Document that records the attributes applied to it.
#[derive(Debug, Default)]
pub struct DocumentState {
    current: Mutex<Option<DocumentAttributes>>,
    applied: Mutex<Vec<DocumentAttributes>>,
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<DocumentAttributes> {
        *lock(&self.current)
    }

    /// Every attribute set applied so far, oldest first.
    pub fn history(&self) -> Vec<DocumentAttributes> {
        lock(&self.applied).clone()
    }
}

impl Document for DocumentState {
    fn apply(&self, attributes: DocumentAttributes) {
        *lock(&self.current) = Some(attributes);
        lock(&self.applied).push(attributes);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextState {
    Uninitialized,
    Ready(Locale),
}

/// Active-locale state for one client session.
pub struct LocaleContext {
    preferences: Arc<dyn PreferenceStore>,
    document: Arc<dyn Document>,
    state: Mutex<ContextState>,
    notifier: watch::Sender<Locale>,
}

impl LocaleContext {
    pub fn new(preferences: Arc<dyn PreferenceStore>, document: Arc<dyn Document>) -> Self {
        let (notifier, _) = watch::channel(Locale::default_locale());
        Self {
            preferences,
            document,
            state: Mutex::new(ContextState::Uninitialized),
            notifier,
        }
    }

    /// Leave the uninitialized state. Safe to call more than once.
    ///
    /// A missing, unreadable or unsupported preference yields the default
    /// locale. Document attributes are applied before this returns.
    pub fn initialize(&self) -> Locale {
        let mut state = lock(&self.state);
        if let ContextState::Ready(locale) = *state {
            return locale;
        }

        let locale = match self.preferences.load() {
            Ok(Some(code)) => Locale::from_code(&code).unwrap_or_else(|_| {
                warn!(code = %code, "Ignoring unsupported stored locale");
                Locale::default_locale()
            }),
            Ok(None) => Locale::default_locale(),
            Err(e) => {
                warn!(error = %e, "Failed to read locale preference");
                Locale::default_locale()
            }
        };

        self.document.apply(DocumentAttributes::for_locale(locale));
        *state = ContextState::Ready(locale);
        self.notifier.send_replace(locale);
        debug!(locale = %locale, dir = %locale.direction(), "Locale context ready");
        locale
    }

    pub fn is_ready(&self) -> bool {
        matches!(*lock(&self.state), ContextState::Ready(_))
    }

    /// The active locale, initializing on first access.
    pub fn active(&self) -> Locale {
        let current = *lock(&self.state);
        match current {
            ContextState::Ready(locale) => locale,
            ContextState::Uninitialized => self.initialize(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.active().direction()
    }

    /// Switch the active locale.
    ///
    /// Persists the choice, updates the document and then notifies
    /// subscribers. Choosing the current locale again changes nothing.
    ///
    /// # Errors
    /// `InvalidLocale` if `code` is not supported; the state is untouched.
    pub fn change_locale(&self, code: &str) -> Result<Locale, TranslateError> {
        let next = Locale::from_code(code)?;
        self.initialize();

        // Subscribers see changes in the same order as the state writes
        let previous = {
            let mut state = lock(&self.state);
            let previous = match *state {
                ContextState::Ready(locale) => locale,
                ContextState::Uninitialized => Locale::default_locale(),
            };
            if previous == next {
                return Ok(next);
            }

            if let Err(e) = self.preferences.save(next.code()) {
                warn!(error = %e, locale = %next, "Failed to persist locale preference");
            }
            self.document.apply(DocumentAttributes::for_locale(next));
            *state = ContextState::Ready(next);
            self.notifier.send_replace(next);
            previous
        };

        info!(from = %previous, to = %next, dir = %next.direction(), "Locale changed");
        Ok(next)
    }

    /// Receive every subsequent active-locale change.
    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.notifier.subscribe()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
