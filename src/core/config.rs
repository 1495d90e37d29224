//! Guard configuration and builder
//!
//! Configuration can be written in TOML:
//!
//! ```toml
//! checker = "string_fuzzy"
//! fuzzy_threshold = 0.8
//!
//! [cache]
//! capacity = 4096
//! ```

use crate::cache::CachedGuard;
use crate::checker::{
    Checker, CheckerKind, RegexChecker, RulesChecker, StringExactChecker, StringFuzzyChecker,
};
use crate::error::{GuardError, Result};
use crate::guard::Guard;
use crate::storage::{MemoryStorage, Storage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Cache capacity used when none is configured
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Settings of a guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// Built-in checker to match with
    pub checker: CheckerKind,
    /// Similarity threshold for the fuzzy checker, within 0..=1
    pub fuzzy_threshold: f64,
    /// Decision cache; no caching when absent
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        GuardConfig {
            checker: CheckerKind::Regex,
            fuzzy_threshold: StringFuzzyChecker::DEFAULT_THRESHOLD,
            cache: None,
        }
    }
}

impl GuardConfig {
    /// Parse and validate configuration from TOML
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: GuardConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(GuardError::InvalidConfig(format!(
                "fuzzy_threshold must be within 0..=1, got {}",
                self.fuzzy_threshold
            )));
        }
        if self.checker == CheckerKind::Custom {
            return Err(GuardError::InvalidConfig(
                "custom checkers cannot be built from configuration".to_string(),
            ));
        }
        Ok(())
    }

    /// Instantiate the configured checker
    pub fn build_checker(&self) -> Result<Box<dyn Checker>> {
        self.validate()?;
        let checker: Box<dyn Checker> = match self.checker {
            CheckerKind::StringExact => Box::new(StringExactChecker::new()),
            CheckerKind::StringFuzzy => {
                Box::new(StringFuzzyChecker::with_threshold(self.fuzzy_threshold))
            }
            CheckerKind::Regex => Box::new(RegexChecker::new()),
            CheckerKind::Rules => Box::new(RulesChecker::new()),
            CheckerKind::Custom => {
                return Err(GuardError::UnrecognizedChecker(self.checker.to_string()))
            }
        };
        Ok(checker)
    }
}

/// Builder wiring storage, checker and cache into a guard
///
/// # Examples
///
/// ```
/// use warden::{GuardBuilder, GuardConfig, Inquiry};
///
/// # fn main() -> warden::Result<()> {
/// let config = GuardConfig::from_toml("checker = \"string_exact\"\n[cache]\ncapacity = 16")?;
/// let guard = GuardBuilder::new().config(config).build_cached()?;
///
/// // No policies stored yet
/// assert!(!guard.is_allowed(&Inquiry::new("max", "get", "books")));
/// assert_eq!(guard.cache().info().capacity, 16);
/// # Ok(())
/// # }
/// ```
pub struct GuardBuilder {
    storage: Option<Arc<dyn Storage>>,
    checker: Option<Box<dyn Checker>>,
    config: GuardConfig,
}

impl GuardBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        GuardBuilder {
            storage: None,
            checker: None,
            config: GuardConfig::default(),
        }
    }

    /// Use this storage (defaults to an empty [`MemoryStorage`])
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this checker instead of the configured one
    pub fn checker<C: Checker + 'static>(mut self, checker: C) -> Self {
        self.checker = Some(Box::new(checker));
        self
    }

    /// Enable the decision cache with given capacity
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache = Some(CacheConfig { capacity });
        self
    }

    /// Build an uncached guard
    pub fn build(self) -> Result<Guard> {
        let checker = match self.checker {
            Some(checker) => checker,
            None => self.config.build_checker()?,
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        info!("Building guard with {} checker", checker.kind());
        Ok(Guard::from_parts(storage, checker))
    }

    /// Build a guard with a decision cache
    ///
    /// Uses the configured capacity, or [`DEFAULT_CACHE_CAPACITY`].
    pub fn build_cached(self) -> Result<CachedGuard> {
        let capacity = self.config.cache.unwrap_or_default().capacity;
        let guard = self.build()?;
        debug!("Decision cache enabled with capacity {}", capacity);
        Ok(CachedGuard::new(guard, capacity))
    }
}

impl Default for GuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}
