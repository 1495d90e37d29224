//! # Warden - Attribute-Based Access Control
//!
//! `warden` decides whether an [`Inquiry`] (who wants to do what to which
//! resource, in which context) is allowed by a set of stored [`Policy`]
//! documents.
//!
//! - **Fail-closed**: no matching policy, a missing context attribute or any
//!   error while deciding means deny
//! - **Deny wins**: one matching deny policy outweighs any number of allows
//! - **Pluggable matching**: exact strings, fuzzy strings, `<...>` tagged
//!   regexes or [`Rule`] trees
//! - **Decision caching**: LRU memoization keyed by the canonical inquiry
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use warden::{Effect, Guard, Inquiry, MemoryStorage, Policy, RegexChecker, Rule, Storage};
//!
//! # fn main() -> warden::Result<()> {
//! let storage = Arc::new(MemoryStorage::new());
//! storage.add(
//!     Policy::new(1)
//!         .with_description("Max and Jim may read and post to any book")
//!         .with_subjects(["<[Mm]ax>", "<Jim>"])
//!         .with_actions(["get", "post"])
//!         .with_resources(["library:books:<.+>"])
//!         .with_context("ip", Rule::equal("127.0.0.1"))
//!         .with_effect(Effect::Allow),
//! )?;
//!
//! let guard = Guard::new(storage, RegexChecker::new());
//!
//! let inquiry = Inquiry::new("Max", "get", "library:books:dracula")
//!     .with_context("ip", "127.0.0.1");
//! assert!(guard.is_allowed(&inquiry));
//!
//! // No ip in context: denied
//! assert!(!guard.is_allowed(&Inquiry::new("Max", "get", "library:books:dracula")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use warden::{GuardBuilder, GuardConfig};
//!
//! # fn main() -> warden::Result<()> {
//! let config = GuardConfig::from_toml(r#"
//!     checker = "rules"
//!
//!     [cache]
//!     capacity = 512
//! "#)?;
//!
//! let guard = GuardBuilder::new().config(config).build_cached()?;
//! assert_eq!(guard.cache().info().capacity, 512);
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    cache, checker, config, error, guard, inquiry, pattern, policy, rules, storage,
};

pub use crate::core::{
    cache::{AllowanceCache, AllowanceCacheBackend, CacheInfo, CachedGuard, LruCacheBackend},
    checker::{
        similarity, Checker, CheckerKind, RegexChecker, RulesChecker, StringExactChecker,
        StringFuzzyChecker,
    },
    config::{CacheConfig, GuardBuilder, GuardConfig, DEFAULT_CACHE_CAPACITY},
    error::{GuardError, Result},
    guard::Guard,
    inquiry::Inquiry,
    pattern::{clear_pattern_cache, pattern_cache_len, PatternMatcher},
    policy::{Effect, Field, FieldItem, Policy},
    rules::Rule,
    storage::{retrieve_all, IndexedStorage, MemoryStorage, PolicyIter, RetrieveAll, Storage},
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
