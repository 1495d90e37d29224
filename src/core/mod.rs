//! Decision engine internals
//!
//! - [`rules`] - predicates over JSON values
//! - [`policy`] - policy documents and their field items
//! - [`inquiry`] - access requests and their canonical form
//! - [`pattern`] - `<...>` tagged regex patterns and the compiled pattern cache
//! - [`checker`] - strategies matching policy fields against inquiry values
//! - [`storage`] - the storage contract and in-memory adapters
//! - [`guard`] - deny-wins decisions over storage candidates
//! - [`cache`] - LRU memoization of decisions
//! - [`config`] - configuration and guard builder

pub mod cache;
pub mod checker;
pub mod config;
pub mod error;
pub mod guard;
pub mod inquiry;
pub mod pattern;
pub mod policy;
pub mod rules;
pub mod storage;

pub use cache::{AllowanceCache, AllowanceCacheBackend, CacheInfo, CachedGuard, LruCacheBackend};
pub use checker::{
    Checker, CheckerKind, RegexChecker, RulesChecker, StringExactChecker, StringFuzzyChecker,
};
pub use config::{CacheConfig, GuardBuilder, GuardConfig, DEFAULT_CACHE_CAPACITY};
pub use error::{GuardError, Result};
pub use guard::Guard;
pub use inquiry::Inquiry;
pub use pattern::{clear_pattern_cache, pattern_cache_len, PatternMatcher};
pub use policy::{Effect, Field, FieldItem, Policy};
pub use rules::Rule;
pub use storage::{retrieve_all, IndexedStorage, MemoryStorage, PolicyIter, RetrieveAll, Storage};
