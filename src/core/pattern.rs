//! Tagged regex patterns for policy fields
//!
//! A tagged pattern mixes literal text with regex groups wrapped in `<` and `>`:
//! - `<[Mm]ax>` - the whole value is a regex
//! - `library:books:<.+>` - literal prefix, regex suffix
//!
//! Text outside the tags is matched literally and the whole pattern is anchored
//! at both ends. Compiled regexes live in a process-wide cache keyed by their
//! source text. The cache is never evicted on its own, so it grows with the
//! number of distinct patterns a process has seen; long running processes that
//! load policies from many sources can reset it with [`clear_pattern_cache`].

use crate::error::{GuardError, Result};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Opens a regex group inside a policy string
pub const START_TAG: char = '<';
/// Closes a regex group inside a policy string
pub const END_TAG: char = '>';

lazy_static! {
    static ref COMPILED: RwLock<HashMap<String, Arc<Regex>>> = RwLock::new(HashMap::new());
}

/// Tagged pattern helpers
pub struct PatternMatcher;

impl PatternMatcher {
    /// Does this policy string contain at least one complete `<...>` group?
    ///
    /// # Examples
    /// ```
    /// use warden::PatternMatcher;
    ///
    /// assert!(PatternMatcher::is_tagged("<[Mm]ax>"));
    /// assert!(PatternMatcher::is_tagged("library:books:<.+>"));
    /// assert!(!PatternMatcher::is_tagged("<[mM]ax"));
    /// assert!(!PatternMatcher::is_tagged("max"));
    /// ```
    pub fn is_tagged(text: &str) -> bool {
        match text.find(START_TAG) {
            Some(start) => text[start + 1..].contains(END_TAG),
            None => false,
        }
    }

    /// Translate a tagged pattern into an anchored regex source
    ///
    /// Literal segments are escaped, tagged segments are kept verbatim inside a
    /// non-capturing group. An unterminated `<` is treated as literal text.
    pub fn translate(text: &str) -> String {
        let mut source = String::with_capacity(text.len() + 8);
        source.push('^');

        let mut rest = text;
        while let Some(start) = rest.find(START_TAG) {
            let Some(len) = rest[start + 1..].find(END_TAG) else {
                break;
            };
            source.push_str(&regex::escape(&rest[..start]));
            source.push_str("(?:");
            source.push_str(&rest[start + 1..start + 1 + len]);
            source.push(')');
            rest = &rest[start + 1 + len + 1..];
        }
        source.push_str(&regex::escape(rest));

        source.push('$');
        source
    }

    /// Match a value against a tagged pattern
    ///
    /// # Examples
    /// ```
    /// use warden::PatternMatcher;
    ///
    /// assert!(PatternMatcher::matches("<[Mm]ax>", "Max").unwrap());
    /// assert!(PatternMatcher::matches("library:books:<.+>", "library:books:dracula").unwrap());
    /// assert!(!PatternMatcher::matches("<[Mm]ax>", "Maxim").unwrap());
    /// ```
    pub fn matches(text: &str, value: &str) -> Result<bool> {
        let regex = Self::compile(&Self::translate(text))?;
        Ok(regex.is_match(value))
    }

    /// Compile a regex source, reusing the cached copy when present
    pub fn compile(source: &str) -> Result<Arc<Regex>> {
        if let Some(regex) = COMPILED.read().get(source) {
            return Ok(Arc::clone(regex));
        }

        let regex = Regex::new(source).map_err(|e| GuardError::InvalidPattern {
            pattern: source.to_string(),
            source: e,
        })?;

        let mut cache = COMPILED.write();
        let entry = cache
            .entry(source.to_string())
            .or_insert_with(|| Arc::new(regex));
        Ok(Arc::clone(entry))
    }
}

/// Drop every compiled pattern from the process-wide cache
pub fn clear_pattern_cache() {
    COMPILED.write().clear();
}

/// Number of compiled patterns currently cached
pub fn pattern_cache_len() -> usize {
    COMPILED.read().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_whole_regex() {
        assert_eq!(PatternMatcher::translate("<[Mm]ax>"), "^(?:[Mm]ax)$");
    }

    #[test]
    fn test_translate_escapes_literal_segments() {
        assert_eq!(
            PatternMatcher::translate("library.books:<.+>"),
            r"^library\.books:(?:.+)$"
        );
        assert_eq!(PatternMatcher::translate("a<b>c<d>e"), "^a(?:b)c(?:d)e$");
    }

    #[test]
    fn test_translate_unterminated_tag_is_literal() {
        assert_eq!(PatternMatcher::translate("<[mM]ax"), r"^<\[mM\]ax$");
    }

    #[test]
    fn test_full_anchoring() {
        assert!(PatternMatcher::matches("<[Mm]ax>", "max").unwrap());
        assert!(!PatternMatcher::matches("<[Mm]ax>", "maxim").unwrap());
        assert!(!PatternMatcher::matches("<[Mm]ax>", "a max").unwrap());
        assert!(!PatternMatcher::matches("<a|b>", "ab").unwrap());
        assert!(PatternMatcher::matches("<a|b>", "b").unwrap());
    }

    #[test]
    fn test_character_classes() {
        assert!(PatternMatcher::matches(r"<\d+>", "12").unwrap());
        assert!(PatternMatcher::matches(r"<\w{1,3}>", "Pie").unwrap());
        assert!(PatternMatcher::matches(r"<\w{2}-\d+>", "Jo-1").unwrap());
        assert!(!PatternMatcher::matches(r"<\w{1,3}>", "Pies").unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternMatcher::matches("<[unclosed>", "x").unwrap_err();
        assert!(matches!(err, GuardError::InvalidPattern { .. }));
    }

    #[test]
    fn test_compiled_patterns_are_shared() {
        let first = PatternMatcher::compile("^(?:shared-cache-probe)$").unwrap();
        let second = PatternMatcher::compile("^(?:shared-cache-probe)$").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(pattern_cache_len() >= 1);
    }
}
