//! String checkers: exact and fuzzy comparison of string items

use super::{any_item, Checker, CheckerKind};
use crate::error::Result;
use crate::inquiry::Inquiry;
use crate::policy::{Field, Policy};
use serde_json::Value;

/// Matches when a string item equals the inquiry value exactly
///
/// Tagged pattern items are compared by their raw text; rule items never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringExactChecker;

impl StringExactChecker {
    pub fn new() -> Self {
        StringExactChecker
    }
}

impl Checker for StringExactChecker {
    fn fits(
        &self,
        policy: &Policy,
        field: Field,
        what: &Value,
        _inquiry: &Inquiry,
    ) -> Result<bool> {
        let Some(what) = what.as_str() else {
            return Ok(false);
        };
        any_item(policy.field(field), |item| Ok(item.as_text() == Some(what)))
    }

    fn kind(&self) -> CheckerKind {
        CheckerKind::StringExact
    }
}

/// Matches when a string item is similar enough to the inquiry value
///
/// Similarity is `1 - levenshtein(a, b) / max(len(a), len(b))` over characters,
/// so identical strings score 1.0 and entirely different ones 0.0.
#[derive(Debug, Clone, Copy)]
pub struct StringFuzzyChecker {
    threshold: f64,
}

impl StringFuzzyChecker {
    /// Default minimum similarity
    pub const DEFAULT_THRESHOLD: f64 = 0.7;

    pub fn new() -> Self {
        Self::with_threshold(Self::DEFAULT_THRESHOLD)
    }

    /// Use a custom minimum similarity, clamped to `0.0..=1.0`
    pub fn with_threshold(threshold: f64) -> Self {
        StringFuzzyChecker {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for StringFuzzyChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for StringFuzzyChecker {
    fn fits(
        &self,
        policy: &Policy,
        field: Field,
        what: &Value,
        _inquiry: &Inquiry,
    ) -> Result<bool> {
        let Some(what) = what.as_str() else {
            return Ok(false);
        };
        any_item(policy.field(field), |item| {
            Ok(item
                .as_text()
                .map_or(false, |text| similarity(text, what) >= self.threshold))
        })
    }

    fn kind(&self) -> CheckerKind {
        CheckerKind::StringFuzzy
    }
}

/// Normalized Levenshtein similarity in `0.0..=1.0`
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    // Single row of the edit-distance matrix
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = usize::from(ca != cb);
            row[j + 1] = (above + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }

    row[b.len()]
}
