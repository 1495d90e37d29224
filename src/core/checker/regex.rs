//! Regex checker: literal items plus `<...>` tagged patterns

use super::{any_item, Checker, CheckerKind};
use crate::error::Result;
use crate::inquiry::Inquiry;
use crate::pattern::PatternMatcher;
use crate::policy::{Field, FieldItem, Policy};
use serde_json::Value;

/// Matches literal items exactly and tagged items as anchored regexes
///
/// Compiled regexes come from the process-wide pattern cache, so a pattern is
/// compiled once no matter how many checkers or guards use it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexChecker;

impl RegexChecker {
    pub fn new() -> Self {
        RegexChecker
    }
}

impl Checker for RegexChecker {
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
        any_item(policy.field(field), |item| match item {
            FieldItem::Literal(text) => Ok(text == what),
            FieldItem::Pattern(text) => PatternMatcher::matches(text, what),
            FieldItem::Rule(_) | FieldItem::Fields(_) => Ok(false),
        })
    }

    fn kind(&self) -> CheckerKind {
        CheckerKind::Regex
    }
}
