//! Checkers: how policy field items are matched against inquiry values
//!
//! A policy field fits an inquiry value when the field's item list is non-empty
//! and at least one item matches. What "matches" means is up to the checker:
//! - [`StringExactChecker`] - string equality
//! - [`StringFuzzyChecker`] - normalized edit-distance similarity
//! - [`RegexChecker`] - literals plus `<...>` tagged regex patterns
//! - [`RulesChecker`] - rules and attribute/rule mappings
//!
//! The guard treats every checker the same way. Storage adapters may look at
//! [`Checker::kind`] to narrow their candidate query.

mod regex;
mod rules;
mod string;

pub use self::regex::RegexChecker;
pub use self::rules::RulesChecker;
pub use self::string::{similarity, StringExactChecker, StringFuzzyChecker};

use crate::error::Result;
use crate::inquiry::Inquiry;
use crate::policy::{Field, FieldItem, Policy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Matching semantics a checker implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckerKind {
    StringExact,
    StringFuzzy,
    Regex,
    Rules,
    /// Anything outside the built-in set
    Custom,
}

impl fmt::Display for CheckerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckerKind::StringExact => "string_exact",
            CheckerKind::StringFuzzy => "string_fuzzy",
            CheckerKind::Regex => "regex",
            CheckerKind::Rules => "rules",
            CheckerKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Strategy deciding whether a policy field fits an inquiry value
pub trait Checker: Send + Sync {
    /// Does `policy`'s `field` fit `what`?
    ///
    /// `what` is normally `inquiry.value(field)`; the whole inquiry is passed for
    /// rules that compare against other parts of it.
    fn fits(&self, policy: &Policy, field: Field, what: &Value, inquiry: &Inquiry)
        -> Result<bool>;

    /// Which built-in semantics this checker implements
    fn kind(&self) -> CheckerKind {
        CheckerKind::Custom
    }
}

impl<C: Checker + ?Sized> Checker for Box<C> {
    fn fits(
        &self,
        policy: &Policy,
        field: Field,
        what: &Value,
        inquiry: &Inquiry,
    ) -> Result<bool> {
        (**self).fits(policy, field, what, inquiry)
    }

    fn kind(&self) -> CheckerKind {
        (**self).kind()
    }
}

/// True when any item satisfies `matches`; an empty list never fits
pub(crate) fn any_item<F>(items: &[FieldItem], mut matches: F) -> Result<bool>
where
    F: FnMut(&FieldItem) -> Result<bool>,
{
    for item in items {
        if matches(item)? {
            return Ok(true);
        }
    }
    Ok(false)
}
