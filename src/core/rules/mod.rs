//! Rules: predicates evaluated against a single value
//!
//! Rules appear in policy context maps and, under the rules checker, inside
//! subjects/actions/resources. Families:
//! - Operators (`Eq`, `NotEq`, `Greater`, `Less`, `GreaterOrEqual`, `LessOrEqual`)
//! - Logic (`Any`, `All`, `Neither`, `Not`), nestable to any depth
//! - Strings (`Equal`, `StartsWith`, `EndsWith`, `Contains`, `RegexMatch`, `PairsEqual`)
//! - Lists (`In`, `NotIn`, `AllIn`, `AllNotIn`, `AnyIn`, `AnyNotIn`)
//! - Inquiry-relative (`SubjectEqual`, `ActionEqual`, `ResourceIn`)
//!
//! Serialized rules carry a `type` tag so every rule round-trips by kind.

mod value;

pub use value::{compare, kind_name, loose_eq};

use crate::error::Result;
use crate::inquiry::Inquiry;
use crate::pattern::PatternMatcher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A predicate over one value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Rule {
    /// Value equals the literal
    Eq { val: Value },
    /// Value differs from the literal
    NotEq { val: Value },
    /// Value is greater than the literal
    Greater { val: Value },
    /// Value is less than the literal
    Less { val: Value },
    /// Value is greater than or equal to the literal
    GreaterOrEqual { val: Value },
    /// Value is less than or equal to the literal
    LessOrEqual { val: Value },

    /// At least one embedded rule holds, or there are none
    Any { rules: Vec<Rule> },
    /// Every embedded rule holds
    All { rules: Vec<Rule> },
    /// No embedded rule holds
    Neither { rules: Vec<Rule> },
    /// The embedded rule does not hold
    Not { rule: Box<Rule> },

    /// Value is a string equal to `val`
    Equal {
        val: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Value is a string starting with `val`
    StartsWith {
        val: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Value is a string ending with `val`
    EndsWith {
        val: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Value is a string containing `val`
    Contains {
        val: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Value is a string matching the regex from its start
    RegexMatch { pattern: String },
    /// Value is a list of two-string lists whose members are equal
    PairsEqual,

    /// Value is one of `items`
    In { items: Vec<Value> },
    /// Value is none of `items`
    NotIn { items: Vec<Value> },
    /// Value is a list whose every element is one of `items`
    AllIn { items: Vec<Value> },
    /// Value is a list with no element among `items`
    AllNotIn { items: Vec<Value> },
    /// Value is a list with some element among `items`
    AnyIn { items: Vec<Value> },
    /// Value is a list with some element outside `items`
    AnyNotIn { items: Vec<Value> },

    /// Value equals the inquiry's subject
    SubjectEqual,
    /// Value equals the inquiry's action
    ActionEqual,
    /// Value is contained in the inquiry's resource (or equals it)
    ResourceIn,
}

impl Rule {
    pub fn eq(val: impl Into<Value>) -> Self {
        Rule::Eq { val: val.into() }
    }

    pub fn not_eq(val: impl Into<Value>) -> Self {
        Rule::NotEq { val: val.into() }
    }

    pub fn greater(val: impl Into<Value>) -> Self {
        Rule::Greater { val: val.into() }
    }

    pub fn less(val: impl Into<Value>) -> Self {
        Rule::Less { val: val.into() }
    }

    pub fn greater_or_equal(val: impl Into<Value>) -> Self {
        Rule::GreaterOrEqual { val: val.into() }
    }

    pub fn less_or_equal(val: impl Into<Value>) -> Self {
        Rule::LessOrEqual { val: val.into() }
    }

    pub fn any(rules: impl IntoIterator<Item = Rule>) -> Self {
        Rule::Any {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn all(rules: impl IntoIterator<Item = Rule>) -> Self {
        Rule::All {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn neither(rules: impl IntoIterator<Item = Rule>) -> Self {
        Rule::Neither {
            rules: rules.into_iter().collect(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(rule: Rule) -> Self {
        Rule::Not {
            rule: Box::new(rule),
        }
    }

    /// Case-sensitive string equality
    pub fn equal(val: impl Into<String>) -> Self {
        Rule::Equal {
            val: val.into(),
            case_insensitive: false,
        }
    }

    /// Case-insensitive string equality
    pub fn equal_ci(val: impl Into<String>) -> Self {
        Rule::Equal {
            val: val.into(),
            case_insensitive: true,
        }
    }

    pub fn starts_with(val: impl Into<String>) -> Self {
        Rule::StartsWith {
            val: val.into(),
            case_insensitive: false,
        }
    }

    pub fn ends_with(val: impl Into<String>) -> Self {
        Rule::EndsWith {
            val: val.into(),
            case_insensitive: false,
        }
    }

    pub fn contains(val: impl Into<String>) -> Self {
        Rule::Contains {
            val: val.into(),
            case_insensitive: false,
        }
    }

    pub fn regex_match(pattern: impl Into<String>) -> Self {
        Rule::RegexMatch {
            pattern: pattern.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Rule::In {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Rule::NotIn {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Check whether `what` satisfies this rule
    ///
    /// Equality-style rules never fail: a value of the wrong kind simply does not
    /// satisfy them. Ordering rules fail with [`GuardError::Incomparable`] when the
    /// value cannot be ordered against the literal.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden::{Inquiry, Rule};
    /// use serde_json::json;
    ///
    /// let inquiry = Inquiry::default();
    /// assert!(Rule::greater(18).satisfied(&json!(21), &inquiry).unwrap());
    /// assert!(!Rule::eq("admin").satisfied(&json!(42), &inquiry).unwrap());
    /// assert!(Rule::greater(18).satisfied(&json!("21"), &inquiry).is_err());
    /// ```
    ///
    /// [`GuardError::Incomparable`]: crate::GuardError::Incomparable
    pub fn satisfied(&self, what: &Value, inquiry: &Inquiry) -> Result<bool> {
        let satisfied = match self {
            Rule::Eq { val } => loose_eq(val, what),
            Rule::NotEq { val } => !loose_eq(val, what),
            Rule::Greater { val } => compare(">", what, val)? == Ordering::Greater,
            Rule::Less { val } => compare("<", what, val)? == Ordering::Less,
            Rule::GreaterOrEqual { val } => compare(">=", what, val)? != Ordering::Less,
            Rule::LessOrEqual { val } => compare("<=", what, val)? != Ordering::Greater,

            Rule::Any { rules } => {
                if rules.is_empty() {
                    return Ok(true);
                }
                for rule in rules {
                    if rule.satisfied(what, inquiry)? {
                        return Ok(true);
                    }
                }
                false
            }
            Rule::All { rules } => {
                for rule in rules {
                    if !rule.satisfied(what, inquiry)? {
                        return Ok(false);
                    }
                }
                true
            }
            Rule::Neither { rules } => {
                for rule in rules {
                    if rule.satisfied(what, inquiry)? {
                        return Ok(false);
                    }
                }
                true
            }
            Rule::Not { rule } => !rule.satisfied(what, inquiry)?,

            Rule::Equal {
                val,
                case_insensitive,
            } => string_test(what, val, *case_insensitive, |s, v| s == v),
            Rule::StartsWith {
                val,
                case_insensitive,
            } => string_test(what, val, *case_insensitive, |s, v| s.starts_with(v)),
            Rule::EndsWith {
                val,
                case_insensitive,
            } => string_test(what, val, *case_insensitive, |s, v| s.ends_with(v)),
            Rule::Contains {
                val,
                case_insensitive,
            } => string_test(what, val, *case_insensitive, |s, v| s.contains(v)),
            Rule::RegexMatch { pattern } => match what.as_str() {
                Some(s) => PatternMatcher::compile(&format!("^(?:{})", pattern))?.is_match(s),
                None => false,
            },
            Rule::PairsEqual => pairs_equal(what),

            Rule::In { items } => contains(items, what),
            Rule::NotIn { items } => !contains(items, what),
            Rule::AllIn { items } => {
                elements(what).map_or(false, |mut e| e.all(|x| contains(items, x)))
            }
            Rule::AllNotIn { items } => {
                elements(what).map_or(false, |mut e| e.all(|x| !contains(items, x)))
            }
            Rule::AnyIn { items } => {
                elements(what).map_or(false, |mut e| e.any(|x| contains(items, x)))
            }
            Rule::AnyNotIn { items } => {
                elements(what).map_or(false, |mut e| e.any(|x| !contains(items, x)))
            }

            Rule::SubjectEqual => loose_eq(what, &inquiry.subject),
            Rule::ActionEqual => loose_eq(what, &inquiry.action),
            Rule::ResourceIn => match &inquiry.resource {
                Value::Array(resources) => contains(resources, what),
                Value::String(resource) => what.as_str().map_or(false, |s| resource.contains(s)),
                other => loose_eq(what, other),
            },
        };
        Ok(satisfied)
    }

    /// Verify that every regex embedded in this rule compiles
    pub fn validate(&self) -> Result<()> {
        match self {
            Rule::RegexMatch { pattern } => {
                PatternMatcher::compile(&format!("^(?:{})", pattern))?;
            }
            Rule::Any { rules } | Rule::All { rules } | Rule::Neither { rules } => {
                for rule in rules {
                    rule.validate()?;
                }
            }
            Rule::Not { rule } => rule.validate()?,
            _ => {}
        }
        Ok(())
    }
}

fn string_test<F>(what: &Value, val: &str, case_insensitive: bool, test: F) -> bool
where
    F: Fn(&str, &str) -> bool,
{
    let Some(s) = what.as_str() else {
        return false;
    };
    if case_insensitive {
        test(&s.to_lowercase(), &val.to_lowercase())
    } else {
        test(s, val)
    }
}

fn pairs_equal(what: &Value) -> bool {
    let Some(pairs) = what.as_array() else {
        return false;
    };
    pairs.iter().all(|pair| match pair.as_array().map(Vec::as_slice) {
        Some([Value::String(a), Value::String(b)]) => a == b,
        _ => false,
    })
}

fn contains(items: &[Value], what: &Value) -> bool {
    items.iter().any(|item| loose_eq(item, what))
}

fn elements(what: &Value) -> Option<std::slice::Iter<'_, Value>> {
    what.as_array().map(|items| items.iter())
}
