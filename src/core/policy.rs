//! Policy document structure
//!
//! A policy grants or denies access to the subjects, actions and resources it
//! describes, optionally restricted by context rules. Each field item is
//! classified once when the policy is built or parsed:
//! - plain strings are literals
//! - strings with a `<...>` group are tagged regex patterns
//! - tagged objects are rules
//! - other objects map attribute names to rules

use crate::error::{GuardError, Result};
use crate::pattern::PatternMatcher;
use crate::rules::Rule;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Effect of a policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Allow the inquiry
    Allow,
    /// Deny the inquiry (takes precedence over Allow)
    #[default]
    Deny,
}

/// The matchable fields of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Subjects,
    Actions,
    Resources,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Subjects, Field::Actions, Field::Resources];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Subjects => "subjects",
            Field::Actions => "actions",
            Field::Resources => "resources",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item of a subjects/actions/resources list
#[derive(Debug, Clone, PartialEq)]
pub enum FieldItem {
    /// Plain string
    Literal(String),
    /// String containing at least one `<...>` regex group
    Pattern(String),
    /// A single rule applied to the inquiry value
    Rule(Rule),
    /// Rules applied to attributes of a structured inquiry value
    Fields(BTreeMap<String, Rule>),
}

impl FieldItem {
    /// Classify a policy string as literal or tagged pattern
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if PatternMatcher::is_tagged(&text) {
            FieldItem::Pattern(text)
        } else {
            FieldItem::Literal(text)
        }
    }

    /// Build a structured item from attribute/rule pairs
    pub fn fields<K: Into<String>>(rules: impl IntoIterator<Item = (K, Rule)>) -> Self {
        FieldItem::Fields(rules.into_iter().map(|(k, r)| (k.into(), r)).collect())
    }

    /// Original text of string items
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldItem::Literal(text) | FieldItem::Pattern(text) => Some(text),
            _ => None,
        }
    }

    /// Is this item a rule or attribute/rule mapping?
    pub fn is_rule_based(&self) -> bool {
        matches!(self, FieldItem::Rule(_) | FieldItem::Fields(_))
    }

    fn validate(&self) -> Result<()> {
        match self {
            FieldItem::Literal(_) => Ok(()),
            FieldItem::Pattern(text) => {
                PatternMatcher::compile(&PatternMatcher::translate(text)).map(|_| ())
            }
            FieldItem::Rule(rule) => rule.validate(),
            FieldItem::Fields(rules) => rules.values().try_for_each(Rule::validate),
        }
    }
}

impl From<&str> for FieldItem {
    fn from(text: &str) -> Self {
        FieldItem::from_text(text)
    }
}

impl From<String> for FieldItem {
    fn from(text: String) -> Self {
        FieldItem::from_text(text)
    }
}

impl From<Rule> for FieldItem {
    fn from(rule: Rule) -> Self {
        FieldItem::Rule(rule)
    }
}

impl From<BTreeMap<String, Rule>> for FieldItem {
    fn from(rules: BTreeMap<String, Rule>) -> Self {
        FieldItem::Fields(rules)
    }
}

impl Serialize for FieldItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldItem::Literal(text) | FieldItem::Pattern(text) => serializer.serialize_str(text),
            FieldItem::Rule(rule) => rule.serialize(serializer),
            FieldItem::Fields(rules) => rules.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let tagged = value.get("type").map_or(false, Value::is_string);
        match value {
            Value::String(text) => Ok(FieldItem::from_text(text)),
            Value::Object(_) if tagged => serde_json::from_value(value)
                .map(FieldItem::Rule)
                .map_err(de::Error::custom),
            Value::Object(_) => serde_json::from_value(value)
                .map(FieldItem::Fields)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "policy field item must be a string, rule or object, got {}",
                crate::rules::kind_name(&other)
            ))),
        }
    }
}

/// A policy: who may (or may not) do what to which resource, and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique identifier, always kept as a string
    #[serde(deserialize_with = "uid_from_any")]
    pub uid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub subjects: Vec<FieldItem>,

    #[serde(default)]
    pub actions: Vec<FieldItem>,

    #[serde(default)]
    pub resources: Vec<FieldItem>,

    #[serde(default)]
    pub effect: Effect,

    /// Rules that inquiry context attributes must satisfy
    #[serde(default)]
    pub context: BTreeMap<String, Rule>,
}

impl Policy {
    /// Create an empty deny policy
    ///
    /// # Examples
    ///
    /// ```
    /// use warden::{Effect, Policy, Rule};
    ///
    /// let policy = Policy::new(1)
    ///     .with_subjects(["<[Mm]ax>", "<Jim>"])
    ///     .with_actions(["get", "post"])
    ///     .with_resources(["<.*>"])
    ///     .with_context("ip", Rule::equal("127.0.0.1"))
    ///     .with_effect(Effect::Allow);
    ///
    /// assert_eq!(policy.uid, "1");
    /// assert!(policy.allow_access());
    /// ```
    pub fn new(uid: impl ToString) -> Self {
        Policy {
            uid: uid.to_string(),
            description: None,
            subjects: Vec::new(),
            actions: Vec::new(),
            resources: Vec::new(),
            effect: Effect::Deny,
            context: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_subjects<T: Into<FieldItem>>(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.subjects = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_actions<T: Into<FieldItem>>(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.actions = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resources<T: Into<FieldItem>>(
        mut self,
        items: impl IntoIterator<Item = T>,
    ) -> Self {
        self.resources = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, rule: Rule) -> Self {
        self.context.insert(key.into(), rule);
        self
    }

    /// Items of one matchable field
    pub fn field(&self, field: Field) -> &[FieldItem] {
        match field {
            Field::Subjects => &self.subjects,
            Field::Actions => &self.actions,
            Field::Resources => &self.resources,
        }
    }

    /// Does this policy grant access when it applies?
    pub fn allow_access(&self) -> bool {
        self.effect == Effect::Allow
    }

    /// Parse policy from JSON string
    ///
    /// Rule trees of any depth are accepted.
    pub fn from_json(json: &str) -> Result<Self> {
        parse_unbounded(json)
    }

    /// Serialize policy to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validate policy structure
    ///
    /// The uid must not be empty and every regex the policy carries must compile.
    pub fn validate(&self) -> Result<()> {
        if self.uid.is_empty() {
            return Err(GuardError::InvalidPolicy("uid must not be empty".to_string()));
        }

        for field in Field::ALL {
            for item in self.field(field) {
                item.validate()?;
            }
        }
        for rule in self.context.values() {
            rule.validate()?;
        }

        Ok(())
    }
}

/// Parse JSON without serde_json's nesting limit, growing the stack on demand
pub(crate) fn parse_unbounded<T: DeserializeOwned>(json: &str) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

fn uid_from_any<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(uid) => Ok(uid),
        Value::Number(uid) => Ok(uid.to_string()),
        other => Err(de::Error::custom(format!(
            "policy uid must be a string or number, got {}",
            crate::rules::kind_name(&other)
        ))),
    }
}
