//! Inquiry: the action a caller wants to perform
//!
//! Inquiries are compared, hashed and cached through a single canonical form:
//! JSON with every object key sorted, regardless of how the inquiry was built.

use crate::error::Result;
use crate::policy::{parse_unbounded, Field};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh3::xxh3_64;

/// Description of an attempted action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Inquiry {
    /// What is being accessed
    pub resource: Value,
    /// What is being done
    pub action: Value,
    /// Who is doing it
    pub subject: Value,
    /// Extra attributes checked by policy context rules
    pub context: BTreeMap<String, Value>,
}

impl Inquiry {
    /// Create an inquiry; each part may be a plain string or a JSON mapping
    ///
    /// # Examples
    ///
    /// ```
    /// use warden::Inquiry;
    /// use serde_json::json;
    ///
    /// let plain = Inquiry::new("alice", "read", "books");
    /// let structured = Inquiry::new(json!({"name": "alice", "stars": 90}), "read", "books")
    ///     .with_context("ip", "127.0.0.1");
    ///
    /// assert_eq!(plain.subject, json!("alice"));
    /// assert_eq!(structured.context["ip"], json!("127.0.0.1"));
    /// ```
    pub fn new(
        subject: impl Into<Value>,
        action: impl Into<Value>,
        resource: impl Into<Value>,
    ) -> Self {
        Inquiry {
            resource: blank_if_null(resource.into()),
            action: blank_if_null(action.into()),
            subject: blank_if_null(subject.into()),
            context: BTreeMap::new(),
        }
    }

    /// Add one context attribute
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Value of one of the matchable fields
    pub fn value(&self, field: Field) -> &Value {
        match field {
            Field::Subjects => &self.subject,
            Field::Actions => &self.action,
            Field::Resources => &self.resource,
        }
    }

    /// Parse an inquiry from JSON; missing parts default to empty
    pub fn from_json(json: &str) -> Result<Self> {
        let mut inquiry: Inquiry = parse_unbounded(json)?;
        inquiry.resource = blank_if_null(inquiry.resource);
        inquiry.action = blank_if_null(inquiry.action);
        inquiry.subject = blank_if_null(inquiry.subject);
        Ok(inquiry)
    }

    /// Canonical JSON representation with all keys sorted
    ///
    /// Used for equality, hashing and cache keys, so two inquiries built in a
    /// different order (or in different processes) agree on it.
    pub fn to_json_sorted(&self) -> String {
        let context = self
            .context
            .iter()
            .map(|(key, value)| (key.clone(), sorted(value)))
            .collect::<Map<String, Value>>();

        // Keys inserted alphabetically so the output is sorted even when
        // serde_json is built with insertion-ordered maps.
        let mut root = Map::new();
        root.insert("action".to_string(), sorted(&self.action));
        root.insert("context".to_string(), Value::Object(context));
        root.insert("resource".to_string(), sorted(&self.resource));
        root.insert("subject".to_string(), sorted(&self.subject));
        Value::Object(root).to_string()
    }

    /// Stable 64-bit hash of the canonical form
    pub fn fingerprint(&self) -> u64 {
        xxh3_64(self.to_json_sorted().as_bytes())
    }
}

impl Default for Inquiry {
    fn default() -> Self {
        Inquiry::new("", "", "")
    }
}

/// Equality compares canonical forms, which serializes both sides.
///
/// For repeated lookups keep [`Inquiry::to_json_sorted`] or
/// [`Inquiry::fingerprint`] as the key instead of the inquiry itself.
impl PartialEq for Inquiry {
    fn eq(&self, other: &Self) -> bool {
        self.to_json_sorted() == other.to_json_sorted()
    }
}

impl Eq for Inquiry {}

/// Hashes the [`Inquiry::fingerprint`], computed afresh on every call.
impl Hash for Inquiry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint());
    }
}

impl fmt::Display for Inquiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_sorted())
    }
}

fn blank_if_null(value: Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        other => other,
    }
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sorted(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
