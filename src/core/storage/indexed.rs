//! In-memory policy storage with per-checker candidate narrowing.
//!
//! Keeps an index of literal strings per field and a shape summary per policy,
//! and translates each built-in checker kind into a lookup over them:
//! - `StringExact` - index hits for subject, action and resource, intersected
//! - `Regex` / `StringFuzzy` - policies with a string item in every field
//! - `Rules` - policies with a rule or mapping item in every field
//!
//! Custom checkers cannot be translated and are rejected.

use super::memory::feed;
use super::{check_limit_and_offset, PolicyIter, Storage};
use crate::checker::{Checker, CheckerKind};
use crate::error::{GuardError, Result};
use crate::inquiry::Inquiry;
use crate::policy::{Field, Policy};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Which item kinds a policy carries in each field
#[derive(Debug, Clone, Copy, Default)]
struct Shape {
    has_text: [bool; 3],
    has_rules: [bool; 3],
}

impl Shape {
    fn of(policy: &Policy) -> Self {
        let mut shape = Shape::default();
        for (i, field) in Field::ALL.into_iter().enumerate() {
            let items = policy.field(field);
            shape.has_text[i] = items.iter().any(|item| item.as_text().is_some());
            shape.has_rules[i] = items.iter().any(|item| item.is_rule_based());
        }
        shape
    }
}

#[derive(Debug)]
struct Entry {
    policy: Arc<Policy>,
    shape: Shape,
}

#[derive(Debug, Default)]
struct Catalog {
    entries: BTreeMap<String, Entry>,
    /// field -> item text -> uids, one map per entry of `Field::ALL`
    exact: [HashMap<String, BTreeSet<String>>; 3],
}

impl Catalog {
    fn insert(&mut self, policy: Policy) {
        let uid = policy.uid.clone();
        for (i, field) in Field::ALL.into_iter().enumerate() {
            for text in policy.field(field).iter().filter_map(|item| item.as_text()) {
                self.exact[i]
                    .entry(text.to_string())
                    .or_default()
                    .insert(uid.clone());
            }
        }
        let shape = Shape::of(&policy);
        self.entries.insert(
            uid,
            Entry {
                policy: Arc::new(policy),
                shape,
            },
        );
    }

    fn remove(&mut self, uid: &str) -> Option<Entry> {
        let entry = self.entries.remove(uid)?;
        for (i, field) in Field::ALL.into_iter().enumerate() {
            for text in entry.policy.field(field).iter().filter_map(|item| item.as_text()) {
                if let Some(uids) = self.exact[i].get_mut(text) {
                    uids.remove(uid);
                    if uids.is_empty() {
                        self.exact[i].remove(text);
                    }
                }
            }
        }
        Some(entry)
    }

    fn exact_candidates(&self, inquiry: &Inquiry) -> Vec<Arc<Policy>> {
        let mut matched: Option<BTreeSet<String>> = None;
        for (i, field) in Field::ALL.into_iter().enumerate() {
            let Some(what) = inquiry.value(field).as_str() else {
                return Vec::new();
            };
            let Some(uids) = self.exact[i].get(what) else {
                return Vec::new();
            };
            matched = Some(match matched {
                Some(previous) => previous.intersection(uids).cloned().collect(),
                None => uids.clone(),
            });
        }

        matched
            .unwrap_or_default()
            .iter()
            .filter_map(|uid| self.entries.get(uid))
            .map(|entry| Arc::clone(&entry.policy))
            .collect()
    }

    fn shaped_candidates<F>(&self, keep: F) -> Vec<Arc<Policy>>
    where
        F: Fn(&Shape) -> bool,
    {
        self.entries
            .values()
            .filter(|entry| keep(&entry.shape))
            .map(|entry| Arc::clone(&entry.policy))
            .collect()
    }
}

/// In-memory storage that narrows candidates according to the checker kind
#[derive(Debug, Default)]
pub struct IndexedStorage {
    catalog: RwLock<Catalog>,
}

impl IndexedStorage {
    pub fn new() -> Self {
        IndexedStorage::default()
    }

    /// Number of stored policies
    pub fn len(&self) -> usize {
        self.catalog.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.read().entries.is_empty()
    }
}

impl Storage for IndexedStorage {
    fn add(&self, policy: Policy) -> Result<()> {
        let mut catalog = self.catalog.write();
        if catalog.entries.contains_key(&policy.uid) {
            error!(
                "Error trying to create already existing policy with UID={}",
                policy.uid
            );
            return Err(GuardError::PolicyExists(policy.uid));
        }

        info!("Added policy with UID={}", policy.uid);
        catalog.insert(policy);
        Ok(())
    }

    fn get(&self, uid: &str) -> Result<Option<Policy>> {
        Ok(self
            .catalog
            .read()
            .entries
            .get(uid)
            .map(|entry| Policy::clone(&entry.policy)))
    }

    fn get_all(&self, limit: i64, offset: i64) -> Result<PolicyIter<'_>> {
        let (limit, offset) = check_limit_and_offset(limit, offset)?;
        let page: Vec<Arc<Policy>> = self
            .catalog
            .read()
            .entries
            .values()
            .skip(offset)
            .take(limit)
            .map(|entry| Arc::clone(&entry.policy))
            .collect();
        Ok(feed(page))
    }

    fn find_for_inquiry(
        &self,
        inquiry: &Inquiry,
        checker: &dyn Checker,
    ) -> Result<PolicyIter<'_>> {
        let kind = checker.kind();
        let catalog = self.catalog.read();
        let candidates = match kind {
            CheckerKind::StringExact => catalog.exact_candidates(inquiry),
            CheckerKind::Regex | CheckerKind::StringFuzzy => {
                catalog.shaped_candidates(|shape| shape.has_text.iter().all(|&t| t))
            }
            CheckerKind::Rules => {
                catalog.shaped_candidates(|shape| shape.has_rules.iter().all(|&r| r))
            }
            CheckerKind::Custom => {
                return Err(GuardError::UnrecognizedChecker(kind.to_string()));
            }
        };
        drop(catalog);

        debug!(
            "Narrowed candidates to {} policies for {} checker",
            candidates.len(),
            kind
        );
        Ok(feed(candidates))
    }

    fn update(&self, policy: Policy) -> Result<()> {
        let mut catalog = self.catalog.write();
        if catalog.remove(&policy.uid).is_none() {
            debug!("Skipping update of unknown policy UID={}", policy.uid);
            return Ok(());
        }

        info!("Updated policy with UID={}", policy.uid);
        catalog.insert(policy);
        Ok(())
    }

    fn delete(&self, uid: &str) -> Result<()> {
        if self.catalog.write().remove(uid).is_some() {
            info!("Deleted policy with UID={}", uid);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{RegexChecker, RulesChecker, StringExactChecker, StringFuzzyChecker};
    use crate::policy::FieldItem;
    use crate::rules::Rule;
    use serde_json::Value;

    struct Opaque;

    impl Checker for Opaque {
        fn fits(&self, _: &Policy, _: Field, _: &Value, _: &Inquiry) -> Result<bool> {
            Ok(true)
        }
    }

    fn uids(storage: &IndexedStorage, inquiry: &Inquiry, checker: &dyn Checker) -> Vec<String> {
        storage
            .find_for_inquiry(inquiry, checker)
            .unwrap()
            .map(|p| p.unwrap().uid)
            .collect()
    }

    fn populated() -> IndexedStorage {
        let storage = IndexedStorage::new();
        let books = ["books", "comics", "magazines"];
        storage
            .add(Policy::new("1").with_subjects(["max", "bob"]).with_actions(["get"]).with_resources(books))
            .unwrap();
        storage
            .add(Policy::new("2").with_subjects(["maxim"]).with_actions(["get"]).with_resources(books))
            .unwrap();
        storage.add(Policy::new("3").with_subjects(["sam", "nina"])).unwrap();
        storage
            .add(
                Policy::new("4")
                    .with_subjects([FieldItem::fields([("name", Rule::equal("Max"))])])
                    .with_actions([Rule::eq("get")])
                    .with_resources([Rule::any([])]),
            )
            .unwrap();
        storage
            .add(
                Policy::new("5")
                    .with_subjects(["<[Mm]ax>"])
                    .with_actions(["<.*>"])
                    .with_resources(["<.*>"]),
            )
            .unwrap();
        storage
    }

    #[test]
    fn test_exact_lookup() {
        let storage = populated();
        let inquiry = Inquiry::new("max", "get", "books");
        assert_eq!(uids(&storage, &inquiry, &StringExactChecker::new()), ["1"]);

        let inquiry = Inquiry::new("nobody", "get", "books");
        assert!(uids(&storage, &inquiry, &StringExactChecker::new()).is_empty());
    }

    #[test]
    fn test_text_shaped_lookup() {
        let storage = populated();
        let inquiry = Inquiry::new("max", "get", "books");
        assert_eq!(uids(&storage, &inquiry, &RegexChecker::new()), ["1", "2", "5"]);
        assert_eq!(uids(&storage, &inquiry, &StringFuzzyChecker::new()), ["1", "2", "5"]);
    }

    #[test]
    fn test_rules_shaped_lookup() {
        let storage = populated();
        let inquiry = Inquiry::new(serde_json::json!({"name": "Max"}), "get", "books");
        assert_eq!(uids(&storage, &inquiry, &RulesChecker::new()), ["4"]);
    }

    #[test]
    fn test_custom_checker_is_rejected() {
        let storage = populated();
        let err = storage
            .find_for_inquiry(&Inquiry::default(), &Opaque)
            .err()
            .unwrap();
        assert!(matches!(err, GuardError::UnrecognizedChecker(name) if name == "custom"));
    }

    #[test]
    fn test_index_follows_updates_and_deletes() {
        let storage = populated();
        let inquiry = Inquiry::new("max", "get", "books");

        let moved = Policy::new("1")
            .with_subjects(["bob"])
            .with_actions(["get"])
            .with_resources(["books"]);
        storage.update(moved).unwrap();
        assert!(uids(&storage, &inquiry, &StringExactChecker::new()).is_empty());

        let bob = Inquiry::new("bob", "get", "books");
        assert_eq!(uids(&storage, &bob, &StringExactChecker::new()), ["1"]);

        storage.delete("1").unwrap();
        assert!(uids(&storage, &bob, &StringExactChecker::new()).is_empty());
        assert!(storage.catalog.read().exact[0].get("bob").is_none());
    }

    #[test]
    fn test_contract_basics() {
        let storage = populated();
        assert_eq!(storage.len(), 5);
        assert!(matches!(
            storage.add(Policy::new("3")),
            Err(GuardError::PolicyExists(_))
        ));
        assert_eq!(storage.get_all(2, 1).unwrap().count(), 2);
        assert!(storage.get_all(-1, 0).is_err());
        storage.update(Policy::new("ghost")).unwrap();
        assert!(storage.get("ghost").unwrap().is_none());
    }
}
