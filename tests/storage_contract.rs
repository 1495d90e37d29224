//! Storage contract tests, run against every in-memory adapter

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use warden::{
    retrieve_all, Effect, FieldItem, Guard, GuardError, IndexedStorage, Inquiry, MemoryStorage,
    Policy, Rule, Storage, StringExactChecker,
};

fn adapters() -> Vec<(&'static str, Box<dyn Storage>)> {
    vec![
        ("memory", Box::new(MemoryStorage::new())),
        ("indexed", Box::new(IndexedStorage::new())),
    ]
}

fn filled(storage: &dyn Storage, count: usize) {
    for i in 0..count {
        storage
            .add(
                Policy::new(format!("{:03}", i))
                    .with_subjects([format!("user{}", i)])
                    .with_actions(["read"])
                    .with_resources(["<.*>"]),
            )
            .unwrap();
    }
}

#[test]
fn test_get_all_counts() {
    // (limit, offset, expected) over 10 stored policies
    let cases = [
        (0, 0, 0),
        (1, 0, 1),
        (3, 0, 3),
        (10, 0, 10),
        (11, 0, 10),
        (500, 0, 10),
        (5, 3, 5),
        (5, 8, 2),
        (10, 9, 1),
        (10, 10, 0),
        (10, 20, 0),
        (1, 9, 1),
    ];

    for (name, storage) in adapters() {
        filled(storage.as_ref(), 10);
        for (limit, offset, expected) in cases {
            let count = storage.get_all(limit, offset).unwrap().count();
            assert_eq!(
                count, expected,
                "{}: get_all({}, {})",
                name, limit, offset
            );
        }
    }
}

#[test]
fn test_get_all_order_is_stable_and_pages_do_not_overlap() {
    for (name, storage) in adapters() {
        filled(storage.as_ref(), 10);
        let page = |limit, offset| -> Vec<String> {
            storage
                .get_all(limit, offset)
                .unwrap()
                .map(|p| p.unwrap().uid)
                .collect()
        };

        let whole = page(10, 0);
        let mut joined = page(4, 0);
        joined.extend(page(4, 4));
        joined.extend(page(4, 8));
        assert_eq!(whole, joined, "{}", name);
    }
}

#[test]
fn test_get_all_rejects_negative_arguments() {
    for (name, storage) in adapters() {
        filled(storage.as_ref(), 3);
        for (limit, offset) in [(-1, 0), (0, -1), (-5, -5), (i64::MIN, 0)] {
            let result = storage.get_all(limit, offset);
            assert!(
                matches!(result, Err(GuardError::InvalidPagination(_))),
                "{}: get_all({}, {})",
                name,
                limit,
                offset
            );
        }
    }
}

#[test]
fn test_missing_uids_are_noops() {
    for (name, storage) in adapters() {
        filled(storage.as_ref(), 2);

        storage.delete("ghost").unwrap();
        storage
            .update(Policy::new("ghost").with_effect(Effect::Allow))
            .unwrap();
        // Not even a policy with a broken pattern is looked at
        storage
            .update(Policy::new("ghost").with_subjects(["<(>"]))
            .unwrap();
        assert!(storage.get("ghost").unwrap().is_none(), "{}", name);
        assert_eq!(storage.get_all(100, 0).unwrap().count(), 2, "{}", name);
    }
}

#[test]
fn test_duplicate_add_is_rejected() {
    for (name, storage) in adapters() {
        storage.add(Policy::new("1").with_description("first")).unwrap();
        let err = storage
            .add(Policy::new("1").with_description("second"))
            .unwrap_err();
        assert!(matches!(err, GuardError::PolicyExists(_)), "{}", name);
        assert_eq!(
            storage.get("1").unwrap().unwrap().description.as_deref(),
            Some("first")
        );
    }
}

#[test]
fn test_pattern_text_is_stored_for_any_checker() {
    let policy = Policy::new("literal")
        .with_subjects(["<(>"])
        .with_actions(["get"])
        .with_resources(["x"])
        .with_effect(Effect::Allow);

    let memory = Arc::new(MemoryStorage::new());
    let indexed = Arc::new(IndexedStorage::new());
    memory.add(policy.clone()).unwrap();
    indexed.add(policy.clone()).unwrap();

    // The exact checker reads "<(>" as plain text
    let inquiry = Inquiry::new("<(>", "get", "x");
    let storages: [Arc<dyn Storage>; 2] = [memory, indexed];
    for storage in storages {
        let guard = Guard::new(storage.clone(), StringExactChecker::new());
        assert!(guard.is_allowed(&inquiry));

        storage
            .update(policy.clone().with_effect(Effect::Deny))
            .unwrap();
        assert!(!guard.is_allowed(&inquiry));
    }
}

#[test]
fn test_retrieve_all() {
    for (name, storage) in adapters() {
        filled(storage.as_ref(), 25);
        for batch in [0, 1, 4, 25, 26, 1000, usize::MAX] {
            let uids: Vec<String> = retrieve_all(storage.as_ref(), batch)
                .map(|p| p.unwrap().uid)
                .collect();
            assert_eq!(uids.len(), 25, "{} batch {}", name, batch);
            assert_eq!(uids.first().map(String::as_str), Some("000"));
            assert_eq!(uids.last().map(String::as_str), Some("024"));
        }
    }
}

fn every_rule_kind() -> Vec<Rule> {
    vec![
        Rule::eq("x"),
        Rule::not_eq(json!({"a": [1, 2]})),
        Rule::greater(1.5),
        Rule::less(10),
        Rule::greater_or_equal("a"),
        Rule::less_or_equal(json!([1, 2])),
        Rule::any([Rule::eq(1), Rule::eq(2)]),
        Rule::all([Rule::greater(0), Rule::less(100)]),
        Rule::neither([Rule::eq("root")]),
        Rule::not(Rule::not(Rule::eq(true))),
        Rule::equal("Max"),
        Rule::equal_ci("max"),
        Rule::starts_with("library:"),
        Rule::EndsWith {
            val: ".pdf".to_string(),
            case_insensitive: true,
        },
        Rule::contains("book"),
        Rule::regex_match(r"\d{3}-\d{4}"),
        Rule::PairsEqual,
        Rule::is_in([1, 2, 3]),
        Rule::not_in(["saturday", "sunday"]),
        Rule::AllIn {
            items: vec![json!("a"), json!("b")],
        },
        Rule::AllNotIn {
            items: vec![json!(null)],
        },
        Rule::AnyIn {
            items: vec![json!(1), json!("1")],
        },
        Rule::AnyNotIn { items: vec![] },
        Rule::SubjectEqual,
        Rule::ActionEqual,
        Rule::ResourceIn,
    ]
}

#[test]
fn test_policy_with_every_rule_kind_round_trips() {
    let rules = every_rule_kind();
    let context: BTreeMap<String, Rule> = rules
        .iter()
        .enumerate()
        .map(|(i, rule)| (format!("key{}", i), rule.clone()))
        .collect();

    let mut policy = Policy::new("everything")
        .with_description("Every rule kind")
        .with_subjects(rules.iter().cloned().map(FieldItem::from))
        .with_actions(["get", "<p(ut|ost)>"])
        .with_resources([FieldItem::fields(
            rules
                .iter()
                .enumerate()
                .map(|(i, rule)| (format!("attr{}", i), rule.clone())),
        )])
        .with_effect(Effect::Allow);
    policy.context = context;

    let restored = Policy::from_json(&policy.to_json().unwrap()).unwrap();
    assert_eq!(restored.uid, policy.uid);
    assert_eq!(restored.subjects, policy.subjects);
    assert_eq!(restored.actions, policy.actions);
    assert_eq!(restored.resources, policy.resources);
    assert_eq!(restored.context, policy.context);
    assert_eq!(restored, policy);

    // Stored and fetched back through each adapter as well
    for (name, storage) in adapters() {
        storage.add(policy.clone()).unwrap();
        assert_eq!(storage.get("everything").unwrap().as_ref(), Some(&policy), "{}", name);
    }
}

fn nest(depth: usize, wrap: fn(Rule) -> Rule) -> Rule {
    (0..depth).fold(Rule::eq("deep"), |rule, _| wrap(rule))
}

#[test]
fn test_deeply_nested_rules_round_trip() {
    let inquiry = Inquiry::new("max", "get", "x").with_context("level", "deep");
    let any: fn(Rule) -> Rule = |rule| Rule::any([rule]);
    let all: fn(Rule) -> Rule = |rule| Rule::all([rule]);

    for (kind, wrap) in [("any", any), ("all", all)] {
        let rule = nest(100, wrap);
        assert!(rule.satisfied(&json!("deep"), &inquiry).unwrap(), "{}", kind);

        let policy = Policy::new(kind)
            .with_subjects([rule.clone()])
            .with_context("level", rule);
        let restored = Policy::from_json(&policy.to_json().unwrap()).unwrap();
        assert_eq!(restored, policy, "{}", kind);
        assert!(
            restored.context["level"]
                .satisfied(&json!("deep"), &inquiry)
                .unwrap(),
            "{}",
            kind
        );
    }
}
