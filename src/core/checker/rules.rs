//! Rules checker: rule items and attribute/rule mappings

use super::{any_item, Checker, CheckerKind};
use crate::error::Result;
use crate::inquiry::Inquiry;
use crate::policy::{Field, FieldItem, Policy};
use serde_json::Value;

/// Matches rule items via [`Rule::satisfied`] and mappings attribute by attribute
///
/// A mapping item fits a structured inquiry value when every attribute it names
/// is present in the value and satisfies its rule. String items never fit.
///
/// [`Rule::satisfied`]: crate::Rule::satisfied
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesChecker;

impl RulesChecker {
    pub fn new() -> Self {
        RulesChecker
    }
}

impl Checker for RulesChecker {
    fn fits(&self, policy: &Policy, field: Field, what: &Value, inquiry: &Inquiry) -> Result<bool> {
        any_item(policy.field(field), |item| match item {
            FieldItem::Rule(rule) => rule.satisfied(what, inquiry),
            FieldItem::Fields(rules) => {
                let Some(attributes) = what.as_object() else {
                    return Ok(false);
                };
                for (name, rule) in rules {
                    match attributes.get(name) {
                        Some(value) if rule.satisfied(value, inquiry)? => continue,
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            FieldItem::Literal(_) | FieldItem::Pattern(_) => Ok(false),
        })
    }

    fn kind(&self) -> CheckerKind {
        CheckerKind::Rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use serde_json::json;

    fn fits(policy: &Policy, field: Field, what: Value) -> Result<bool> {
        RulesChecker::new().fits(policy, field, &what, &Inquiry::default())
    }

    #[test]
    fn test_rule_items() {
        let policy = Policy::new("1").with_actions([Rule::eq("get"), Rule::eq("put")]);
        assert!(fits(&policy, Field::Actions, json!("get")).unwrap());
        assert!(fits(&policy, Field::Actions, json!("put")).unwrap());
        assert!(!fits(&policy, Field::Actions, json!("delete")).unwrap());
    }

    #[test]
    fn test_mapping_items() {
        let policy = Policy::new("1").with_subjects([FieldItem::fields([
            ("name", Rule::equal("Max")),
            ("stars", Rule::greater(50)),
        ])]);

        assert!(fits(&policy, Field::Subjects, json!({"name": "Max", "stars": 90})).unwrap());
        assert!(fits(
            &policy,
            Field::Subjects,
            json!({"name": "Max", "stars": 90, "extra": true})
        )
        .unwrap());
        assert!(!fits(&policy, Field::Subjects, json!({"name": "Max", "stars": 10})).unwrap());
        assert!(!fits(&policy, Field::Subjects, json!({"name": "max", "stars": 90})).unwrap());
    }

    #[test]
    fn test_missing_attribute_is_no_match() {
        let policy = Policy::new("1").with_subjects([FieldItem::fields([("stars", Rule::greater(50))])]);
        assert!(!fits(&policy, Field::Subjects, json!({"name": "Max"})).unwrap());
        assert!(!fits(&policy, Field::Subjects, json!("Max")).unwrap());
    }

    #[test]
    fn test_string_items_never_match() {
        let policy = Policy::new("1").with_subjects(["Max", "<.*>"]);
        assert!(!fits(&policy, Field::Subjects, json!("Max")).unwrap());
    }

    #[test]
    fn test_any_rule_fits_everything() {
        let policy = Policy::new("1").with_subjects([Rule::any([])]);
        assert!(fits(&policy, Field::Subjects, json!("anyone")).unwrap());
        assert!(fits(&policy, Field::Subjects, json!({"name": "x"})).unwrap());
    }

    #[test]
    fn test_rule_errors_propagate() {
        let policy = Policy::new("1").with_subjects([FieldItem::fields([("stars", Rule::greater(50))])]);
        assert!(fits(&policy, Field::Subjects, json!({"stars": "many"})).is_err());
    }
}
