//! Field rules that keep unwanted nations out of the pool
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::NationRecord;

/// Matchers for a single record field
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlacklistRule {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub partial: Vec<String>,
}

impl BlacklistRule {
    /// Case-insensitive: any `partial` substring or any `exact` equality
    pub fn matches(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        self.partial
            .iter()
            .any(|partial| value.contains(&partial.to_lowercase()))
            || self
                .exact
                .iter()
                .any(|exact| exact.to_lowercase() == value)
    }
}

/// Rules keyed by record field name
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Blacklist {
    rules: BTreeMap<String, BlacklistRule>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, field: impl Into<String>, rule: BlacklistRule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Whether any rule matches the record.
///
/// Fields the record does not have are skipped.
pub fn is_blacklisted(record: &NationRecord, blacklist: &Blacklist) -> bool {
    blacklist.rules.iter().any(|(field, rule)| match record.get(field) {
        Some(value) => rule.matches(value),
        None => {
            debug!("{} is not an attribute we can access!", field);
            false
        }
    })
}

/// Keep only the records no rule matches, in their original order
pub fn filter_many(records: Vec<NationRecord>, blacklist: &Blacklist) -> Vec<NationRecord> {
    records
        .into_iter()
        .filter(|record| !is_blacklisted(record, blacklist))
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn rule(exact: &[&str], partial: &[&str]) -> BlacklistRule {
        BlacklistRule {
            exact: exact.iter().map(|s| s.to_string()).collect(),
            partial: partial.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn exact_match_ignores_case() {
        let blacklist = Blacklist::new().with_rule("name", rule(&["potato"], &[]));
        assert!(is_blacklisted(&NationRecord::new("Potato"), &blacklist));
    }

    #[test]
    fn partial_match_ignores_case() {
        let blacklist = Blacklist::new().with_rule("name", rule(&[], &["to"]));
        assert!(is_blacklisted(&NationRecord::new("Potato"), &blacklist));
    }

    #[test]
    fn near_misses_do_not_match() {
        let blacklist = Blacklist::new().with_rule("name", rule(&["tato"], &["tata"]));
        assert!(!is_blacklisted(&NationRecord::new("Potato"), &blacklist));
    }

    #[test]
    fn missing_field_is_not_a_match() {
        let blacklist = Blacklist::new().with_rule("err", rule(&[], &[]));
        assert!(!is_blacklisted(&NationRecord::new("potato"), &blacklist));
    }

    #[test]
    fn any_field_can_match() {
        let blacklist = Blacklist::new()
            .with_rule("err", rule(&["potato"], &[]))
            .with_rule("region", rule(&[], &["field"]));
        let record = NationRecord::new("Potato").with("region", "The Field");
        assert!(is_blacklisted(&record, &blacklist));
    }

    #[test]
    fn filter_many_keeps_order() {
        let blacklist = Blacklist::new().with_rule("name", rule(&["Potato"], &["tata"]));
        let records = vec![
            NationRecord::new("Potato"),
            NationRecord::new("potata"),
            NationRecord::new("Taco Supreme"),
            NationRecord::new("Burrito"),
        ];
        let names: Vec<String> = filter_many(records, &blacklist)
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["Taco Supreme", "Burrito"]);
    }

    #[test]
    fn rules_load_with_missing_lists() {
        let blacklist: Blacklist =
            serde_json::from_str(r#"{"name": {"partial": ["bot"]}}"#).unwrap();
        assert_eq!(blacklist.len(), 1);
        assert!(is_blacklisted(&NationRecord::new("RoBoT 7"), &blacklist));
    }

    proptest! {
        #[test]
        fn filter_many_is_idempotent(
            names in prop::collection::vec("[a-zA-Z ]{1,12}", 0..20),
            exact in prop::collection::vec("[a-zA-Z]{1,6}", 0..4),
            partial in prop::collection::vec("[a-zA-Z]{1,3}", 0..4),
        ) {
            let blacklist = Blacklist::new().with_rule("name", BlacklistRule { exact, partial });
            let records: Vec<NationRecord> = names.into_iter().map(NationRecord::new).collect();
            let once = filter_many(records, &blacklist);
            let twice = filter_many(once.clone(), &blacklist);
            prop_assert_eq!(once, twice);
        }
    }
}
