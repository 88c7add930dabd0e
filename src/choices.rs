use crate::statics;
use crate::value::LbValue;
use std::collections::{BTreeMap, BTreeSet};

/// Autocomplete tables derived from the control data.
///
/// Built once when the document is loaded and then only extended by local edits, so a
/// property name typed into one form stays available in every other form until the next fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceIndex {
    key_choices: BTreeSet<String>,
    value_choices: BTreeMap<String, BTreeSet<String>>,
}

impl ChoiceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&mut self, document: &LbValue) {
        self.key_choices.clear();
        self.value_choices.clear();
        self.extend(document);

        // Bridges and targets pick their credentials by account name.
        if let Some(accounts) = document.get(statics::LB_AUTH).and_then(|v| v.as_object()) {
            for name in accounts.keys() {
                self.add_account(name);
            }
        }
    }

    /// Offer a newly created account as an `auth` value.
    pub fn add_account(&mut self, name: &str) {
        self.record(statics::LB_FIELD_AUTH_REF, name);
    }

    pub fn extend(&mut self, entity: &LbValue) {
        match entity {
            LbValue::Object(map) => {
                for (key, value) in map {
                    match value {
                        LbValue::String(s) => self.record(key, s),
                        LbValue::Array(_) | LbValue::Object(_) => self.extend(value),
                        _ => {}
                    }
                }
            }
            LbValue::Array(values) => {
                for value in values {
                    self.extend(value);
                }
            }
            _ => {}
        }
    }

    pub fn key_choices(&self) -> Vec<&str> {
        self.key_choices.iter().map(String::as_str).collect()
    }

    pub fn value_choices(&self, key: &str) -> Vec<&str> {
        self.value_choices
            .get(key)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Property names starting with `prefix`, ignoring case.
    pub fn suggest_keys(&self, prefix: &str) -> Vec<&str> {
        filter_prefix(self.key_choices.iter(), prefix)
    }

    /// Known values of `key` starting with `prefix`, ignoring case.
    pub fn suggest_values(&self, key: &str, prefix: &str) -> Vec<&str> {
        match self.value_choices.get(key) {
            Some(values) => filter_prefix(values.iter(), prefix),
            None => Vec::new(),
        }
    }

    fn record(&mut self, key: &str, value: &str) {
        if key == statics::LB_EDITED_MARKER {
            return;
        }
        self.key_choices.insert(key.to_string());
        self.value_choices
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
    }
}

fn filter_prefix<'a>(items: impl Iterator<Item = &'a String>, prefix: &str) -> Vec<&'a str> {
    let prefix = prefix.to_lowercase();
    items
        .filter(|s| s.to_lowercase().starts_with(&prefix))
        .map(String::as_str)
        .collect()
}
