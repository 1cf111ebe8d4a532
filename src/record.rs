//! A nation as handed out by the pool
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const NAME: &str = "name";
pub const REGION: &str = "region";
pub const FOUNDING_REGION: &str = "founding_region";
pub const FOUNDED_AT: &str = "founded_at";

/// Attribute map for a single nation.
///
/// Always carries `name`; anything else upstream reports is merged in as it
/// is fetched. Serializes as a flat JSON object with sorted keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct NationRecord {
    attributes: BTreeMap<String, String>,
}

impl NationRecord {
    pub fn new(name: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(NAME.to_string(), name.into());
        Self { attributes }
    }

    pub fn name(&self) -> &str {
        self.get(NAME).unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).map(String::as_str)
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(field.into(), value.into());
    }

    /// Overlay freshly fetched attributes on top of what we already know
    pub fn merge(&mut self, other: NationRecord) {
        self.attributes.extend(other.attributes);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// How a nation name is written in upstream URLs
pub fn upstream_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}
