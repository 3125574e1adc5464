use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::meal::Meal;

/// The nested plan document: variant name to its ordered meal list.
///
/// Persisted as a plain JSON object. Variant names are unique ignoring case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DietPlan(BTreeMap<String, Vec<Meal>>);

impl DietPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variant(mut self, name: impl Into<String>, meals: Vec<Meal>) -> Self {
        self.0.insert(name.into(), meals);
        self
    }

    pub fn variant(&self, name: &str) -> Option<&[Meal]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn contains_variant(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the stored key that equals `name` ignoring case.
    pub fn find_variant_ignore_case(&self, name: &str) -> Option<&str> {
        let wanted = name.to_lowercase();
        self.0
            .keys()
            .find(|k| k.to_lowercase() == wanted)
            .map(String::as_str)
    }

    pub fn variant_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn variants(&self) -> impl Iterator<Item = (&str, &[Meal])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert_variant(&mut self, name: String, meals: Vec<Meal>) {
        self.0.insert(name, meals);
    }

    pub(crate) fn remove_variant(&mut self, name: &str) -> Option<Vec<Meal>> {
        self.0.remove(name)
    }

    pub(crate) fn variant_mut(&mut self, name: &str) -> Option<&mut Vec<Meal>> {
        self.0.get_mut(name)
    }
}

/// A diet template as returned by the template store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DietTemplate {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub plan: DietPlan,
    /// Opaque concurrency token. Stores that do not issue one leave it empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DietTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
            plan: DietPlan::new(),
            version: None,
        }
    }

    pub fn with_plan(mut self, plan: DietPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Display for DietTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "ID: {}", self.id)?;
        write!(f, "Variants: {}", self.plan.len())
    }
}
