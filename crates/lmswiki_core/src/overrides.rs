use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{VariantError, VariantResult};

const EMBEDDED_OVERRIDES: &str = include_str!("../data/lms_overrides.json");
const EMBEDDED_ITEM_NAMES: &str = include_str!("../data/lms_item_names.json");

/// Mode-specific values for an item whose LMS variant has no catalog page yet.
///
/// Every field must be present in the source table; nullable fields are
/// written as an explicit `null` rather than left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverridePartial {
    #[serde(deserialize_with = "required_nullable")]
    pub buy_limit: Option<i64>,
    pub cost: i64,
    pub highalch: i64,
    pub id: u32,
    #[serde(deserialize_with = "required_nullable")]
    pub linked_id_noted: Option<u32>,
    #[serde(deserialize_with = "required_nullable")]
    pub linked_id_placeholder: Option<u32>,
    pub lowalch: i64,
    pub members: bool,
    pub noteable: bool,
    #[serde(deserialize_with = "required_nullable")]
    pub tradeable: Option<bool>,
    pub tradeable_on_ge: bool,
}

// A field with `deserialize_with` loses serde's implicit `None` for a missing
// key, which is what makes `null` mandatory here.
fn required_nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub name: String,
    pub partial: OverridePartial,
}

/// Override entries keyed by display name, in sorted name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: Vec<OverrideEntry>,
}

impl OverrideTable {
    pub fn embedded() -> VariantResult<Self> {
        Self::from_json(EMBEDDED_OVERRIDES)
    }

    pub fn from_json(content: &str) -> VariantResult<Self> {
        let raw: Map<String, Value> =
            serde_json::from_str(content).map_err(|error| VariantError::ShapeMismatch {
                item: "<table>".to_string(),
                detail: error.to_string(),
            })?;

        let mut entries = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            let partial = OverridePartial::deserialize(value).map_err(|error| {
                VariantError::ShapeMismatch {
                    item: name.clone(),
                    detail: error.to_string(),
                }
            })?;
            entries.push(OverrideEntry { name, partial });
        }
        entries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[OverrideEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&OverridePartial> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.partial)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the named entries; unknown names are returned for reporting.
    pub fn select(&self, names: &[String]) -> (Self, Vec<String>) {
        let wanted = names.iter().map(String::as_str).collect::<BTreeSet<_>>();
        let entries = self
            .entries
            .iter()
            .filter(|entry| wanted.contains(entry.name.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        let unknown = wanted
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect();
        (Self { entries }, unknown)
    }
}

pub fn load_override_table(path: Option<&Path>) -> Result<OverrideTable> {
    let Some(path) = path else {
        return Ok(OverrideTable::embedded()?);
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read override table {}", path.display()))?;
    OverrideTable::from_json(&content)
        .with_context(|| format!("failed to load override table {}", path.display()))
}

/// Every item name that should exist as an LMS variant, as listed (may repeat).
pub fn embedded_item_names() -> Result<Vec<String>> {
    serde_json::from_str(EMBEDDED_ITEM_NAMES).context("failed to parse embedded LMS item names")
}

pub fn load_item_names(path: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = path else {
        return embedded_item_names();
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read item name list {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse item name list {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{OverrideTable, embedded_item_names};
    use crate::error::VariantError;

    const COMPLETE_ENTRY: &str = r#"{
        "buy_limit": null,
        "cost": 40,
        "highalch": 0,
        "id": 27186,
        "linked_id_noted": 0,
        "linked_id_placeholder": null,
        "lowalch": 0,
        "members": false,
        "noteable": true,
        "tradeable": false,
        "tradeable_on_ge": false
    }"#;

    #[test]
    fn embedded_table_loads_every_entry() {
        let table = OverrideTable::embedded().expect("embedded table");
        assert_eq!(table.len(), 47);
        let zaryte = table.get("Zaryte crossbow").expect("zaryte crossbow");
        assert_eq!(zaryte.id, 27186);
        assert_eq!(zaryte.cost, 40);
        assert_eq!(zaryte.buy_limit, None);
        assert_eq!(zaryte.linked_id_noted, Some(0));
        assert!(table.contains("Ghostly robe (top)"));
    }

    #[test]
    fn entries_are_sorted_by_name() {
        let table = OverrideTable::embedded().expect("embedded table");
        let names = table
            .entries()
            .iter()
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn missing_nullable_field_is_a_shape_mismatch() {
        let content = r#"{"3rd age range legs": {
            "cost": 20, "highalch": 0, "id": 27195, "linked_id_noted": 0,
            "linked_id_placeholder": null, "lowalch": 0, "members": false,
            "noteable": true, "tradeable": false, "tradeable_on_ge": false
        }}"#;
        let error = OverrideTable::from_json(content).expect_err("must fail");
        match error {
            VariantError::ShapeMismatch { item, detail } => {
                assert_eq!(item, "3rd age range legs");
                assert!(detail.contains("buy_limit"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extra_field_is_a_shape_mismatch() {
        let content = format!(
            r#"{{"Zaryte crossbow": {}}}"#,
            COMPLETE_ENTRY.replace("\"cost\": 40,", "\"cost\": 40, \"wiki_name\": \"Renamed\",")
        );
        let error = OverrideTable::from_json(&content).expect_err("must fail");
        assert!(matches!(
            error,
            VariantError::ShapeMismatch { ref item, ref detail }
                if item == "Zaryte crossbow" && detail.contains("wiki_name")
        ));
    }

    #[test]
    fn select_keeps_named_entries_and_reports_unknown_names() {
        let content = format!(
            r#"{{"Zaryte crossbow": {COMPLETE_ENTRY}, "Zamorak halo": {COMPLETE_ENTRY}}}"#
        );
        let table = OverrideTable::from_json(&content).expect("table");
        let (selected, unknown) = table.select(&[
            "Zamorak halo".to_string(),
            "Dragon claws".to_string(),
        ]);
        assert_eq!(selected.len(), 1);
        assert!(selected.contains("Zamorak halo"));
        assert_eq!(unknown, vec!["Dragon claws".to_string()]);
    }

    #[test]
    fn embedded_item_names_include_slot_pair() {
        let names = embedded_item_names().expect("names");
        assert!(names.iter().any(|name| name == "Ghostly robe (top)"));
        assert!(names.iter().any(|name| name == "Ghostly robe (bottom)"));
    }
}
