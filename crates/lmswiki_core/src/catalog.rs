use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{VariantError, VariantResult};
use crate::item::ItemRecord;

/// Display names that are shared by two catalog entries (a slot pair).
/// Lookups for these opt into ambiguous matching.
pub const KNOWN_NAME_COLLISIONS: &[&str] = &["Ghostly robe (top)", "Ghostly robe (bottom)"];

pub trait ItemCatalog {
    /// Resolve a display name. Matches on `name` first, then on `wiki_name`;
    /// records flagged as duplicates never count as candidates.
    fn lookup_by_name(&self, name: &str, allow_ambiguous: bool) -> VariantResult<&ItemRecord>;

    fn lookup_by_id(&self, id: u32) -> VariantResult<&ItemRecord>;

    fn records(&self) -> Box<dyn Iterator<Item = &ItemRecord> + '_>;
}

pub fn allows_ambiguous_lookup(name: &str) -> bool {
    KNOWN_NAME_COLLISIONS.contains(&name)
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: BTreeMap<u32, ItemRecord>,
}

impl Catalog {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ItemRecord>,
    {
        Self {
            items: records
                .into_iter()
                .map(|record| (record.id, record))
                .collect(),
        }
    }

    /// Accepts the osrsbox dump keyed by id, or a plain list of items.
    pub fn from_json(content: &str) -> Result<Self> {
        let parsed: Value =
            serde_json::from_str(content).context("failed to parse item catalog JSON")?;
        let records = match parsed {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| {
                    ItemRecord::deserialize(value)
                        .with_context(|| format!("invalid catalog item `{key}`"))
                })
                .collect::<Result<Vec<_>>>()?,
            Value::Array(list) => list
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    ItemRecord::deserialize(value)
                        .with_context(|| format!("invalid catalog item at index {index}"))
                })
                .collect::<Result<Vec<_>>>()?,
            _ => bail!("failed to parse item catalog JSON: expected an object or an array"),
        };
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read item catalog {}", path.display()))?;
    let catalog = Catalog::from_json(&content)
        .with_context(|| format!("failed to load item catalog {}", path.display()))?;
    tracing::debug!(items = catalog.len(), path = %path.display(), "loaded item catalog");
    Ok(catalog)
}

impl ItemCatalog for Catalog {
    fn lookup_by_name(&self, name: &str, allow_ambiguous: bool) -> VariantResult<&ItemRecord> {
        let mut candidates = self
            .items
            .values()
            .filter(|record| !record.duplicate && record.name == name)
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            candidates = self
                .items
                .values()
                .filter(|record| !record.duplicate && record.wiki_name == name)
                .collect();
        }

        match candidates.as_slice() {
            [] => Err(VariantError::NotFound {
                query: name.to_string(),
            }),
            [single] => Ok(*single),
            [first, ..] if allow_ambiguous => Ok(*first),
            many => Err(VariantError::Ambiguous {
                name: name.to_string(),
                ids: many.iter().map(|record| record.id).collect(),
            }),
        }
    }

    fn lookup_by_id(&self, id: u32) -> VariantResult<&ItemRecord> {
        self.items.get(&id).ok_or_else(|| VariantError::NotFound {
            query: format!("id {id}"),
        })
    }

    fn records(&self) -> Box<dyn Iterator<Item = &ItemRecord> + '_> {
        Box::new(self.items.values())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Catalog, ItemCatalog, allows_ambiguous_lookup};
    use crate::error::VariantError;

    pub(crate) fn fixture_catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "4151": {
                    "id": 4151, "name": "Abyssal whip", "wiki_name": "Abyssal whip",
                    "wiki_url": "https://oldschool.runescape.wiki/w/Abyssal_whip",
                    "members": true, "tradeable": true, "tradeable_on_ge": true,
                    "equipable": true, "equipable_weapon": true, "cost": 120001,
                    "lowalch": 48000, "highalch": 72000, "buy_limit": 70,
                    "release_date": "2005-01-26",
                    "equipment": {"attack_slash": 82, "melee_strength": 82, "slot": "weapon"},
                    "weapon": {"attack_speed": 4, "weapon_type": "whip"}
                },
                "4152": {
                    "id": 4152, "name": "Abyssal whip", "noted": true, "duplicate": true
                },
                "22804": {
                    "id": 22804, "name": "Dragon knife", "wiki_name": "Dragon knife",
                    "wiki_url": "https://oldschool.runescape.wiki/w/Dragon_knife#Unpoisoned",
                    "members": true, "equipable": true, "equipable_weapon": true,
                    "release_date": "2018-01-04",
                    "weapon": {"attack_speed": 3, "weapon_type": "thrown"}
                },
                "6107": {
                    "id": 6107, "name": "Ghostly robe", "wiki_name": "Ghostly robe (top)",
                    "wiki_url": "https://oldschool.runescape.wiki/w/Ghostly_robe_(top)",
                    "equipable": true, "release_date": "2004-10-25",
                    "equipment": {"slot": "body"}
                },
                "6108": {
                    "id": 6108, "name": "Ghostly robe", "wiki_name": "Ghostly robe (bottom)",
                    "wiki_url": "https://oldschool.runescape.wiki/w/Ghostly_robe_(bottom)",
                    "equipable": true, "release_date": "2004-10-25",
                    "equipment": {"slot": "legs"}
                },
                "23593": {
                    "id": 23593, "name": "Barrows gloves",
                    "wiki_name": "Barrows gloves (Last Man Standing)",
                    "wiki_url": "https://oldschool.runescape.wiki/w/Barrows_gloves_(Last_Man_Standing)",
                    "equipable": true, "release_date": "2016-08-04"
                }
            }"#,
        )
        .expect("fixture catalog")
    }

    #[test]
    fn from_json_accepts_keyed_and_listed_dumps() {
        let keyed = fixture_catalog();
        assert_eq!(keyed.len(), 6);

        let listed =
            Catalog::from_json(r#"[{"id": 1, "name": "One"}, {"id": 2, "name": "Two"}]"#)
                .expect("listed");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed.lookup_by_id(2).expect("id 2").name, "Two");
    }

    #[test]
    fn lookup_by_name_ignores_duplicate_entries() {
        let catalog = fixture_catalog();
        let record = catalog
            .lookup_by_name("Abyssal whip", false)
            .expect("whip");
        assert_eq!(record.id, 4151);
    }

    #[test]
    fn lookup_by_name_reports_ambiguity_unless_allowed() {
        let catalog = fixture_catalog();
        let error = catalog
            .lookup_by_name("Ghostly robe", false)
            .expect_err("ambiguous");
        assert_eq!(
            error,
            VariantError::Ambiguous {
                name: "Ghostly robe".to_string(),
                ids: vec![6107, 6108],
            }
        );

        let first = catalog
            .lookup_by_name("Ghostly robe", true)
            .expect("first match");
        assert_eq!(first.id, 6107);
    }

    #[test]
    fn lookup_by_name_falls_back_to_wiki_name() {
        let catalog = fixture_catalog();
        let name = "Ghostly robe (bottom)";
        let bottom = catalog
            .lookup_by_name(name, allows_ambiguous_lookup(name))
            .expect("bottom");
        assert_eq!(bottom.id, 6108);
    }

    #[test]
    fn lookups_report_not_found() {
        let catalog = fixture_catalog();
        assert_eq!(
            catalog.lookup_by_name("Spiked macles", false),
            Err(VariantError::NotFound {
                query: "Spiked macles".to_string()
            })
        );
        assert!(matches!(
            catalog.lookup_by_id(99),
            Err(VariantError::NotFound { .. })
        ));
    }

    #[test]
    fn from_json_names_the_malformed_item() {
        let keyed = Catalog::from_json(
            r#"{"1": {"id": 1, "name": "One"}, "2": {"id": 2, "name": "Two", "cost": "free"}}"#,
        )
        .expect_err("must fail");
        assert!(keyed.to_string().contains("invalid catalog item `2`"));
        assert!(format!("{keyed:#}").contains("invalid type"));

        let listed = Catalog::from_json(r#"[{"id": 1, "name": "One"}, {"id": "two"}]"#)
            .expect_err("must fail");
        assert!(listed.to_string().contains("index 1"));
    }

    #[test]
    fn from_json_rejects_non_catalog_documents() {
        let error = Catalog::from_json("\"not a catalog\"").expect_err("must fail");
        assert!(error.to_string().contains("failed to parse item catalog JSON"));
    }
}
