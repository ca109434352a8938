use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::ItemCatalog;
use crate::overrides::OverrideTable;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Item names whose LMS variant already has a catalog (wiki) page.
    pub existing_pages: Vec<String>,
    /// Listed LMS items without a catalog page, sorted and de-duplicated.
    pub missing: Vec<String>,
    pub missing_with_override: Vec<String>,
    pub missing_without_override: Vec<String>,
    /// Override entries whose name is not in the LMS item list.
    pub unlisted_overrides: Vec<String>,
    /// Pages already rendered into the output directory.
    pub generated: Vec<String>,
}

pub fn coverage_report(
    catalog: &dyn ItemCatalog,
    item_names: &[String],
    table: &OverrideTable,
    generated: Vec<String>,
) -> CoverageReport {
    let existing = catalog
        .records()
        .filter(|record| !record.duplicate && record.is_lms_variant())
        .map(|record| record.name.clone())
        .collect::<BTreeSet<_>>();

    let listed = item_names
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>();
    let missing = listed
        .iter()
        .filter(|name| !existing.contains(**name))
        .map(|name| (*name).to_string())
        .collect::<Vec<_>>();
    let (missing_with_override, missing_without_override): (Vec<_>, Vec<_>) = missing
        .iter()
        .cloned()
        .partition(|name| table.contains(name));
    let unlisted_overrides = table
        .entries()
        .iter()
        .filter(|entry| !listed.contains(entry.name.as_str()))
        .map(|entry| entry.name.clone())
        .collect();

    CoverageReport {
        existing_pages: existing.into_iter().collect(),
        missing,
        missing_with_override,
        missing_without_override,
        unlisted_overrides,
        generated,
    }
}

#[cfg(test)]
mod tests {
    use super::coverage_report;
    use crate::catalog::tests::fixture_catalog;
    use crate::overrides::OverrideTable;

    const ENTRY: &str = r#"{"buy_limit": null, "cost": 5, "highalch": 0, "id": 27164,
        "linked_id_noted": 0, "linked_id_placeholder": null, "lowalch": 0,
        "members": false, "noteable": true, "tradeable": false, "tradeable_on_ge": false}"#;

    #[test]
    fn splits_listed_names_by_page_and_override_state() {
        let catalog = fixture_catalog();
        let table = OverrideTable::from_json(&format!(
            r#"{{"Ghostly robe (top)": {ENTRY}, "Zamorak chaps": {ENTRY}}}"#
        ))
        .expect("table");
        let names = [
            "Barrows gloves",
            "Ghostly robe (top)",
            "Abyssal whip",
            "Ghostly robe (top)",
        ]
        .map(str::to_string);

        let report = coverage_report(
            &catalog,
            &names,
            &table,
            vec!["Ghostly robe (top) (Last Man Standing)".to_string()],
        );

        assert_eq!(report.existing_pages, vec!["Barrows gloves".to_string()]);
        assert_eq!(
            report.missing,
            vec!["Abyssal whip".to_string(), "Ghostly robe (top)".to_string()]
        );
        assert_eq!(
            report.missing_with_override,
            vec!["Ghostly robe (top)".to_string()]
        );
        assert_eq!(
            report.missing_without_override,
            vec!["Abyssal whip".to_string()]
        );
        assert_eq!(report.unlisted_overrides, vec!["Zamorak chaps".to_string()]);
        assert_eq!(report.generated.len(), 1);
    }
}
