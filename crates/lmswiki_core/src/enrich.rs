use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::error::{VariantError, VariantResult};
use crate::item::{ItemKind, ItemRecord};

/// LMS launch date; no LMS variant can predate it.
pub const MODE_RELEASE_DATE: &str = "2016-08-04";

pub const WIELD_OPTIONS: &str = "Wield, Drop";
pub const WEAR_OPTIONS: &str = "Wear, Drop";

const MELEE_WEAPON_TYPES: &[&str] = &[
    "2h_sword",
    "axe",
    "blaster",
    "bludgeon",
    "blunt",
    "claw",
    "pickaxe",
    "polearm",
    "polestaff",
    "powered staff",
    "scythe",
    "slash_sword",
    "spear",
    "spiked",
    "stab sword",
    "whip",
];
const RANGED_WEAPON_TYPES: &[&str] = &["bow", "crossbow"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackRange {
    Tiles(u8),
    /// Staves use the autocast range, shown on the wiki as the word `staff`.
    Staff,
}

impl AttackRange {
    pub fn for_weapon_type(weapon_type: &str) -> Self {
        if MELEE_WEAPON_TYPES.contains(&weapon_type) {
            Self::Tiles(1)
        } else if RANGED_WEAPON_TYPES.contains(&weapon_type) {
            Self::Tiles(9)
        } else if weapon_type == "thrown" {
            Self::Tiles(4)
        } else if weapon_type == "staff" {
            Self::Staff
        } else {
            Self::Tiles(0)
        }
    }
}

impl fmt::Display for AttackRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tiles(tiles) => write!(f, "{tiles}"),
            Self::Staff => f.write_str("staff"),
        }
    }
}

impl Serialize for AttackRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Tiles(tiles) => serializer.serialize_u8(*tiles),
            Self::Staff => serializer.serialize_str("staff"),
        }
    }
}

/// Presentation-only fields layered on top of a derived record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_range: Option<AttackRange>,
    /// Clamped ISO date, kept for reporting.
    #[serde(skip)]
    pub release_date_iso: String,
    /// Wiki date-link markup, e.g. `[[4 August]] [[2016]]`.
    pub release_date: String,
    pub options: &'static str,
}

pub fn enrich_for_rendering(record: &ItemRecord) -> VariantResult<RenderFields> {
    let attack_range = match &record.kind {
        ItemKind::Weapon(profile) => Some(AttackRange::for_weapon_type(&profile.weapon_type)),
        ItemKind::NonWeapon => None,
    };

    let release_date_iso = match record.release_date.as_deref() {
        Some(date) => clamp_release_date(&record.wiki_name, date)?,
        None => {
            tracing::warn!(
                item = %record.wiki_name,
                "no release date in catalog; using LMS release date"
            );
            MODE_RELEASE_DATE.to_string()
        }
    };
    let release_date = format_wiki_date(&record.wiki_name, &release_date_iso)?;

    let options = if record.equipable_weapon {
        WIELD_OPTIONS
    } else {
        WEAR_OPTIONS
    };

    Ok(RenderFields {
        attack_range,
        release_date_iso,
        release_date,
        options,
    })
}

/// Validate an ISO date and raise it to [`MODE_RELEASE_DATE`] if earlier.
pub fn clamp_release_date(item: &str, date: &str) -> VariantResult<String> {
    parse_iso_date(item, date)?;
    // Fixed-width ISO dates order correctly as plain strings.
    if date < MODE_RELEASE_DATE {
        tracing::debug!(item, date, "release date predates LMS; clamping");
        return Ok(MODE_RELEASE_DATE.to_string());
    }
    Ok(date.to_string())
}

/// `2016-08-04` -> `[[4 August]] [[2016]]`.
pub fn format_wiki_date(item: &str, date: &str) -> VariantResult<String> {
    let parsed = parse_iso_date(item, date)?;
    Ok(parsed.format("[[%-d %B]] [[%Y]]").to_string())
}

fn parse_iso_date(item: &str, date: &str) -> VariantResult<NaiveDate> {
    let malformed = || VariantError::Format {
        item: item.to_string(),
        value: date.to_string(),
    };
    let fixed_width = date.len() == 10
        && date.char_indices().all(|(index, ch)| match index {
            4 | 7 => ch == '-',
            _ => ch.is_ascii_digit(),
        });
    if !fixed_width {
        return Err(malformed());
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::{
        AttackRange, MODE_RELEASE_DATE, clamp_release_date, enrich_for_rendering,
        format_wiki_date,
    };
    use crate::catalog::ItemCatalog;
    use crate::catalog::tests::fixture_catalog;
    use crate::error::VariantError;
    use crate::item::{ItemKind, ItemRecord, WeaponProfile};

    fn with_weapon_type(weapon_type: &str) -> ItemRecord {
        let catalog = fixture_catalog();
        let mut record = catalog.lookup_by_id(4151).expect("whip").clone();
        record.kind = ItemKind::Weapon(WeaponProfile {
            weapon_type: weapon_type.to_string(),
            attack_speed: Some(4),
            slot: Some("weapon".to_string()),
        });
        record
    }

    #[test]
    fn weapon_types_map_to_attack_ranges() {
        let range = |weapon_type: &str| {
            enrich_for_rendering(&with_weapon_type(weapon_type))
                .expect("enrich")
                .attack_range
        };
        assert_eq!(range("whip"), Some(AttackRange::Tiles(1)));
        assert_eq!(range("stab sword"), Some(AttackRange::Tiles(1)));
        assert_eq!(range("crossbow"), Some(AttackRange::Tiles(9)));
        assert_eq!(range("bow"), Some(AttackRange::Tiles(9)));
        assert_eq!(range("thrown"), Some(AttackRange::Tiles(4)));
        assert_eq!(range("staff"), Some(AttackRange::Staff));
        assert_eq!(range("salamander"), Some(AttackRange::Tiles(0)));
    }

    #[test]
    fn non_weapons_have_no_attack_range() {
        let catalog = fixture_catalog();
        let robe = catalog.lookup_by_id(6107).expect("robe");
        let fields = enrich_for_rendering(robe).expect("enrich");
        assert_eq!(fields.attack_range, None);
        let value = serde_json::to_value(&fields).expect("serialize");
        assert!(value.get("attack_range").is_none());
    }

    #[test]
    fn staff_range_renders_as_literal_word() {
        assert_eq!(AttackRange::Staff.to_string(), "staff");
        assert_eq!(
            serde_json::to_value(AttackRange::Staff).expect("serialize"),
            serde_json::json!("staff")
        );
        assert_eq!(
            serde_json::to_value(AttackRange::Tiles(9)).expect("serialize"),
            serde_json::json!(9)
        );
    }

    #[test]
    fn old_release_dates_clamp_to_mode_release() {
        let mut old = with_weapon_type("whip");
        old.release_date = Some("2010-01-01".to_string());
        let mut launch = old.clone();
        launch.release_date = Some(MODE_RELEASE_DATE.to_string());

        let clamped = enrich_for_rendering(&old).expect("old");
        let direct = enrich_for_rendering(&launch).expect("launch");
        assert_eq!(clamped.release_date, direct.release_date);
        assert_eq!(clamped.release_date_iso, MODE_RELEASE_DATE);
    }

    #[test]
    fn later_release_dates_are_kept() {
        assert_eq!(
            clamp_release_date("Dragon knife", "2018-01-04").expect("clamp"),
            "2018-01-04"
        );
    }

    #[test]
    fn missing_release_date_uses_mode_release() {
        let mut record = with_weapon_type("whip");
        record.release_date = None;
        let fields = enrich_for_rendering(&record).expect("enrich");
        assert_eq!(fields.release_date, "[[4 August]] [[2016]]");
    }

    #[test]
    fn formats_wiki_date_links() {
        assert_eq!(
            format_wiki_date("x", "2016-08-04").expect("format"),
            "[[4 August]] [[2016]]"
        );
        assert_eq!(
            format_wiki_date("x", "2023-11-20").expect("format"),
            "[[20 November]] [[2023]]"
        );
        assert_eq!(
            format_wiki_date("x", "2020-01-10").expect("format"),
            "[[10 January]] [[2020]]"
        );
    }

    #[test]
    fn malformed_dates_are_format_errors() {
        for value in ["2016/08/04", "2016-8-4", "16-08-04", "2016-02-30", ""] {
            let error = format_wiki_date("Dragon knife", value).expect_err(value);
            assert_eq!(
                error,
                VariantError::Format {
                    item: "Dragon knife".to_string(),
                    value: value.to_string(),
                }
            );
        }

        let mut record = with_weapon_type("whip");
        record.release_date = Some("04 August 2016".to_string());
        assert!(matches!(
            enrich_for_rendering(&record),
            Err(VariantError::Format { .. })
        ));
    }

    #[test]
    fn equip_options_follow_weapon_flag() {
        let catalog = fixture_catalog();
        let whip = enrich_for_rendering(catalog.lookup_by_id(4151).expect("whip")).expect("whip");
        let robe = enrich_for_rendering(catalog.lookup_by_id(6107).expect("robe")).expect("robe");
        assert_eq!(whip.options, "Wield, Drop");
        assert_eq!(robe.options, "Wear, Drop");
    }
}
