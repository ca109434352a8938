use serde::{Deserialize, Serialize};

/// A catalog item, either a normal item or a derived LMS variant.
///
/// The on-disk catalog carries a nullable `weapon` object; in memory that is
/// folded into [`ItemKind`] so weapon handling is an exhaustive match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CatalogEntry", into = "CatalogEntry")]
pub struct ItemRecord {
    pub id: u32,
    pub name: String,
    pub wiki_name: String,
    pub wiki_url: String,
    pub members: bool,
    pub tradeable: Option<bool>,
    pub tradeable_on_ge: bool,
    pub stackable: bool,
    pub noted: bool,
    pub noteable: bool,
    pub linked_id_item: Option<u32>,
    pub linked_id_noted: Option<u32>,
    pub linked_id_placeholder: Option<u32>,
    pub equipable: bool,
    pub equipable_weapon: bool,
    pub cost: i64,
    pub lowalch: Option<i64>,
    pub highalch: Option<i64>,
    pub weight: Option<f64>,
    pub buy_limit: Option<i64>,
    pub release_date: Option<String>,
    pub duplicate: bool,
    pub examine: Option<String>,
    pub equipment: Option<EquipmentStats>,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    NonWeapon,
    Weapon(WeaponProfile),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaponProfile {
    pub weapon_type: String,
    pub attack_speed: Option<u32>,
    pub slot: Option<String>,
}

impl ItemRecord {
    pub fn weapon(&self) -> Option<&WeaponProfile> {
        match &self.kind {
            ItemKind::Weapon(profile) => Some(profile),
            ItemKind::NonWeapon => None,
        }
    }

    pub fn is_lms_variant(&self) -> bool {
        self.wiki_name.contains(crate::derive::MODE_SUFFIX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentStats {
    pub attack_stab: i32,
    pub attack_slash: i32,
    pub attack_crush: i32,
    pub attack_magic: i32,
    pub attack_ranged: i32,
    pub defence_stab: i32,
    pub defence_slash: i32,
    pub defence_crush: i32,
    pub defence_magic: i32,
    pub defence_ranged: i32,
    pub melee_strength: i32,
    pub ranged_strength: i32,
    pub magic_damage: i32,
    pub prayer: i32,
    pub slot: Option<String>,
}

/// Item shape as stored in an osrsbox-style `items-complete.json` dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct CatalogEntry {
    id: u32,
    name: String,
    wiki_name: Option<String>,
    wiki_url: Option<String>,
    members: bool,
    tradeable: Option<bool>,
    tradeable_on_ge: bool,
    stackable: bool,
    noted: bool,
    noteable: bool,
    linked_id_item: Option<u32>,
    linked_id_noted: Option<u32>,
    linked_id_placeholder: Option<u32>,
    equipable: bool,
    equipable_weapon: bool,
    cost: i64,
    lowalch: Option<i64>,
    highalch: Option<i64>,
    weight: Option<f64>,
    buy_limit: Option<i64>,
    release_date: Option<String>,
    duplicate: bool,
    examine: Option<String>,
    equipment: Option<EquipmentStats>,
    weapon: Option<WeaponEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct WeaponEntry {
    attack_speed: Option<u32>,
    weapon_type: String,
}

impl From<CatalogEntry> for ItemRecord {
    fn from(entry: CatalogEntry) -> Self {
        let kind = match entry.weapon {
            Some(weapon) => ItemKind::Weapon(WeaponProfile {
                weapon_type: weapon.weapon_type,
                attack_speed: weapon.attack_speed,
                slot: entry
                    .equipment
                    .as_ref()
                    .and_then(|equipment| equipment.slot.clone()),
            }),
            None => ItemKind::NonWeapon,
        };
        let wiki_name = entry.wiki_name.unwrap_or_else(|| entry.name.clone());

        Self {
            id: entry.id,
            name: entry.name,
            wiki_name,
            wiki_url: entry.wiki_url.unwrap_or_default(),
            members: entry.members,
            tradeable: entry.tradeable,
            tradeable_on_ge: entry.tradeable_on_ge,
            stackable: entry.stackable,
            noted: entry.noted,
            noteable: entry.noteable,
            linked_id_item: entry.linked_id_item,
            linked_id_noted: entry.linked_id_noted,
            linked_id_placeholder: entry.linked_id_placeholder,
            equipable: entry.equipable,
            equipable_weapon: entry.equipable_weapon,
            cost: entry.cost,
            lowalch: entry.lowalch,
            highalch: entry.highalch,
            weight: entry.weight,
            buy_limit: entry.buy_limit,
            release_date: entry.release_date,
            duplicate: entry.duplicate,
            examine: entry.examine,
            equipment: entry.equipment,
            kind,
        }
    }
}

impl From<ItemRecord> for CatalogEntry {
    fn from(record: ItemRecord) -> Self {
        let weapon = match record.kind {
            ItemKind::Weapon(profile) => Some(WeaponEntry {
                attack_speed: profile.attack_speed,
                weapon_type: profile.weapon_type,
            }),
            ItemKind::NonWeapon => None,
        };

        Self {
            id: record.id,
            name: record.name,
            wiki_name: Some(record.wiki_name),
            wiki_url: Some(record.wiki_url),
            members: record.members,
            tradeable: record.tradeable,
            tradeable_on_ge: record.tradeable_on_ge,
            stackable: record.stackable,
            noted: record.noted,
            noteable: record.noteable,
            linked_id_item: record.linked_id_item,
            linked_id_noted: record.linked_id_noted,
            linked_id_placeholder: record.linked_id_placeholder,
            equipable: record.equipable,
            equipable_weapon: record.equipable_weapon,
            cost: record.cost,
            lowalch: record.lowalch,
            highalch: record.highalch,
            weight: record.weight,
            buy_limit: record.buy_limit,
            release_date: record.release_date,
            duplicate: record.duplicate,
            examine: record.examine,
            equipment: record.equipment,
            weapon,
        }
    }
}
