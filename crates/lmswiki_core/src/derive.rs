use crate::item::ItemRecord;
use crate::overrides::OverridePartial;

pub const MODE_SUFFIX: &str = "Last Man Standing";
pub const MODE_URL_SUFFIX: &str = "Last_Man_Standing";

/// Wiki names containing this marker belong to a slot pair sharing one item name.
const SLOT_PAIR_MARKER: &str = "Ghostly robe";

/// Build the LMS variant of `base`.
///
/// Every override field replaces the base value. The wiki name and URL are
/// always the base ones plus the mode suffix, and slot-pair items take their
/// wiki name as in-game name so the two pages stay distinguishable.
pub fn derive_variant(base: &ItemRecord, partial: &OverridePartial) -> ItemRecord {
    let mut derived = base.clone();
    overlay(&mut derived, partial);

    if base.wiki_name.contains(SLOT_PAIR_MARKER) {
        derived.name = base.wiki_name.clone();
    }
    derived.wiki_name = variant_wiki_name(&base.wiki_name);
    derived.wiki_url = variant_wiki_url(&base.wiki_url);
    derived
}

fn overlay(record: &mut ItemRecord, partial: &OverridePartial) {
    let OverridePartial {
        buy_limit,
        cost,
        highalch,
        id,
        linked_id_noted,
        linked_id_placeholder,
        lowalch,
        members,
        noteable,
        tradeable,
        tradeable_on_ge,
    } = partial.clone();

    record.buy_limit = buy_limit;
    record.cost = cost;
    record.highalch = Some(highalch);
    record.id = id;
    record.linked_id_noted = linked_id_noted;
    record.linked_id_placeholder = linked_id_placeholder;
    record.lowalch = Some(lowalch);
    record.members = members;
    record.noteable = noteable;
    record.tradeable = tradeable;
    record.tradeable_on_ge = tradeable_on_ge;
}

pub fn variant_wiki_name(wiki_name: &str) -> String {
    format!("{wiki_name} ({MODE_SUFFIX})")
}

pub fn variant_wiki_url(wiki_url: &str) -> String {
    format!("{}_({MODE_URL_SUFFIX})", strip_fragment(wiki_url))
}

/// Drop a trailing `#section` anchor, e.g. `Dragon_knife#Unpoisoned` -> `Dragon_knife`.
pub fn strip_fragment(wiki_url: &str) -> &str {
    wiki_url
        .split_once('#')
        .map_or(wiki_url, |(page, _)| page)
}
