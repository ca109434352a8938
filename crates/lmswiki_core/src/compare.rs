use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::item::ItemRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDifference {
    pub field: String,
    pub left: Value,
    pub right: Value,
}

/// Top-level fields whose values differ between two records, by field name.
/// Useful for checking a new override entry against an existing LMS variant.
pub fn compare_records(left: &ItemRecord, right: &ItemRecord) -> Result<Vec<FieldDifference>> {
    let left = as_object(left)?;
    let right = as_object(right)?;
    let fields = left.keys().chain(right.keys()).collect::<BTreeSet<_>>();

    Ok(fields
        .into_iter()
        .filter_map(|field| {
            let left_value = left.get(field).cloned().unwrap_or(Value::Null);
            let right_value = right.get(field).cloned().unwrap_or(Value::Null);
            (left_value != right_value).then(|| FieldDifference {
                field: field.clone(),
                left: left_value,
                right: right_value,
            })
        })
        .collect())
}

fn as_object(record: &ItemRecord) -> Result<Map<String, Value>> {
    match serde_json::to_value(record).context("failed to serialize item record")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("item record serialized to non-object {other}"),
    }
}
