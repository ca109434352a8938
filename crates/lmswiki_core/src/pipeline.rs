use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::{ItemCatalog, allows_ambiguous_lookup};
use crate::derive::derive_variant;
use crate::enrich::{RenderFields, enrich_for_rendering};
use crate::error::VariantResult;
use crate::item::ItemRecord;
use crate::output::{PageSink, PageWrite, validate_title};
use crate::overrides::{OverridePartial, OverrideTable};
use crate::render::{PageRenderer, render_fields};

/// What to do when one item fails with an item-local error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Skip,
}

impl ErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreparedVariant {
    pub base_id: u32,
    pub record: ItemRecord,
    pub fields: RenderFields,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPage {
    pub name: String,
    pub base_id: u32,
    pub id: u32,
    pub release_date: String,
    pub clamped: bool,
    pub write: PageWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub generated: Vec<GeneratedPage>,
    pub failures: Vec<ItemFailure>,
}

pub enum BatchEvent<'a> {
    Generated(&'a GeneratedPage),
    Skipped(&'a ItemFailure),
}

/// Lookup, derive and enrich one override entry, without rendering it.
pub fn prepare_variant(
    catalog: &dyn ItemCatalog,
    name: &str,
    partial: &OverridePartial,
) -> VariantResult<PreparedVariant> {
    let base = catalog.lookup_by_name(name, allows_ambiguous_lookup(name))?;
    let record = derive_variant(base, partial);
    let fields = enrich_for_rendering(&record)?;
    validate_title(&record.wiki_name)?;
    Ok(PreparedVariant {
        base_id: base.id,
        record,
        fields,
    })
}

pub fn run_batch<F>(
    catalog: &dyn ItemCatalog,
    table: &OverrideTable,
    renderer: &dyn PageRenderer,
    sink: &mut dyn PageSink,
    policy: ErrorPolicy,
    mut progress: F,
) -> Result<BatchReport>
where
    F: FnMut(BatchEvent<'_>),
{
    let mut report = BatchReport::default();

    for entry in table.entries() {
        let prepared = match prepare_variant(catalog, &entry.name, &entry.partial) {
            Ok(prepared) => prepared,
            Err(error) if policy == ErrorPolicy::Skip && error.is_item_local() => {
                tracing::warn!(item = %entry.name, %error, "skipping item");
                let failure = ItemFailure {
                    name: entry.name.clone(),
                    message: error.to_string(),
                };
                progress(BatchEvent::Skipped(&failure));
                report.failures.push(failure);
                continue;
            }
            Err(error) => {
                return Err(anyhow::Error::new(error)
                    .context(format!("failed to generate page for `{}`", entry.name)));
            }
        };

        let mapping = render_fields(&prepared.record, &prepared.fields)?;
        let content = renderer
            .render(&mapping)
            .with_context(|| format!("failed to render page for `{}`", entry.name))?;
        let write = sink
            .write_page(&prepared.record.wiki_name, &content)
            .with_context(|| format!("failed to write page for `{}`", entry.name))?;
        tracing::info!(item = %entry.name, path = %write.path.display(), "generated page");

        let page = GeneratedPage {
            name: entry.name.clone(),
            base_id: prepared.base_id,
            id: prepared.record.id,
            clamped: prepared.record.release_date.as_deref()
                != Some(prepared.fields.release_date_iso.as_str()),
            release_date: prepared.fields.release_date_iso,
            write,
        };
        progress(BatchEvent::Generated(&page));
        report.generated.push(page);
    }

    Ok(report)
}
