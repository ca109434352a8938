use thiserror::Error;

/// Failures raised while turning a catalog item into an LMS page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    #[error("no catalog item matches `{query}`")]
    NotFound { query: String },

    #[error("`{name}` matches {} catalog items (ids: {})", .ids.len(), join_ids(.ids))]
    Ambiguous { name: String, ids: Vec<u32> },

    #[error("override entry `{item}` does not match the LMS override shape: {detail}")]
    ShapeMismatch { item: String, detail: String },

    #[error("`{item}` has a malformed release date `{value}` (expected YYYY-MM-DD)")]
    Format { item: String, value: String },

    #[error("`{title}` cannot be used as a page file name")]
    InvalidTitle { title: String },
}

impl VariantError {
    /// Errors confined to one item's data, which the skip policy may step over.
    pub fn is_item_local(&self) -> bool {
        matches!(self, Self::Format { .. } | Self::InvalidTitle { .. })
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type VariantResult<T> = std::result::Result<T, VariantError>;
