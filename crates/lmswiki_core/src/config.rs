use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::pipeline::ErrorPolicy;
use crate::render::DEFAULT_TEMPLATE_NAME;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct LmsConfig {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub generate: GenerateSection,
}

/// Relative paths are resolved against the project root.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PathsSection {
    pub catalog: Option<String>,
    pub templates_dir: Option<String>,
    pub output_dir: Option<String>,
}

/// Replacements for the embedded override table and LMS item list.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct DataSection {
    pub overrides: Option<String>,
    pub item_names: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct GenerateSection {
    pub template: Option<String>,
    pub on_error: Option<ErrorPolicy>,
}

impl LmsConfig {
    pub fn template_name(&self) -> &str {
        self.generate
            .template
            .as_deref()
            .unwrap_or(DEFAULT_TEMPLATE_NAME)
    }

    /// Resolve the batch error policy: env LMSWIKI_ON_ERROR > config > abort.
    pub fn error_policy(&self) -> Result<ErrorPolicy> {
        self.error_policy_with_lookup(|key| env::var(key).ok())
    }

    fn error_policy_with_lookup<F>(&self, lookup_env: F) -> Result<ErrorPolicy>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup_env("LMSWIKI_ON_ERROR") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return ErrorPolicy::parse(trimmed).context("invalid LMSWIKI_ON_ERROR");
            }
        }
        Ok(self.generate.on_error.unwrap_or_default())
    }
}

impl ErrorPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        if value.eq_ignore_ascii_case("abort") {
            return Ok(Self::Abort);
        }
        if value.eq_ignore_ascii_case("skip") {
            return Ok(Self::Skip);
        }
        bail!("unknown error policy `{value}` (expected `abort` or `skip`)")
    }
}

/// Load and parse an LmsConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<LmsConfig> {
    if !config_path.exists() {
        return Ok(LmsConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: LmsConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}
