use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::config::{LmsConfig, load_config};
use crate::render::{DEFAULT_TEMPLATE_NAME, PageTemplate};

pub const STATE_DIR_NAME: &str = ".lmswiki";
pub const DEFAULT_OUTPUT_DIR: &str = "page_outputs";
pub const DEFAULT_CATALOG_FILE: &str = "items-complete.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
    pub executable_dir: Option<PathBuf>,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        let executable_dir = env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf));
        Ok(Self {
            cwd,
            executable_dir,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub state_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub config_path: PathBuf,
    pub overrides_path: Option<PathBuf>,
    pub item_names_path: Option<PathBuf>,
    pub root_source: ValueSource,
    pub catalog_source: ValueSource,
    pub output_source: ValueSource,
    pub config_source: ValueSource,
}

#[derive(Debug, Clone)]
pub struct RuntimeStatus {
    pub project_root_exists: bool,
    pub state_dir_exists: bool,
    pub templates_exists: bool,
    pub output_dir_exists: bool,
    pub catalog_exists: bool,
    pub catalog_size_bytes: Option<u64>,
    pub config_exists: bool,
    pub warnings: Vec<String>,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nstate_dir={}\ntemplates_dir={}\noutput_dir={} ({})\ncatalog_path={} ({})\nconfig_path={} ({})\noverrides={}\nitem_names={}",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.state_dir),
            normalize_for_display(&self.templates_dir),
            normalize_for_display(&self.output_dir),
            self.output_source.as_str(),
            normalize_for_display(&self.catalog_path),
            self.catalog_source.as_str(),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
            display_optional(self.overrides_path.as_deref()),
            display_optional(self.item_names_path.as_deref()),
        )
    }
}

pub fn inspect_runtime(paths: &ResolvedPaths) -> Result<RuntimeStatus> {
    let project_root_exists = paths.project_root.exists();
    let state_dir_exists = paths.state_dir.exists();
    let templates_exists = paths.templates_dir.exists();
    let output_dir_exists = paths.output_dir.exists();
    let config_exists = paths.config_path.exists();
    let catalog_exists = paths.catalog_path.exists();
    let catalog_size_bytes = if catalog_exists {
        let metadata = fs::metadata(&paths.catalog_path)
            .with_context(|| format!("failed to inspect {}", paths.catalog_path.display()))?;
        Some(metadata.len())
    } else {
        None
    };

    let mut warnings = Vec::new();
    if !catalog_exists {
        warnings.push(format!(
            "item catalog is missing at {}; pass --catalog or set LMSWIKI_CATALOG",
            normalize_for_display(&paths.catalog_path)
        ));
    }
    if !templates_exists {
        warnings.push(
            "templates/ is missing; the embedded page template will be used".to_string(),
        );
    }
    if !state_dir_exists {
        warnings.push(format!(
            "{STATE_DIR_NAME}/ is missing; run `lmswiki init` to write a config"
        ));
    }

    Ok(RuntimeStatus {
        project_root_exists,
        state_dir_exists,
        templates_exists,
        output_dir_exists,
        catalog_exists,
        catalog_size_bytes,
        config_exists,
        warnings,
    })
}

pub fn ensure_catalog_available(paths: &ResolvedPaths) -> Result<()> {
    if !paths.catalog_path.exists() {
        bail!(
            "Item catalog not found: {}\nDownload an items-complete.json dump and pass --catalog <PATH>, set LMSWIKI_CATALOG, or set [paths] catalog in {}",
            normalize_for_display(&paths.catalog_path),
            normalize_for_display(&paths.config_path)
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub include_templates: bool,
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct InitReport {
    pub created_dirs: Vec<PathBuf>,
    pub wrote_config: bool,
    pub wrote_template: bool,
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<(ResolvedPaths, LmsConfig)> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<(ResolvedPaths, LmsConfig)>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env)
        .context("failed to resolve project root")?;
    let state_dir = project_root.join(STATE_DIR_NAME);

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (
            absolutize_from_project(path, &project_root),
            ValueSource::Flag,
        )
    } else if let Some(value) = lookup_env("LMSWIKI_CONFIG") {
        (
            absolutize_from_project(Path::new(value.trim()), &project_root),
            ValueSource::Env,
        )
    } else {
        (state_dir.join("config.toml"), ValueSource::Default)
    };
    let config = load_config(&config_path)?;

    let (catalog_path, catalog_source) = resolve_configured_path(
        overrides.catalog.as_deref(),
        lookup_env("LMSWIKI_CATALOG"),
        config.paths.catalog.as_deref(),
        project_root.join("data").join(DEFAULT_CATALOG_FILE),
        &project_root,
    );
    let (output_dir, output_source) = resolve_configured_path(
        overrides.output_dir.as_deref(),
        lookup_env("LMSWIKI_OUTPUT_DIR"),
        config.paths.output_dir.as_deref(),
        project_root.join(DEFAULT_OUTPUT_DIR),
        &project_root,
    );
    let templates_dir = config
        .paths
        .templates_dir
        .as_deref()
        .map(|path| absolutize_from_project(Path::new(path), &project_root))
        .unwrap_or_else(|| project_root.join("templates"));
    let overrides_path = config
        .data
        .overrides
        .as_deref()
        .map(|path| absolutize_from_project(Path::new(path), &project_root));
    let item_names_path = config
        .data
        .item_names
        .as_deref()
        .map(|path| absolutize_from_project(Path::new(path), &project_root));

    let paths = ResolvedPaths {
        project_root,
        state_dir,
        templates_dir,
        output_dir,
        catalog_path,
        config_path,
        overrides_path,
        item_names_path,
        root_source,
        catalog_source,
        output_source,
        config_source,
    };
    Ok((paths, config))
}

fn resolve_configured_path(
    flag: Option<&Path>,
    env_value: Option<String>,
    config_value: Option<&str>,
    default: PathBuf,
    project_root: &Path,
) -> (PathBuf, ValueSource) {
    if let Some(path) = flag {
        return (absolutize_from_project(path, project_root), ValueSource::Flag);
    }
    if let Some(value) = env_value
        && !value.trim().is_empty()
    {
        return (
            absolutize_from_project(Path::new(value.trim()), project_root),
            ValueSource::Env,
        );
    }
    if let Some(value) = config_value {
        return (
            absolutize_from_project(Path::new(value), project_root),
            ValueSource::Config,
        );
    }
    (default, ValueSource::Default)
}

pub fn init_layout(paths: &ResolvedPaths, options: &InitOptions) -> Result<InitReport> {
    let mut created_dirs = Vec::new();

    let mut required_dirs = vec![
        paths.state_dir.clone(),
        paths.output_dir.clone(),
        paths.project_root.join("data"),
    ];
    if options.include_templates {
        required_dirs.push(paths.templates_dir.clone());
    }

    for dir in &required_dirs {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            created_dirs.push(dir.clone());
        }
    }

    let wrote_config = write_text_file(
        &paths.config_path,
        &render_materialized_config(paths),
        options.force,
    )?;
    let wrote_template = if options.include_templates {
        write_text_file(
            &paths.templates_dir.join(DEFAULT_TEMPLATE_NAME),
            PageTemplate::embedded_source(),
            options.force,
        )?
    } else {
        false
    };

    Ok(InitReport {
        created_dirs,
        wrote_config,
        wrote_template,
    })
}

pub fn render_materialized_config(paths: &ResolvedPaths) -> String {
    let catalog_path = normalize_for_display(&paths.catalog_path);
    let templates_dir = normalize_for_display(&paths.templates_dir);
    let output_dir = normalize_for_display(&paths.output_dir);

    format!(
        "# lmswiki configuration (materialized by `lmswiki init`)\n# Relative paths resolve against the project root.\n\n[paths]\ncatalog = \"{catalog_path}\"\ntemplates_dir = \"{templates_dir}\"\noutput_dir = \"{output_dir}\"\n\n[data]\n# Replace the embedded tables (JSON):\n# overrides = \"data/lms_overrides.json\"\n# item_names = \"data/lms_item_names.json\"\n\n[generate]\ntemplate = \"{DEFAULT_TEMPLATE_NAME}\"\n# abort: stop at the first failing item; skip: report it and continue\non_error = \"abort\"\n",
    )
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> Result<(PathBuf, ValueSource)>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return Ok((absolutize(path, &context.cwd), ValueSource::Flag));
    }

    if let Some(value) = lookup_env("LMSWIKI_PROJECT_ROOT") {
        return Ok((
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        ));
    }

    let root = detect_project_root_heuristic(&context.cwd, context.executable_dir.as_deref());
    Ok((root, ValueSource::Heuristic))
}

fn detect_project_root_heuristic(cwd: &Path, executable_dir: Option<&Path>) -> PathBuf {
    let mut seen = HashSet::new();
    for candidate in candidate_roots(cwd, executable_dir) {
        let key = normalize_for_display(&candidate);
        if !seen.insert(key) {
            continue;
        }
        if candidate.join(STATE_DIR_NAME).exists() {
            return candidate;
        }
    }
    cwd.to_path_buf()
}

fn candidate_roots(cwd: &Path, executable_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut out = ancestors(cwd);
    if let Some(exe_dir) = executable_dir {
        out.extend(ancestors(exe_dir));
    }
    out
}

fn ancestors(path: &Path) -> Vec<PathBuf> {
    path.ancestors().map(Path::to_path_buf).collect()
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn absolutize_from_project(path: &Path, project_root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

fn write_text_file(path: &Path, content: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn display_optional(path: Option<&Path>) -> String {
    path.map(normalize_for_display)
        .unwrap_or_else(|| "<embedded>".to_string())
}
