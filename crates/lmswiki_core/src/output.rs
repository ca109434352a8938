use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{VariantError, VariantResult};

pub const PAGE_EXTENSION: &str = "wikitext";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWrite {
    pub title: String,
    pub path: PathBuf,
    pub content_hash: String,
    pub bytes: usize,
    /// False when an identical file was already on disk.
    pub changed: bool,
    pub written: bool,
}

pub trait PageSink {
    fn write_page(&mut self, title: &str, content: &str) -> Result<PageWrite>;
}

/// Writes `<output_dir>/<title>.wikitext`, creating the directory on first use.
#[derive(Debug, Clone)]
pub struct FsPageWriter {
    output_dir: PathBuf,
}

impl FsPageWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl PageSink for FsPageWriter {
    fn write_page(&mut self, title: &str, content: &str) -> Result<PageWrite> {
        let path = page_path(&self.output_dir, title)?;
        let content_hash = compute_hash(content);
        let changed = differs_from_disk(&path, &content_hash);

        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("failed to create {}", self.output_dir.display()))?;
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;

        Ok(PageWrite {
            title: title.to_string(),
            path,
            content_hash,
            bytes: content.len(),
            changed,
            written: true,
        })
    }
}

/// Renders without touching the filesystem.
#[derive(Debug, Clone)]
pub struct DryRunSink {
    output_dir: PathBuf,
}

impl DryRunSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl PageSink for DryRunSink {
    fn write_page(&mut self, title: &str, content: &str) -> Result<PageWrite> {
        let path = page_path(&self.output_dir, title)?;
        let content_hash = compute_hash(content);
        let changed = differs_from_disk(&path, &content_hash);
        Ok(PageWrite {
            title: title.to_string(),
            path,
            content_hash,
            bytes: content.len(),
            changed,
            written: false,
        })
    }
}

/// The page title is the file name verbatim; only titles that cannot name a
/// single file are refused.
pub fn page_path(output_dir: &Path, title: &str) -> VariantResult<PathBuf> {
    validate_title(title)?;
    Ok(output_dir.join(format!("{title}.{PAGE_EXTENSION}")))
}

pub fn validate_title(title: &str) -> VariantResult<()> {
    let unusable = title.trim().is_empty()
        || title == "."
        || title == ".."
        || title.contains(['/', '\\', '\0']);
    if unusable {
        return Err(VariantError::InvalidTitle {
            title: title.to_string(),
        });
    }
    Ok(())
}

/// Titles of `.wikitext` pages already present in `output_dir`, sorted.
pub fn list_generated_pages(output_dir: &Path) -> Result<Vec<String>> {
    if !output_dir.exists() {
        return Ok(Vec::new());
    }
    let mut titles = Vec::new();
    for entry in WalkDir::new(output_dir).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("failed to read {}", output_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(PAGE_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            titles.push(stem.to_string());
        }
    }
    titles.sort();
    Ok(titles)
}

fn differs_from_disk(path: &Path, content_hash: &str) -> bool {
    match fs::read_to_string(path) {
        Ok(existing) => compute_hash(&existing) != content_hash,
        Err(_) => true,
    }
}

pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{
        DryRunSink, FsPageWriter, PageSink, list_generated_pages, page_path, validate_title,
    };
    use crate::error::VariantError;

    #[test]
    fn page_path_keeps_title_punctuation() {
        let path = page_path(
            std::path::Path::new("page_outputs"),
            "Inquisitor's mace (Last Man Standing)",
        )
        .expect("path");
        assert_eq!(
            path,
            std::path::Path::new("page_outputs")
                .join("Inquisitor's mace (Last Man Standing).wikitext")
        );
    }

    #[test]
    fn titles_that_cannot_be_file_names_are_rejected() {
        for title in ["", " ", ".", "..", "Bolts 1/2", "a\\b", "nul\0byte"] {
            assert_eq!(
                validate_title(title),
                Err(VariantError::InvalidTitle {
                    title: title.to_string()
                })
            );
        }
        assert!(validate_title("Rangers' tunic (Last Man Standing)").is_ok());
    }

    #[test]
    fn writer_creates_directory_and_reports_changes() {
        let temp = tempdir().expect("tempdir");
        let output_dir = temp.path().join("page_outputs");
        let mut writer = FsPageWriter::new(&output_dir);

        let first = writer
            .write_page("Tome of fire (Last Man Standing)", "page body")
            .expect("first write");
        assert!(first.changed);
        assert!(first.written);
        assert_eq!(
            fs::read_to_string(&first.path).expect("read back"),
            "page body"
        );

        let second = writer
            .write_page("Tome of fire (Last Man Standing)", "page body")
            .expect("second write");
        assert!(!second.changed);
        assert_eq!(first.content_hash, second.content_hash);

        let third = writer
            .write_page("Tome of fire (Last Man Standing)", "edited body")
            .expect("third write");
        assert!(third.changed);
    }

    #[test]
    fn dry_run_never_writes() {
        let temp = tempdir().expect("tempdir");
        let output_dir = temp.path().join("page_outputs");
        let mut sink = DryRunSink::new(&output_dir);
        let report = sink
            .write_page("Unholy book (Last Man Standing)", "body")
            .expect("dry run");
        assert!(!report.written);
        assert!(!output_dir.exists());
    }

    #[test]
    fn list_generated_pages_returns_sorted_titles() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("Zamorak halo (Last Man Standing).wikitext"), "z").expect("write");
        fs::write(dir.join("Guthix halo (Last Man Standing).wikitext"), "g").expect("write");
        fs::write(dir.join("notes.txt"), "ignored").expect("write");
        fs::create_dir_all(dir.join("nested")).expect("mkdir");

        let titles = list_generated_pages(dir).expect("list");
        assert_eq!(
            titles,
            vec![
                "Guthix halo (Last Man Standing)".to_string(),
                "Zamorak halo (Last Man Standing)".to_string(),
            ]
        );
        assert!(
            list_generated_pages(&dir.join("missing"))
                .expect("missing dir")
                .is_empty()
        );
    }
}
