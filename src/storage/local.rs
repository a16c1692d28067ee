//! Local document store
//!
//! Documents live flat in one directory as `{slug}.md`. Files starting
//! with `_` or `.` and `README.md` are never treated as documents.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::markdown::{parse_document, render_document};
use crate::domain::Document;

/// File extension of documents (without the dot)
pub const DOCUMENT_EXTENSION: &str = "md";

const README: &str = "README.md";

/// A document together with the file it was read from
#[derive(Debug, Clone)]
pub struct LocalDocument {
    pub path: PathBuf,
    pub document: Document,
}

impl LocalDocument {
    /// File name without extension
    pub fn stem(&self) -> &str {
        file_stem(&self.path)
    }
}

/// A document file that could not be read or parsed
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

impl ScanFailure {
    pub fn stem(&self) -> &str {
        file_stem(&self.path)
    }
}

/// Result of reading every document in the store
#[derive(Debug, Default)]
pub struct Scan {
    pub documents: Vec<LocalDocument>,
    pub failures: Vec<ScanFailure>,
}

fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
}

/// Returns true if a directory entry name is a document file
pub fn is_document_name(name: &str) -> bool {
    name.ends_with(&format!(".{}", DOCUMENT_EXTENSION))
        && !name.starts_with('_')
        && !name.starts_with('.')
        && name != README
}

/// Returns true if `stem` names a file directly inside the store directory
pub fn is_safe_stem(stem: &str) -> bool {
    !stem.is_empty() && stem != "." && stem != ".." && !stem.contains(['/', '\\'])
}

/// Store for documents as markdown files
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Creates a store over the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory containing document files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path a document with this slug is stored at
    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", slug, DOCUMENT_EXTENSION))
    }

    /// Checks if a document file exists for the slug
    pub fn exists(&self, slug: &str) -> bool {
        self.path_for(slug).is_file()
    }

    /// Creates the directory if it is missing
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))
    }

    /// Lists document files, non-recursively, in directory order
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            self.ensure_dir()?;
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?
        {
            let entry = entry.context("Failed to read directory entry")?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if is_document_name(name) && entry.path().is_file() {
                paths.push(entry.path());
            }
        }

        Ok(paths)
    }

    /// Reads and parses one document file
    pub fn read(&self, path: &Path) -> Result<LocalDocument> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;

        let document = parse_document(&content, file_stem(path))
            .with_context(|| format!("Failed to parse document: {}", path.display()))?;

        Ok(LocalDocument {
            path: path.to_path_buf(),
            document,
        })
    }

    /// Reads every document, collecting unreadable files separately
    pub fn scan(&self) -> Result<Scan> {
        let mut scan = Scan::default();

        for path in self.list()? {
            match self.read(&path) {
                Ok(doc) => scan.documents.push(doc),
                Err(error) => scan.failures.push(ScanFailure { path, error }),
            }
        }

        Ok(scan)
    }

    /// Writes raw content to a document file atomically (temp file + rename)
    pub fn write_raw(&self, slug: &str, content: &str) -> Result<PathBuf> {
        self.ensure_dir()?;

        let path = self.path_for(slug);
        let temp_path = path.with_extension("md.tmp");

        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(path)
    }

    /// Renders and writes a document to `{slug}.md`
    pub fn write(&self, document: &Document) -> Result<PathBuf> {
        self.write_raw(&document.slug, &render_document(document))
    }

    /// Removes the document file for a slug
    pub fn remove(&self, slug: &str) -> Result<bool> {
        let path = self.path_for(slug);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove document: {}", path.display()))?;

        Ok(true)
    }
}
