//! The set of text files that make up a generated site.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{BuildError, Result};

/// Entry point page served by static hosting.
pub const INDEX_HTML: &str = "index.html";
/// Repository readme.
pub const README_MD: &str = "README.md";
/// Licence file checked by the evaluator.
pub const LICENSE: &str = "LICENSE";

/// Files every generated site must contain.
pub const REQUIRED_FILES: [&str; 3] = [INDEX_HTML, README_MD, LICENSE];

/// Mapping from a repository-root filename to its UTF-8 content.
///
/// Names are validated on insertion so a set can never write outside the
/// working copy or into version-control metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFileSet {
    files: BTreeMap<String, String>,
}

impl GeneratedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) -> Result<()> {
        let name = name.into();
        if !is_safe_filename(&name) {
            return Err(BuildError::Validation(format!("unsafe filename: {name:?}")));
        }
        self.files.insert(name, content.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Names from [`REQUIRED_FILES`] that are absent.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_FILES
            .iter()
            .copied()
            .filter(|name| !self.files.contains_key(*name))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Write every file into `dir`, creating or overwriting as needed.
    pub async fn write_to(&self, dir: &Path) -> Result<()> {
        for (name, content) in &self.files {
            tokio::fs::write(dir.join(name), content).await?;
        }
        Ok(())
    }
}

/// A filename is safe when it names a plain entry at the repository root.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
        && !name.starts_with(".git")
}
