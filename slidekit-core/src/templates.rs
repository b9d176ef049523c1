//! On-disk template store.
//!
//! # Storage layout
//!
//! ```text
//! <templates_root>/
//!   <template_id>/
//!     preview.md        (static preview text)
//!     blocks.json       (block definitions: array, or object of id → block)
//!     slides/
//!       *.tera          (macro fragments, one per block-defining file)
//! ```
//!
//! The store is read-only: templates are authored elsewhere and never written
//! by slidekit.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{io_err, TemplateError};
use crate::types::{Block, TemplateId};

pub const PREVIEW_FILE: &str = "preview.md";
pub const BLOCKS_FILE: &str = "blocks.json";
pub const SLIDES_DIR: &str = "slides";
pub const MACRO_EXTENSION: &str = "tera";

/// One macro-definition file of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroFragment {
    /// File name, e.g. `title.tera`.
    pub name: String,
    pub source: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BlocksFile {
    List(Vec<Block>),
    /// Keyed by block id; entries keep their order in the file.
    Map(IndexMap<String, Block>),
}

/// Read access to a directory of slide templates.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<id>/`: validates the id, no I/O.
    pub fn template_dir(&self, id: &TemplateId) -> Result<PathBuf, TemplateError> {
        validate_id(id)?;
        Ok(self.root.join(&id.0))
    }

    /// Names of all template directories, sorted. Missing root → empty list.
    pub fn list(&self) -> Result<Vec<TemplateId>, TemplateError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut ids: Vec<TemplateId> = std::fs::read_dir(&self.root)
            .map_err(|e| io_err(&self.root, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| TemplateId::from(e.file_name().to_string_lossy().into_owned()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Static preview text of a template.
    pub fn preview(&self, id: &TemplateId) -> Result<String, TemplateError> {
        let path = self.existing_dir(id)?.join(PREVIEW_FILE);
        if !path.is_file() {
            return Err(TemplateError::AssetNotFound { path });
        }
        std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))
    }

    /// Block definitions of a template, in file order.
    pub fn blocks(&self, id: &TemplateId) -> Result<Vec<Block>, TemplateError> {
        let path = self.existing_dir(id)?.join(BLOCKS_FILE);
        if !path.is_file() {
            return Err(TemplateError::AssetNotFound { path });
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let parsed: BlocksFile = serde_json::from_str(&contents)
            .map_err(|source| TemplateError::Parse { path, source })?;
        Ok(match parsed {
            BlocksFile::List(blocks) => blocks,
            BlocksFile::Map(map) => map.into_values().collect(),
        })
    }

    /// Macro fragments under `slides/`, sorted by file name.
    ///
    /// Only `*.tera` files are read; anything else in the directory is ignored.
    pub fn macro_fragments(&self, id: &TemplateId) -> Result<Vec<MacroFragment>, TemplateError> {
        let dir = self.existing_dir(id)?.join(SLIDES_DIR);
        if !dir.is_dir() {
            return Err(TemplateError::AssetNotFound { path: dir });
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| io_err(&dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension().and_then(|s| s.to_str()) == Some(MACRO_EXTENSION)
            })
            .collect();
        files.sort();

        let mut fragments = Vec::with_capacity(files.len());
        for path in files {
            let source = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            fragments.push(MacroFragment { name, source });
        }
        tracing::debug!(template = %id, count = fragments.len(), "loaded macro fragments");
        Ok(fragments)
    }

    fn existing_dir(&self, id: &TemplateId) -> Result<PathBuf, TemplateError> {
        let dir = self.template_dir(id)?;
        if !dir.is_dir() {
            return Err(TemplateError::TemplateNotFound {
                id: id.0.clone(),
                path: dir,
            });
        }
        Ok(dir)
    }
}

fn validate_id(id: &TemplateId) -> Result<(), TemplateError> {
    let s = id.0.as_str();
    if s.trim().is_empty() || s == "." || s == ".." || s.contains(['/', '\\']) {
        return Err(TemplateError::InvalidId(s.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
