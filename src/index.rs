//! Path index: every document in the tree, keyed by filename stem.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Error;
use crate::paths;

/// Immutable map from filename stem to the documents sharing it.
///
/// Built once per run from a full walk. Candidate lists are sorted so that
/// tie-breaking never depends on filesystem enumeration order.
#[derive(Debug, Default)]
pub struct PathIndex {
    /// Stem to sorted tree-relative paths.
    by_stem: BTreeMap<String, Vec<PathBuf>>,
    /// Every indexed document, tree-relative.
    documents: BTreeSet<PathBuf>,
}

impl PathIndex {
    /// Walk `root` recursively and index every document file.
    /// Hidden directories (`.git`, `.obsidian`, ...) are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Walk` on any traversal failure. A partial index is
    /// never returned.
    pub fn build(root: &Path) -> Result<Self, Error> {
        let mut found = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !path.to_str().is_some_and(paths::has_document_extension) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            found.push(relative);
        }

        let index = Self::from_paths(found);
        tracing::debug!(documents = index.len(), stems = index.by_stem.len(), "built path index");
        Ok(index)
    }

    /// Documents sharing `stem`, sorted. Empty when the stem is unknown.
    pub fn candidates(&self, stem: &str) -> &[PathBuf] {
        self.by_stem.get(stem).map(Vec::as_slice).unwrap_or_default()
    }

    /// True when `path` (tree-relative, with extension) is an indexed document.
    pub fn contains(&self, path: &Path) -> bool {
        self.documents.contains(path)
    }

    /// Every indexed document, in sorted order.
    pub fn documents(&self) -> impl Iterator<Item = &PathBuf> {
        self.documents.iter()
    }

    /// Find the document for an extension-less tree-relative path.
    pub fn find_document(&self, without_extension: &Path) -> Option<PathBuf> {
        paths::DOCUMENT_EXTENSIONS
            .iter()
            .map(|ext| {
                // `with_extension` would eat the `.2` of a stem like `v1.2`.
                let mut name = without_extension.as_os_str().to_owned();
                name.push(".");
                name.push(ext);
                PathBuf::from(name)
            })
            .find(|candidate| self.documents.contains(candidate))
    }

    /// Build an index from already-relative document paths.
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut index = Self::default();
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            index.by_stem.entry(stem.to_string()).or_default().push(path.clone());
            index.documents.insert(path);
        }
        for candidates in index.by_stem.values_mut() {
            candidates.sort();
            candidates.dedup();
        }
        index
    }

    /// True when more than one document has this stem.
    pub fn is_ambiguous(&self, stem: &str) -> bool {
        self.candidates(stem).len() > 1
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Dot-prefixed names are tool metadata, not content.
fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
