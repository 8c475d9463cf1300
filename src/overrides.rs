//! Override table: hand-maintained corrections for historical renames and deletions.
//!
//! ```toml
//! [rewrite]
//! institutional-memory = "learn/core-concepts/institutional-memory.md"
//!
//! [removed]
//! old-page = "file deleted"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::paths;

/// What an override entry says about an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideTarget {
    /// Strip the link and keep its text.
    Removed {
        /// Human-readable reason.
        reason: String,
    },
    /// Point the link at this tree-relative document.
    Rewrite(PathBuf),
}

/// Identifier-to-target corrections, consulted before the path index.
/// Passed explicitly to the resolver; there is no global table.
#[derive(Debug, Default)]
pub struct OverrideTable {
    /// Normalized identifier (no extension, no leading `./` or `/`) to target.
    entries: BTreeMap<String, OverrideTarget>,
}

/// Raw TOML structure of an override file.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideFile {
    /// Identifier to removal reason.
    #[serde(default)]
    removed: BTreeMap<String, String>,
    /// Identifier to tree-relative path.
    #[serde(default)]
    rewrite: BTreeMap<String, String>,
}

impl OverrideTable {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Read an override file from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::OverridesNotFound` if the file is missing, `Error::Io`
    /// for other read failures, `Error::TomlDe` for malformed TOML, or
    /// `Error::OverrideConflict` when a key is both rewritten and removed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::OverridesNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let table = Self::parse(&content, path)?;
        tracing::debug!(entries = table.len(), file = %path.display(), "loaded override table");
        Ok(table)
    }

    /// Find the entry for `identifier`: exact match first, then the longest
    /// key that is a suffix of the identifier on a `/` boundary.
    /// Returns the matching key alongside its target.
    pub fn lookup(&self, identifier: &str) -> Option<(&str, &OverrideTarget)> {
        let identifier = normalize_key(identifier);
        if let Some((key, target)) = self.entries.get_key_value(&identifier) {
            return Some((key.as_str(), target));
        }
        self.entries
            .iter()
            .filter(|(key, _)| is_segment_suffix(&identifier, key))
            .max_by_key(|(key, _)| key.len())
            .map(|(key, target)| (key.as_str(), target))
    }

    /// Parse override TOML. `file` is only used for error context.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` for malformed TOML, `Error::OverrideConflict`
    /// when a key appears in both tables, or `Error::OverrideChain` when a
    /// rewrite destination is matched by another entry.
    pub fn parse(content: &str, file: &Path) -> Result<Self, Error> {
        let raw: OverrideFile =
            toml::from_str(content).map_err(|source| Error::TomlDe { file: file.to_path_buf(), source })?;

        let mut table = Self::default();
        for (key, target) in raw.rewrite {
            table = table.with_rewrite(&key, &target);
        }
        for (key, reason) in raw.removed {
            let normalized = normalize_key(&key);
            if table.entries.contains_key(&normalized) {
                return Err(Error::OverrideConflict { file: file.to_path_buf(), key });
            }
            table = table.with_removed(&key, &reason);
        }
        table.reject_chains(file)?;
        Ok(table)
    }

    /// Every rewrite destination must be final: if another entry matched it,
    /// the next run would rewrite the already-rewritten link again.
    ///
    /// # Errors
    ///
    /// Returns `Error::OverrideChain` naming the first offending pair.
    fn reject_chains(&self, file: &Path) -> Result<(), Error> {
        for (key, target) in &self.entries {
            let OverrideTarget::Rewrite(path) = target else {
                continue;
            };
            let destination = normalize_key(&paths::to_slash(path));
            let Some((next, next_target)) = self.lookup(&destination) else {
                continue;
            };
            // Matching an entry with the same destination is stable.
            if next_target != target {
                return Err(Error::OverrideChain {
                    destination,
                    file: file.to_path_buf(),
                    key: key.clone(),
                    next: next.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Add a removal entry.
    #[must_use]
    pub fn with_removed(mut self, key: &str, reason: &str) -> Self {
        self.entries.insert(normalize_key(key), OverrideTarget::Removed { reason: reason.to_string() });
        self
    }

    /// Add a rewrite entry. `target` is tree-relative; `.md` is appended when
    /// it has no document extension.
    #[must_use]
    pub fn with_rewrite(mut self, key: &str, target: &str) -> Self {
        let cleaned = paths::clean_target(target);
        let cleaned = cleaned.trim_start_matches('/');
        let path = if paths::has_document_extension(cleaned) {
            PathBuf::from(cleaned)
        } else {
            PathBuf::from(format!("{cleaned}.md"))
        };
        self.entries.insert(normalize_key(key), OverrideTarget::Rewrite(paths::normalize_path(&path)));
        self
    }
}

/// True when `key` ends `identifier` right after a `/`.
fn is_segment_suffix(identifier: &str, key: &str) -> bool {
    identifier
        .strip_suffix(key)
        .is_some_and(|head| head.ends_with('/'))
}

/// Canonical form used for keys and lookups.
fn normalize_key(raw: &str) -> String {
    let cleaned = paths::clean_target(raw);
    let cleaned = cleaned.trim_start_matches('/');
    paths::strip_document_extension(cleaned).to_string()
}
