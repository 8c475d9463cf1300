//! Target resolution: raw link target plus source location to a destination document.
//!
//! Priority order:
//! 1. override table (exact, then segment-aligned suffix)
//! 2. exact document at the written path (wikilink paths are read the way
//!    the configured wikilink style writes them)
//! 3. filename stem lookup, with a deterministic tie-break when ambiguous

use std::path::{Component, Path, PathBuf};

use crate::index::PathIndex;
use crate::overrides::{OverrideTable, OverrideTarget};
use crate::paths;
use crate::types::{LinkRef, Notation, Resolution, TargetKind, WikilinkStyle};

/// Resolves link targets against a path index and an override table.
/// Holds only shared borrows; one resolver serves a whole run.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    /// Documents in the tree.
    index: &'a PathIndex,
    /// Explicit corrections, consulted first.
    overrides: &'a OverrideTable,
    /// Decides whether wikilink paths are tried from the tree root first.
    wikilink_style: WikilinkStyle,
}

impl<'a> Resolver<'a> {
    /// Path index this resolver reads from.
    pub const fn index(&self) -> &'a PathIndex {
        self.index
    }

    /// Create a resolver over a built index and a loaded override table.
    /// `wikilink_style` is the style wikilinks in the tree are written in.
    pub const fn new(index: &'a PathIndex, overrides: &'a OverrideTable, wikilink_style: WikilinkStyle) -> Self {
        Self { index, overrides, wikilink_style }
    }

    /// Resolve a document target written in `notation` inside `source`.
    ///
    /// `source` is tree-relative. `target` is the path portion of the link with
    /// the fragment already split off into `fragment`.
    pub fn resolve(&self, source: &Path, notation: Notation, target: &str, fragment: Option<&str>) -> Resolution {
        let cleaned = paths::clean_target(target);
        let identifier = paths::strip_document_extension(&cleaned);
        if identifier.is_empty() || identifier.ends_with('/') {
            return Resolution::Unresolved;
        }
        let source_dir = source.parent().unwrap_or_else(|| Path::new(""));
        let root_first = notation == Notation::Wikilink && self.wikilink_style == WikilinkStyle::Root;
        let exact = exact_candidates(source_dir, notation, identifier, root_first);
        let fragment = fragment.map(str::to_string);

        let override_id = exact.first().map_or_else(|| strip_climbing(identifier), |p| paths::to_slash(p));
        if let Some((key, entry)) = self.overrides.lookup(&override_id) {
            return self.apply_override(source, key, entry, fragment);
        }

        if let Some(path) = exact.iter().find_map(|candidate| self.index.find_document(candidate)) {
            tracing::debug!(source = %source.display(), link = target, resolved = %path.display(), "exact path");
            return Resolution::Resolved { ambiguous: false, fragment, path };
        }

        let stem = identifier.rsplit('/').next().unwrap_or(identifier);
        let candidates = self.index.candidates(stem);
        match candidates {
            [] => {
                tracing::debug!(source = %source.display(), link = target, "no document matches");
                Resolution::Unresolved
            },
            [only] => Resolution::Resolved { ambiguous: false, fragment, path: only.clone() },
            many => {
                let Some(path) = choose_ambiguous_target(source_dir, identifier, many) else {
                    return Resolution::Unresolved;
                };
                tracing::warn!(
                    source = %source.display(),
                    link = target,
                    chosen = %path.display(),
                    candidates = %many.iter().map(|c| paths::to_slash(c)).collect::<Vec<_>>().join(", "),
                    "ambiguous link target"
                );
                Resolution::Resolved { ambiguous: true, fragment, path }
            },
        }
    }

    /// Resolve a scanned link. Returns `None` for anything that is not a
    /// document reference (external, anchor, embed, asset).
    pub fn resolve_link(&self, source: &Path, link: &LinkRef) -> Option<Resolution> {
        let TargetKind::Document { fragment, path } = link.target_kind() else {
            return None;
        };
        Some(self.resolve(source, link.notation, &path, fragment.as_deref()))
    }

    /// Turn an override hit into a resolution.
    fn apply_override(&self, source: &Path, key: &str, entry: &OverrideTarget, fragment: Option<String>) -> Resolution {
        match entry {
            OverrideTarget::Removed { reason } => {
                tracing::debug!(source = %source.display(), key, reason, "override removes link");
                Resolution::Removed { reason: reason.clone() }
            },
            OverrideTarget::Rewrite(path) => {
                if !self.index.contains(path) {
                    tracing::warn!(
                        source = %source.display(),
                        key,
                        destination = %path.display(),
                        "override points at a document that does not exist"
                    );
                }
                Resolution::Resolved { ambiguous: false, fragment, path: path.clone() }
            },
        }
    }
}

/// Pick one of several same-stem documents.
///
/// Prefers the candidate whose trailing path segments match the most of the
/// written path, then the one sharing the longest directory prefix with the
/// source, then the lexicographically first. `candidates` arrive sorted.
fn choose_ambiguous_target(source_dir: &Path, identifier: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
    let written = strip_climbing(identifier);
    let written: Vec<&str> = written.split('/').collect();

    let score = |candidate: &PathBuf| {
        let bare = paths::to_slash(candidate);
        let trailing = paths::strip_document_extension(&bare)
            .rsplit('/')
            .zip(written.iter().rev())
            .take_while(|(a, b)| a == *b)
            .count();
        let parent = candidate.parent().unwrap_or_else(|| Path::new(""));
        (trailing, shared_prefix_len(source_dir, parent))
    };

    let best = candidates.iter().map(score).max()?;
    candidates.iter().find(|c| score(*c) == best).cloned()
}

/// Extension-less, tree-relative paths the written target could mean, in
/// priority order. Paths that climb above the root are dropped.
///
/// Markdown targets are source-relative unless they start with `/`. Wikilink
/// targets are read source-relative first, then from the root; with
/// `root_first` the order flips and bare names are tried at the root too.
fn exact_candidates(source_dir: &Path, notation: Notation, identifier: &str, root_first: bool) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(rooted) = identifier.strip_prefix('/') {
        out.push(paths::normalize_path(Path::new(rooted)));
    } else {
        let relative = paths::normalize_path(&source_dir.join(identifier));
        let rooted = paths::normalize_path(Path::new(identifier));
        match notation {
            Notation::Wikilink if root_first => out.extend([rooted, relative]),
            Notation::Wikilink if identifier.contains('/') => out.extend([relative, rooted]),
            Notation::Embed | Notation::Markdown | Notation::Wikilink => out.push(relative),
        }
    }
    out.retain(|p| !paths::escapes_root(p) && p.components().next().is_some());
    out.dedup();
    out
}

/// Number of leading components two directories share.
fn shared_prefix_len(a: &Path, b: &Path) -> usize {
    a.components().zip(b.components()).take_while(|(x, y)| x == y).count()
}

/// Written path without leading `/`, `./` or `../` segments.
fn strip_climbing(identifier: &str) -> String {
    let normalized = paths::normalize_path(Path::new(identifier));
    let kept: PathBuf = normalized
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    paths::to_slash(&kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PathIndex {
        PathIndex::from_paths(
            [
                "index.md",
                "a/b/doc.md",
                "a/c/target.md",
                "learn/index.md",
                "learn/core-concepts/institutional-memory.md",
                "learn/core-concepts/index.md",
                "teach/index.md",
            ]
            .map(PathBuf::from),
        )
    }

    fn resolved(path: &str) -> Resolution {
        Resolution::Resolved { ambiguous: false, fragment: None, path: PathBuf::from(path) }
    }

    #[test]
    fn relative_markdown_target_resolves_exactly() {
        let idx = index();
        let overrides = OverrideTable::default();
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        assert_eq!(r.resolve(Path::new("a/b/doc.md"), Notation::Markdown, "../c/target.md", None), resolved("a/c/target.md"));
    }

    #[test]
    fn stale_path_falls_back_to_stem() {
        let idx = index();
        let overrides = OverrideTable::default();
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let got = r.resolve(Path::new("a/b/doc.md"), Notation::Markdown, "../../old/institutional-memory.md", None);
        assert_eq!(got, resolved("learn/core-concepts/institutional-memory.md"));
    }

    #[test]
    fn wikilink_full_path_tries_root_after_source_dir() {
        let idx = index();
        let overrides = OverrideTable::default();
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let got = r.resolve(Path::new("a/b/doc.md"), Notation::Wikilink, "learn/core-concepts/institutional-memory", None);
        assert_eq!(got, resolved("learn/core-concepts/institutional-memory.md"));
    }

    #[test]
    fn root_style_reads_wikilinks_from_root_first() {
        let idx = PathIndex::from_paths(["learn/x.md", "sub/page.md", "learn/sub/page.md", "page.md", "learn/page.md"].map(PathBuf::from));
        let overrides = OverrideTable::default();
        let relative = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let root = Resolver::new(&idx, &overrides, WikilinkStyle::Root);
        let source = Path::new("learn/x.md");

        assert_eq!(relative.resolve(source, Notation::Wikilink, "sub/page", None), resolved("learn/sub/page.md"));
        assert_eq!(root.resolve(source, Notation::Wikilink, "sub/page", None), resolved("sub/page.md"));
        assert_eq!(root.resolve(source, Notation::Wikilink, "page", None), resolved("page.md"));
        // Markdown paths stay source-relative whatever the wikilink style.
        assert_eq!(root.resolve(source, Notation::Markdown, "sub/page.md", None), resolved("learn/sub/page.md"));
    }

    #[test]
    fn override_wins_over_index() {
        let idx = index();
        let overrides = OverrideTable::default().with_rewrite("target", "learn/index.md");
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let got = r.resolve(Path::new("a/b/doc.md"), Notation::Markdown, "../c/target.md", Some("top"));
        assert_eq!(
            got,
            Resolution::Resolved {
                ambiguous: false,
                fragment: Some("top".to_string()),
                path: PathBuf::from("learn/index.md"),
            }
        );
    }

    #[test]
    fn removal_sentinel() {
        let idx = index();
        let overrides = OverrideTable::default().with_removed("old-page", "file deleted");
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let got = r.resolve(Path::new("index.md"), Notation::Markdown, "old-page.md", None);
        assert_eq!(got, Resolution::Removed { reason: "file deleted".to_string() });
    }

    #[test]
    fn missing_everywhere_is_unresolved() {
        let idx = index();
        let overrides = OverrideTable::default();
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        assert_eq!(r.resolve(Path::new("index.md"), Notation::Wikilink, "totally-missing-doc", None), Resolution::Unresolved);
    }

    #[test]
    fn ambiguous_stem_prefers_nearest_directory() {
        let idx = index();
        let overrides = OverrideTable::default();
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let got = r.resolve(Path::new("learn/core-concepts/deep/page.md"), Notation::Wikilink, "index", None);
        assert_eq!(
            got,
            Resolution::Resolved {
                ambiguous: true,
                fragment: None,
                path: PathBuf::from("learn/core-concepts/index.md"),
            }
        );
    }

    #[test]
    fn ambiguous_stem_ties_break_lexicographically() {
        let idx = index();
        let overrides = OverrideTable::default();
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let got = r.resolve(Path::new("a/b/doc.md"), Notation::Wikilink, "index", None);
        assert_eq!(
            got,
            Resolution::Resolved { ambiguous: true, fragment: None, path: PathBuf::from("index.md") }
        );
    }

    #[test]
    fn written_path_suffix_narrows_ambiguity() {
        let idx = index();
        let overrides = OverrideTable::default();
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let got = r.resolve(Path::new("a/b/doc.md"), Notation::Markdown, "../../old/teach/index.md", None);
        assert_eq!(
            got,
            Resolution::Resolved { ambiguous: true, fragment: None, path: PathBuf::from("teach/index.md") }
        );
    }

    #[test]
    fn non_document_links_are_skipped() {
        let idx = index();
        let overrides = OverrideTable::default();
        let r = Resolver::new(&idx, &overrides, WikilinkStyle::Relative);
        let link = LinkRef {
            display: Some("Example".to_string()),
            line: 1,
            notation: Notation::Markdown,
            raw_target: "https://example.org".to_string(),
            span: 0..30,
        };
        assert_eq!(r.resolve_link(Path::new("index.md"), &link), None);
    }
}
