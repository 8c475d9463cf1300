//! Batch runner: index the tree once, then scan, resolve, and rewrite each document.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::index::PathIndex;
use crate::overrides::OverrideTable;
use crate::paths;
use crate::resolver::Resolver;
use crate::rewriter::{self, RewriteOptions};
use crate::scanner;
use crate::types::{LinkRef, Resolution, TargetKind};

/// Same-document anchor with no matching heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorWarning {
    /// Document containing the link.
    pub file: PathBuf,
    /// Fragment as written, without `#`.
    pub fragment: String,
    /// One-based line of the link.
    pub line: u32,
}

/// Everything learned about one document.
#[derive(Debug, Default)]
struct DocumentOutcome {
    /// Ambiguous resolutions.
    ambiguous: u32,
    /// Anchors without a heading.
    anchors: Vec<(u32, String)>,
    /// New text differs from the old.
    changed: bool,
    /// Links stripped by removal overrides.
    removed: u32,
    /// Links rewritten.
    rewritten: u32,
    /// `(line, raw target)` of links left unresolved.
    unresolved: Vec<(u32, String)>,
}

/// A document that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Offending document.
    pub file: PathBuf,
    /// Error message.
    pub reason: String,
}

/// Knobs for one batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Validate same-document anchors against headings.
    pub check_anchors: bool,
    /// Compute everything, write nothing.
    pub dry_run: bool,
    /// How resolved links are rendered.
    pub rewrite: RewriteOptions,
}

/// Aggregate results of a run, printed or serialized for CI.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    /// Links resolved through an ambiguous stem.
    pub ambiguous: u32,
    /// Same-document anchors with no matching heading.
    pub anchor_warnings: Vec<AnchorWarning>,
    /// Number of entries in `anchor_warnings`.
    pub broken_anchors: u32,
    /// Nothing was written.
    pub dry_run: bool,
    /// Documents skipped because of an error.
    pub failures: Vec<Failure>,
    /// Documents whose content changed (or would change, in a dry run).
    pub files_modified: u32,
    /// Documents examined.
    pub files_scanned: u32,
    /// Links stripped by removal overrides.
    pub links_removed: u32,
    /// Links rewritten to a new target or notation.
    pub links_rewritten: u32,
    /// Links left untouched because nothing matched.
    pub links_unresolved: u32,
    /// Paths of modified documents, in processing order.
    pub modified: Vec<PathBuf>,
    /// Every unresolved link.
    pub unresolved: Vec<UnresolvedLink>,
}

impl Summary {
    /// Fold one document's outcome into the totals.
    fn record(&mut self, file: &Path, outcome: DocumentOutcome) {
        self.ambiguous = self.ambiguous.saturating_add(outcome.ambiguous);
        self.links_removed = self.links_removed.saturating_add(outcome.removed);
        self.links_rewritten = self.links_rewritten.saturating_add(outcome.rewritten);
        if outcome.changed {
            self.files_modified = self.files_modified.saturating_add(1);
            self.modified.push(file.to_path_buf());
        }
        for (line, target) in outcome.unresolved {
            self.links_unresolved = self.links_unresolved.saturating_add(1);
            self.unresolved.push(UnresolvedLink { file: file.to_path_buf(), line, target });
        }
        for (line, fragment) in outcome.anchors {
            self.broken_anchors = self.broken_anchors.saturating_add(1);
            self.anchor_warnings.push(AnchorWarning { file: file.to_path_buf(), fragment, line });
        }
    }
}

/// A link that matched no document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedLink {
    /// Document containing the link.
    pub file: PathBuf,
    /// One-based line of the link.
    pub line: u32,
    /// Target as written.
    pub target: String,
}

/// Anchors in `links` that match no heading of `text`.
fn check_anchors(text: &str, links: &[LinkRef]) -> Vec<(u32, String)> {
    let slugs = scanner::heading_slugs(text);
    links
        .iter()
        .filter_map(|link| {
            let TargetKind::SameDocAnchor(anchor) = link.target_kind() else {
                return None;
            };
            if anchor.is_empty() || slugs.contains(&anchor) || slugs.contains(&scanner::slugify(&anchor)) {
                return None;
            }
            Some((link.line, anchor))
        })
        .collect()
}

/// Read, rewrite, and (unless dry-running) write back one document.
///
/// # Errors
///
/// Returns `Error::Io` if the document cannot be read or written, or
/// `Error::InvalidUtf8` if it is not text.
fn process_document(root: &Path, document: &Path, resolver: &Resolver<'_>, options: &RunOptions) -> Result<DocumentOutcome, Error> {
    let disk_path = root.join(document);
    let bytes = std::fs::read(&disk_path)?;
    let text = String::from_utf8(bytes).map_err(|_err| Error::InvalidUtf8 { path: document.to_path_buf() })?;

    let links: Vec<LinkRef> = scanner::scan(&text).collect();
    let mut outcome = DocumentOutcome::default();
    let mut edits = Vec::with_capacity(links.len());

    for link in &links {
        let Some(resolution) = resolver.resolve_link(document, link) else {
            continue;
        };
        match &resolution {
            Resolution::Resolved { ambiguous: true, .. } => outcome.ambiguous = outcome.ambiguous.saturating_add(1),
            Resolution::Unresolved => {
                tracing::warn!(file = %document.display(), line = link.line, link = %link.raw_target, "unresolved link");
                outcome.unresolved.push((link.line, link.raw_target.clone()));
            },
            Resolution::Removed { .. } | Resolution::Resolved { .. } => {},
        }
        edits.push((link.clone(), resolution));
    }

    if options.check_anchors {
        outcome.anchors = check_anchors(&text, &links);
        for (line, anchor) in &outcome.anchors {
            tracing::warn!(file = %document.display(), line, anchor = %anchor, "anchor matches no heading");
        }
    }

    let rewritten = rewriter::rewrite(&text, document, &edits, resolver.index(), &options.rewrite);
    outcome.removed = rewritten.removed;
    outcome.rewritten = rewritten.rewritten;
    outcome.changed = rewritten.text != text;

    if outcome.changed {
        if options.dry_run {
            tracing::info!(file = %document.display(), links = rewritten.rewritten, removed = rewritten.removed, "would rewrite");
        } else {
            std::fs::write(&disk_path, &rewritten.text)?;
            tracing::info!(file = %document.display(), links = rewritten.rewritten, removed = rewritten.removed, "rewrote");
        }
    }
    Ok(outcome)
}

/// Run the whole batch over `root`.
///
/// Per-document failures are logged and collected in the summary; they never
/// abort the batch.
///
/// # Errors
///
/// Returns `Error::RootNotFound` if `root` is not a directory, or
/// `Error::Walk` if the tree cannot be fully indexed.
pub fn run(root: &Path, config: &Config, overrides: &OverrideTable, options: &RunOptions) -> Result<Summary, Error> {
    if !root.is_dir() {
        return Err(Error::RootNotFound { path: root.to_path_buf() });
    }

    let index = PathIndex::build(root)?;
    let resolver = Resolver::new(&index, overrides, options.rewrite.wikilink_style);
    let mut summary = Summary { dry_run: options.dry_run, ..Summary::default() };

    for document in index.documents() {
        if !config.should_rewrite(&paths::to_slash(document)) {
            tracing::debug!(file = %document.display(), "excluded");
            continue;
        }
        summary.files_scanned = summary.files_scanned.saturating_add(1);
        match process_document(root, document, &resolver, options) {
            Ok(outcome) => summary.record(document, outcome),
            Err(e) => {
                tracing::warn!(file = %document.display(), error = %e, "skipping document");
                summary.failures.push(Failure { file: document.clone(), reason: e.to_string() });
            },
        }
    }

    tracing::info!(
        scanned = summary.files_scanned,
        modified = summary.files_modified,
        rewritten = summary.links_rewritten,
        unresolved = summary.links_unresolved,
        "batch complete"
    );
    Ok(summary)
}
