//! Summary rendering for humans (markdown) and CI (JSON).

use std::fmt::Write as _;

use crate::error::Error;
use crate::runner::Summary;

/// Output format of the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// One JSON object on stdout.
    Json,
    /// Markdown report on stdout.
    #[default]
    Text,
}

/// Render the summary in the requested format.
///
/// # Errors
///
/// Returns `Error::Json` if JSON serialization fails.
pub fn render(summary: &Summary, format: ReportFormat) -> Result<String, Error> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        ReportFormat::Text => Ok(render_text(summary)),
    }
}

/// Markdown report: counts first, then the lists a human needs to triage.
pub fn render_text(summary: &Summary) -> String {
    let mut out = String::new();
    let heading = if summary.dry_run { "## Summary (dry run)" } else { "## Summary" };
    let modified_label = if summary.dry_run { "Files that would change" } else { "Files modified" };

    let _ = writeln!(out, "{heading}\n");
    let _ = writeln!(out, "- Files scanned: {}", summary.files_scanned);
    let _ = writeln!(out, "- {modified_label}: {}", summary.files_modified);
    let _ = writeln!(out, "- Links rewritten: {}", summary.links_rewritten);
    let _ = writeln!(out, "- Links removed: {}", summary.links_removed);
    let _ = writeln!(out, "- Links unresolved: {}", summary.links_unresolved);
    let _ = writeln!(out, "- Ambiguous targets: {}", summary.ambiguous);
    if summary.broken_anchors > 0 {
        let _ = writeln!(out, "- Broken anchors: {}", summary.broken_anchors);
    }

    if !summary.modified.is_empty() {
        let _ = writeln!(out, "\n## {modified_label}\n");
        for path in &summary.modified {
            let _ = writeln!(out, "- {}", path.display());
        }
    }

    if !summary.unresolved.is_empty() {
        out.push_str("\n## Unresolved\n\n");
        for link in &summary.unresolved {
            let _ = writeln!(out, "- {}:{}  `{}`", link.file.display(), link.line, link.target);
        }
    }

    if !summary.anchor_warnings.is_empty() {
        out.push_str("\n## Broken anchors\n\n");
        for warning in &summary.anchor_warnings {
            let _ = writeln!(out, "- {}:{}  `#{}`", warning.file.display(), warning.line, warning.fragment);
        }
    }

    if !summary.failures.is_empty() {
        out.push_str("\n## Failed\n\n");
        for failure in &summary.failures {
            let _ = writeln!(out, "- {}  ({})", failure.file.display(), failure.reason);
        }
    }

    out
}
