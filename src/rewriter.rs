//! Emits corrected document text from scanned links and their resolutions.

use std::path::Path;

use crate::index::PathIndex;
use crate::paths;
use crate::types::{LinkRef, OutputMode, Resolution, WikilinkStyle};

/// Per-run rendering choices.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteOptions {
    /// Follow stripped link text with a removal note.
    pub annotate_removed: bool,
    /// Notation for every resolved link.
    pub mode: OutputMode,
    /// Spelling of wikilink targets when `mode` is wikilink.
    pub wikilink_style: WikilinkStyle,
}

/// Result of rewriting one document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rewritten {
    /// Removed links whose markup was stripped.
    pub removed: u32,
    /// Resolved links whose text changed.
    pub rewritten: u32,
    /// The new document text.
    pub text: String,
}

/// Markup that should replace `link`, or `None` to keep the original bytes.
fn render(source: &Path, link: &LinkRef, resolution: &Resolution, index: &PathIndex, options: &RewriteOptions) -> Option<String> {
    match resolution {
        Resolution::Unresolved => None,
        Resolution::Removed { reason } => {
            let text = removed_text(link);
            if options.annotate_removed {
                Some(format!("{text} *(link removed: {reason})*"))
            } else {
                Some(text)
            }
        },
        Resolution::Resolved { fragment, path, .. } => {
            let source_dir = source.parent().unwrap_or_else(|| Path::new(""));
            let anchor = fragment.as_ref().map_or_else(String::new, |f| format!("#{f}"));
            match options.mode {
                OutputMode::Markdown => {
                    let relative = paths::to_slash(&paths::relative_path(source_dir, path));
                    Some(format!("[{}]({relative}{anchor})", link.display_or_target()))
                },
                OutputMode::Wikilink => {
                    let target = format!("{}{anchor}", wikilink_target(source_dir, path, index, options.wikilink_style));
                    let display = match link.display.as_deref() {
                        Some(display) => Some(display),
                        // A bare wikilink showed its written target; keep showing it once the path changes.
                        None if target != link.raw_target => link.raw_target.split('#').next(),
                        None => None,
                    };
                    let display = display.filter(|d| !d.is_empty() && *d != target);
                    Some(match display {
                        Some(display) => format!("[[{target}|{display}]]"),
                        None => format!("[[{target}]]"),
                    })
                },
            }
        },
    }
}

/// Text kept when a link is stripped: its display text, or the target's
/// final segment for a bare wikilink.
fn removed_text(link: &LinkRef) -> String {
    if let Some(display) = link.display.as_deref().filter(|d| !d.is_empty()) {
        return display.to_string();
    }
    let target = link.raw_target.split('#').next().unwrap_or_default();
    let last = target.rsplit(['/', '\\']).next().unwrap_or(target);
    paths::strip_document_extension(last).to_string()
}

/// Build the new text of a document.
///
/// `edits` must be in document order with non-overlapping spans, as produced
/// by the scanner. The output is assembled front to back into a fresh string;
/// unresolved links and everything between links are copied byte for byte.
pub fn rewrite(
    text: &str,
    source: &Path,
    edits: &[(LinkRef, Resolution)],
    index: &PathIndex,
    options: &RewriteOptions,
) -> Rewritten {
    let mut out = Rewritten { text: String::with_capacity(text.len()), ..Rewritten::default() };
    let mut cursor = 0_usize;

    for (link, resolution) in edits {
        let (Some(before), Some(original)) = (text.get(cursor..link.span.start), text.get(link.span.clone())) else {
            tracing::warn!(source = %source.display(), line = link.line, "link span out of order, left as is");
            continue;
        };
        out.text.push_str(before);
        cursor = link.span.end;

        let replacement = render(source, link, resolution, index, options);
        match replacement {
            Some(new) if new != original => {
                tracing::debug!(source = %source.display(), line = link.line, from = original, to = %new, "rewrite");
                if matches!(resolution, Resolution::Removed { .. }) {
                    out.removed = out.removed.saturating_add(1);
                } else {
                    out.rewritten = out.rewritten.saturating_add(1);
                }
                out.text.push_str(&new);
            },
            Some(_) | None => out.text.push_str(original),
        }
    }

    out.text.push_str(text.get(cursor..).unwrap_or_default());
    out
}

/// Wikilink target text for a resolved document, without extension.
fn wikilink_target(source_dir: &Path, path: &Path, index: &PathIndex, style: WikilinkStyle) -> String {
    let relative = || {
        let rel = paths::to_slash(&paths::relative_path(source_dir, path));
        paths::strip_document_extension(&rel).to_string()
    };
    match style {
        WikilinkStyle::Relative => relative(),
        WikilinkStyle::Root => {
            let root = paths::to_slash(path);
            paths::strip_document_extension(&root).to_string()
        },
        WikilinkStyle::Stem => {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            // A shared stem would lose its meaning; spell out the path instead.
            if stem.is_empty() || index.is_ambiguous(stem) { relative() } else { stem.to_string() }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::scanner;
    use crate::types::Notation;

    fn index() -> PathIndex {
        PathIndex::from_paths(["a/b/doc.md", "a/c/target.md", "learn/index.md", "index.md"].map(PathBuf::from))
    }

    fn resolved(path: &str) -> Resolution {
        Resolution::Resolved { ambiguous: false, fragment: None, path: PathBuf::from(path) }
    }

    fn run(text: &str, source: &str, resolutions: &[Resolution], options: &RewriteOptions) -> Rewritten {
        let edits: Vec<(LinkRef, Resolution)> = scanner::scan(text).zip(resolutions.iter().cloned()).collect();
        rewrite(text, Path::new(source), &edits, &index(), options)
    }

    #[test]
    fn markdown_output_uses_directory_relative_path() {
        let out = run("x [[target|T]] y", "a/b/doc.md", &[resolved("a/c/target.md")], &RewriteOptions::default());
        assert_eq!(out.text, "x [T](../c/target.md) y");
        assert_eq!(out.rewritten, 1);
    }

    #[test]
    fn wikilink_output_drops_extension() {
        let options = RewriteOptions { mode: OutputMode::Wikilink, ..RewriteOptions::default() };
        let out = run("[T](old.md)", "a/b/doc.md", &[resolved("a/c/target.md")], &options);
        assert_eq!(out.text, "[[../c/target|T]]");
    }

    #[test]
    fn wikilink_styles() {
        let text = "[Target](t.md)";
        let root = RewriteOptions { mode: OutputMode::Wikilink, wikilink_style: WikilinkStyle::Root, ..RewriteOptions::default() };
        assert_eq!(run(text, "a/b/doc.md", &[resolved("a/c/target.md")], &root).text, "[[a/c/target|Target]]");

        let stem = RewriteOptions { wikilink_style: WikilinkStyle::Stem, ..root };
        assert_eq!(run(text, "a/b/doc.md", &[resolved("a/c/target.md")], &stem).text, "[[target|Target]]");
        // `index` is shared by two documents, so the stem alone is not enough.
        assert_eq!(run(text, "a/b/doc.md", &[resolved("learn/index.md")], &stem).text, "[[../../learn/index|Target]]");
    }

    #[test]
    fn bare_wikilink_keeps_showing_its_written_name() {
        let options = RewriteOptions { mode: OutputMode::Wikilink, ..RewriteOptions::default() };
        let out = run("See [[target]].", "a/b/doc.md", &[resolved("a/c/target.md")], &options);
        assert_eq!(out.text, "See [[../c/target|target]].");

        let again = run(&out.text, "a/b/doc.md", &[resolved("a/c/target.md")], &options);
        assert_eq!(again.text, out.text);
        assert_eq!(again.rewritten, 0);
    }

    #[test]
    fn bare_wikilink_already_correct_is_untouched() {
        let stem = RewriteOptions { mode: OutputMode::Wikilink, wikilink_style: WikilinkStyle::Stem, ..RewriteOptions::default() };
        let section = Resolution::Resolved {
            ambiguous: false,
            fragment: Some("setup".to_string()),
            path: PathBuf::from("a/c/target.md"),
        };
        let out = run("[[target#setup]]", "a/b/doc.md", &[section], &stem);
        assert_eq!(out.text, "[[target#setup]]");
        assert_eq!(out.rewritten, 0);
    }

    #[test]
    fn display_equal_to_target_is_omitted() {
        let options = RewriteOptions { mode: OutputMode::Wikilink, wikilink_style: WikilinkStyle::Stem, ..RewriteOptions::default() };
        let out = run("[target](../c/target.md)", "a/b/doc.md", &[resolved("a/c/target.md")], &options);
        assert_eq!(out.text, "[[target]]");
    }

    #[test]
    fn fragment_is_carried_over() {
        let resolution = Resolution::Resolved {
            ambiguous: false,
            fragment: Some("setup".to_string()),
            path: PathBuf::from("index.md"),
        };
        let out = run("[[index#setup|Home]]", "a/b/doc.md", &[resolution], &RewriteOptions::default());
        assert_eq!(out.text, "[Home](../../index.md#setup)");
    }

    #[test]
    fn removed_link_keeps_text_only() {
        let removed = Resolution::Removed { reason: "file deleted".to_string() };
        let out = run("See [Old Page](old-page.md).", "index.md", &[removed.clone()], &RewriteOptions::default());
        assert_eq!(out.text, "See Old Page.");
        assert_eq!(out.removed, 1);

        let annotated = RewriteOptions { annotate_removed: true, ..RewriteOptions::default() };
        let out = run("[[dir/old-page]]", "index.md", &[removed], &annotated);
        assert_eq!(out.text, "old-page *(link removed: file deleted)*");
    }

    #[test]
    fn unresolved_is_byte_identical() {
        let text = "keep [[totally-missing-doc]] as is\n";
        let out = run(text, "index.md", &[Resolution::Unresolved], &RewriteOptions::default());
        assert_eq!(out.text, text);
        assert_eq!(out.rewritten, 0);
    }

    #[test]
    fn already_correct_link_is_not_counted() {
        let text = "[T](../c/target.md)";
        let out = run(text, "a/b/doc.md", &[resolved("a/c/target.md")], &RewriteOptions::default());
        assert_eq!(out.text, text);
        assert_eq!(out.rewritten, 0);
    }

    #[test]
    fn bare_wikilink_uses_target_as_display() {
        let out = run("[[target]]", "a/b/doc.md", &[resolved("a/c/target.md")], &RewriteOptions::default());
        assert_eq!(out.text, "[target](../c/target.md)");
        let link = scanner::scan("[[target]]").next().unwrap();
        assert_eq!(link.notation, Notation::Wikilink);
    }
}
