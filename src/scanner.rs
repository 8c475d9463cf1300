use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{CaptureMatches, Captures, Regex};

use crate::types::{LinkRef, Notation};

/// Both link grammars in one alternation so matches come out in document
/// order and never overlap. The wikilink branch is tried first at each
/// position, so `[[x]]` is never read as a markdown link.
/// Display text containing `[`, `]` or a target containing `(`, `)` or
/// whitespace is not matched.
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<bang>!)?(?:",
        r"\[\[(?P<wtarget>[^\[\]|\n]+)(?:\|(?P<wdisplay>[^\[\]\n]*))?\]\]",
        r"|",
        r"\[(?P<mdisplay>[^\[\]\n]*)\]\((?P<mtarget>[^()\s]+)\)",
        r")",
    ))
    .expect("valid link regex")
});

/// ATX heading, with an optional trailing `{#custom-id}` attribute.
static HEADING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}#{1,6}[ \t]+(?P<text>.*?)(?:[ \t]+\{#(?P<id>[^}\s]+)\})?[ \t#]*$")
        .expect("valid heading regex")
});

/// Bullet or ordered list item marker.
static LIST_ITEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?:[-*+]|\d{1,9}[.)])(?:\s|$)").expect("valid list item regex"));

/// Lazy iterator over the links of one document.
///
/// Holds no state a caller needs to keep: calling [`scan`] again on the same
/// text starts over.
pub struct Links<'t> {
    /// Underlying regex matches.
    captures: CaptureMatches<'static, 't>,
    /// Byte ranges of code where links are ignored, sorted.
    code: Vec<Range<usize>>,
    /// Line number at `line_offset`.
    line: u32,
    /// Byte offset up to which newlines have been counted.
    line_offset: usize,
    /// Scanned text.
    text: &'t str,
}

impl Iterator for Links<'_> {
    type Item = LinkRef;

    fn next(&mut self) -> Option<LinkRef> {
        loop {
            let cap = self.captures.next()?;
            let whole = cap.get(0)?;
            if self.code.iter().any(|r| r.contains(&whole.start())) {
                continue;
            }
            let line = self.line_at(whole.start());
            return Some(link_from_capture(&cap, whole.range(), line));
        }
    }
}

impl Links<'_> {
    /// One-based line of `offset`. Offsets arrive in increasing order.
    fn line_at(&mut self, offset: usize) -> u32 {
        let newlines = self.text.get(self.line_offset..offset).map_or(0, |s| s.matches('\n').count());
        self.line = self.line.saturating_add(u32::try_from(newlines).unwrap_or(u32::MAX));
        self.line_offset = offset;
        self.line
    }
}

/// Byte ranges covered by fenced code blocks, indented code blocks and
/// inline code spans.
///
/// An indented block starts after a blank line and runs until the next
/// non-blank line indented less than four spaces. Indented text following a
/// list item is list content, not code.
///
/// # Panics
///
/// Panics if the hardcoded list item regex is invalid (compile-time invariant).
pub fn code_regions(text: &str) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut fence: Option<(char, usize, usize)> = None;
    let mut indented: Option<usize> = None;
    let mut in_list = false;
    let mut prev_blank = true;
    let mut offset = 0_usize;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset = offset.saturating_add(line.len());
        let blank = line.trim().is_empty();

        if let Some((ch, len, open_at)) = fence {
            if fence_marker(line).is_some_and(|(c, n)| c == ch && n >= len) {
                regions.push(open_at..offset);
                fence = None;
            }
            prev_blank = false;
            continue;
        }

        if let Some(open_at) = indented {
            if blank || is_indented(line) {
                prev_blank = blank;
                continue;
            }
            regions.push(open_at..start);
            indented = None;
        }

        if !blank && prev_blank && !in_list && is_indented(line) {
            indented = Some(start);
        } else if let Some((ch, len)) = fence_marker(line) {
            fence = Some((ch, len, start));
        } else {
            push_inline_code_spans(line, start, &mut regions);
        }

        if !blank && !is_indented(line) {
            in_list = LIST_ITEM_PATTERN.is_match(line);
        }
        prev_blank = blank;
    }

    if let Some((_, _, open_at)) = fence {
        regions.push(open_at..text.len());
    }
    if let Some(open_at) = indented {
        regions.push(open_at..text.len());
    }
    regions
}

/// If `line` opens or closes a fence, return its character and run length.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let indent = line.len().saturating_sub(line.trim_start_matches(' ').len());
    if indent > 3 {
        return None;
    }
    let body = line.trim_start_matches(' ');
    for ch in ['`', '~'] {
        let run = body.len().saturating_sub(body.trim_start_matches(ch).len());
        if run >= 3 {
            return Some((ch, run));
        }
    }
    None
}

/// Anchor slugs produced by the document's ATX headings, outside code.
/// Repeated headings get `_1`, `_2`, ... suffixes.
///
/// # Panics
///
/// Panics if the hardcoded heading regex is invalid (compile-time invariant).
pub fn heading_slugs(text: &str) -> BTreeSet<String> {
    let code = code_regions(text);
    let mut slugs = BTreeSet::new();
    let mut offset = 0_usize;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset = offset.saturating_add(line.len());
        if code.iter().any(|r| r.contains(&start)) {
            continue;
        }
        let Some(cap) = HEADING_PATTERN.captures(line.trim_end_matches(['\n', '\r'])) else {
            continue;
        };
        let slug = match cap.name("id") {
            Some(id) => id.as_str().to_string(),
            None => slugify(cap.name("text").map_or("", |m| m.as_str())),
        };
        insert_unique_slug(&mut slugs, slug);
    }
    slugs
}

/// Four leading spaces or a tab.
fn is_indented(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

/// Insert `slug`, suffixing `_N` when it is already taken.
fn insert_unique_slug(slugs: &mut BTreeSet<String>, slug: String) {
    if !slugs.contains(&slug) {
        slugs.insert(slug);
        return;
    }
    let mut n = 1_u32;
    loop {
        let candidate = format!("{slug}_{n}");
        if !slugs.contains(&candidate) {
            slugs.insert(candidate);
            return;
        }
        n = n.saturating_add(1);
    }
}

/// Turn one regex capture into a [`LinkRef`].
fn link_from_capture(cap: &Captures<'_>, span: Range<usize>, line: u32) -> LinkRef {
    let embed = cap.name("bang").is_some();
    let (notation, raw_target, display) = match cap.name("wtarget") {
        Some(target) => (
            Notation::Wikilink,
            target.as_str().to_string(),
            cap.name("wdisplay").map(|m| m.as_str().to_string()),
        ),
        None => (
            Notation::Markdown,
            cap.name("mtarget").map_or_else(String::new, |m| m.as_str().to_string()),
            cap.name("mdisplay").map(|m| m.as_str().to_string()),
        ),
    };
    LinkRef {
        display,
        line,
        notation: if embed { Notation::Embed } else { notation },
        raw_target,
        span,
    }
}

/// Record inline code spans on one line, offset by `start`.
/// A span opens with a run of N backticks and closes at the next run of exactly N.
fn push_inline_code_spans(line: &str, start: usize, regions: &mut Vec<Range<usize>>) {
    let bytes = line.as_bytes();
    let mut i = 0_usize;
    while i < bytes.len() {
        if bytes.get(i) != Some(&b'`') {
            i = i.saturating_add(1);
            continue;
        }
        let open = i;
        let run = backtick_run(bytes, i);
        let mut j = open.saturating_add(run);
        let mut closed = None;
        while j < bytes.len() {
            if bytes.get(j) == Some(&b'`') {
                let close_run = backtick_run(bytes, j);
                if close_run == run {
                    closed = Some(j.saturating_add(close_run));
                    break;
                }
                j = j.saturating_add(close_run);
            } else {
                j = j.saturating_add(1);
            }
        }
        match closed {
            Some(end) => {
                regions.push(start.saturating_add(open)..start.saturating_add(end));
                i = end;
            },
            None => i = open.saturating_add(run),
        }
    }
}

/// Length of the backtick run starting at `at`.
fn backtick_run(bytes: &[u8], at: usize) -> usize {
    bytes.iter().skip(at).take_while(|b| **b == b'`').count()
}

/// Extract links in document order, skipping code.
///
/// # Panics
///
/// Panics if the hardcoded link regex is invalid (compile-time invariant).
pub fn scan(text: &str) -> Links<'_> {
    Links {
        captures: LINK_PATTERN.captures_iter(text),
        code: code_regions(text),
        line: 1,
        line_offset: 0,
        text,
    }
}

/// Heading-to-anchor slug: lowercase, word characters kept, whitespace and
/// `-` collapsed to a single `-`, other punctuation dropped.
pub fn slugify(heading: &str) -> String {
    let mut out = String::new();
    let mut last_dash = false;
    for ch in heading.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() || ch == '_' {
            out.push(ch);
            last_dash = false;
        } else if (ch.is_whitespace() || ch == '-') && !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(text: &str) -> Vec<(Notation, String, Option<String>)> {
        scan(text).map(|l| (l.notation, l.raw_target, l.display)).collect()
    }

    #[test]
    fn finds_both_notations_in_order() {
        let text = "See [Memory](core/memory.md) and [[three-tier|Tiers]] then [[glossary]].";
        assert_eq!(
            targets(text),
            vec![
                (Notation::Markdown, "core/memory.md".to_string(), Some("Memory".to_string())),
                (Notation::Wikilink, "three-tier".to_string(), Some("Tiers".to_string())),
                (Notation::Wikilink, "glossary".to_string(), None),
            ]
        );
    }

    #[test]
    fn spans_cover_exact_markup() {
        let text = "a [[x|y]] b [t](u.md) c";
        let spans: Vec<&str> = scan(text).map(|l| &text[l.span]).collect();
        assert_eq!(spans, vec!["[[x|y]]", "[t](u.md)"]);
    }

    #[test]
    fn wikilink_is_not_read_as_markdown() {
        let text = "[[page]](other.md)";
        let found = targets(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, Notation::Wikilink);
    }

    #[test]
    fn embeds_are_marked() {
        let text = "![logo](img/logo.png) ![[diagram.png]]";
        assert!(scan(text).all(|l| l.notation == Notation::Embed));
    }

    #[test]
    fn links_in_code_are_ignored() {
        let text = "real [a](a.md)\n```md\n[b](b.md)\n```\ninline `[[c]]` and [[d]]\n";
        let found: Vec<String> = scan(text).map(|l| l.raw_target).collect();
        assert_eq!(found, vec!["a.md".to_string(), "d".to_string()]);
    }

    #[test]
    fn indented_code_block_is_ignored() {
        let text = "Example:\n\n    [x](y.md)\n\n    [[z]]\nafter [a](a.md)\n";
        let found: Vec<String> = scan(text).map(|l| l.raw_target).collect();
        assert_eq!(found, vec!["a.md".to_string()]);
    }

    #[test]
    fn indented_paragraph_line_is_not_code() {
        let text = "Some text\n    [x](y.md) continues it\n";
        assert_eq!(scan(text).count(), 1);
    }

    #[test]
    fn list_continuation_is_not_code() {
        let text = "- item\n\n    more about it, see [[page]]\n";
        let found: Vec<String> = scan(text).map(|l| l.raw_target).collect();
        assert_eq!(found, vec!["page".to_string()]);
    }

    #[test]
    fn unclosed_fence_masks_rest_of_document() {
        let text = "[a](a.md)\n~~~\n[b](b.md)\n";
        assert_eq!(scan(text).count(), 1);
    }

    #[test]
    fn line_numbers_are_one_based() {
        let text = "one\n[a](a.md)\n\nthree [[b]] [[c]]\n";
        let lines: Vec<u32> = scan(text).map(|l| l.line).collect();
        assert_eq!(lines, vec![2, 4, 4]);
    }

    #[test]
    fn scanning_again_restarts() {
        let text = "[[a]] [[b]]";
        assert_eq!(scan(text).count(), 2);
        assert_eq!(scan(text).count(), 2);
    }

    #[test]
    fn heading_slugs_follow_toc_rules() {
        let text = "# Getting Started!\n## Why Git? Why now\n```\n# not a heading\n```\n## Setup\n## Setup\n### Custom {#my-id}\n";
        let slugs = heading_slugs(text);
        assert!(slugs.contains("getting-started"));
        assert!(slugs.contains("why-git-why-now"));
        assert!(slugs.contains("setup"));
        assert!(slugs.contains("setup_1"));
        assert!(slugs.contains("my-id"));
        assert!(!slugs.contains("not-a-heading"));
    }
}
