/// Core domain types for links, their classification, and resolution outcomes.
use std::ops::Range;
use std::path::PathBuf;

/// Target notation for a rewrite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Emit `[display](relative/path.md)`.
    #[default]
    Markdown,
    /// Emit `[[target|display]]`.
    Wikilink,
}

/// A link occurrence found by the scanner.
/// Spans are byte offsets into the scanned text and never overlap within one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    /// Display text as written. `None` for a bare `[[target]]`.
    pub display: Option<String>,
    /// One-based line number of the link start.
    pub line: u32,
    /// Which syntax the link was written in.
    pub notation: Notation,
    /// Target exactly as written, including any extension or fragment.
    pub raw_target: String,
    /// Byte range of the whole link markup in the source text.
    pub span: Range<usize>,
}

impl LinkRef {
    /// Classify the raw target into external, anchor, other, or document reference.
    pub fn target_kind(&self) -> TargetKind {
        TargetKind::classify(self.notation, &self.raw_target)
    }

    /// Text to keep when a link is stripped or converted without explicit display text.
    pub fn display_or_target(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.raw_target)
    }
}

/// Link syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// `![alt](src)` or `![[target]]`. Never rewritten.
    Embed,
    /// `[display](target)`.
    Markdown,
    /// `[[target]]` or `[[target|display]]`.
    Wikilink,
}

/// Outcome of resolving one document reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Override table marks the target as deliberately gone.
    Removed {
        /// Why the target was removed, from the override table.
        reason: String,
    },
    /// Destination document found.
    Resolved {
        /// True when several documents shared the stem and a tie-break picked this one.
        ambiguous: bool,
        /// Fragment to carry over, without the leading `#`.
        fragment: Option<String>,
        /// Tree-root-relative path of the destination document.
        path: PathBuf,
    },
    /// Nothing matched. The link is left untouched.
    Unresolved,
}

/// What a raw link target points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// A reference to another document in the tree.
    Document {
        /// Fragment after `#`, if any.
        fragment: Option<String>,
        /// Path or identifier portion, fragment removed.
        path: String,
    },
    /// `http://`, `https://`, or `mailto:` target.
    External,
    /// Same-document fragment such as `#section`.
    SameDocAnchor(String),
    /// Local target that is not a document (asset, directory, embed).
    Other,
}

impl TargetKind {
    /// Classify a raw target written in the given notation.
    pub fn classify(notation: Notation, raw: &str) -> Self {
        let trimmed = raw.trim();
        if notation == Notation::Embed {
            return Self::Other;
        }
        if EXTERNAL_SCHEMES.iter().any(|scheme| trimmed.starts_with(scheme)) {
            return Self::External;
        }
        if let Some(anchor) = trimmed.strip_prefix('#') {
            return Self::SameDocAnchor(anchor.to_string());
        }

        let (path, fragment) = match trimmed.split_once('#') {
            None => (trimmed, None),
            Some((path, frag)) => (path, Some(frag.to_string()).filter(|f| !f.is_empty())),
        };

        if notation == Notation::Markdown && !crate::paths::has_document_extension(path) {
            return Self::Other;
        }
        if path.is_empty() {
            return Self::Other;
        }
        Self::Document { fragment, path: path.to_string() }
    }
}

/// URL schemes that are never resolved against the tree.
pub const EXTERNAL_SCHEMES: [&str; 3] = ["http://", "https://", "mailto:"];

/// How wikilink targets are spelled on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WikilinkStyle {
    /// Path relative to the source document's directory, no extension.
    #[default]
    Relative,
    /// Tree-root-relative path, no extension.
    Root,
    /// Filename stem only, unless the stem is ambiguous.
    Stem,
}
