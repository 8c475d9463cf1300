/// Crate-level error types for linkfix diagnostics.
use std::path::PathBuf;

/// All errors carry the file or reason needed to act on them without a debugger.
/// Only tree-root, config, override, and index errors abort a run; everything
/// else is caught per document by the runner.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A document is not valid UTF-8 text.
    #[error("not valid UTF-8: {}", path.display())]
    InvalidUtf8 {
        /// The offending document.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of the summary failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// A rewrite destination is itself matched by a different override entry,
    /// so every run would move the link one step further.
    #[error("override chain: `{key}` points at `{destination}`, which `{next}` overrides again in {}", file.display())]
    OverrideChain {
        /// Destination written for `key`.
        destination: String,
        /// Override file containing the chain.
        file: PathBuf,
        /// Entry whose destination is overridden.
        key: String,
        /// Entry that matches the destination.
        next: String,
    },

    /// The same identifier is listed as both rewritten and removed.
    #[error("override conflict: `{key}` appears in both [rewrite] and [removed] of {}", file.display())]
    OverrideConflict {
        /// Override file containing the conflict.
        file: PathBuf,
        /// Identifier listed twice.
        key: String,
    },

    /// Override file named on the command line or in config does not exist.
    #[error("override table not found: {}", path.display())]
    OverridesNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Tree root does not exist or is not a directory.
    #[error("tree root not found: {}", path.display())]
    RootNotFound {
        /// Root given on the command line.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {}: {source}", file.display())]
    TomlDe {
        /// File that failed to parse.
        file: PathBuf,
        /// The wrapped TOML deserialization error.
        source: toml::de::Error,
    },

    /// Directory traversal failed while building the path index.
    #[error("walk: {0}")]
    Walk(
        /// The wrapped walkdir error.
        #[from]
        walkdir::Error,
    ),
}
