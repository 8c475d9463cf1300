use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::{OutputMode, WikilinkStyle};

/// File name of the project config, looked up in the tree root.
pub const CONFIG_FILE: &str = ".linkfix.toml";

/// Project configuration loaded from `.linkfix.toml`.
/// Include/exclude patterns are path prefixes applied to documents to rewrite.
/// The path index always covers every document regardless of these filters.
#[derive(Debug, Default)]
pub struct Config {
    /// Append a removal note after stripped links.
    pub annotate_removed: bool,
    /// Validate same-document `#anchor` links against headings.
    pub check_anchors: bool,
    /// Prefixes never rewritten.
    exclude: Vec<String>,
    /// Prefixes eligible for rewriting. Empty means everything.
    include: Vec<String>,
    /// Output notation.
    pub mode: OutputMode,
    /// Override table location, relative to the tree root.
    pub overrides: Option<PathBuf>,
    /// Spelling of emitted wikilink targets.
    pub wikilink_style: WikilinkStyle,
}

/// Raw TOML structure for `.linkfix.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkfixTomlConfig {
    /// See [`Config::annotate_removed`].
    #[serde(default)]
    annotate_removed: bool,
    /// See [`Config::check_anchors`].
    #[serde(default)]
    check_anchors: bool,
    /// See [`Config::exclude`].
    #[serde(default)]
    exclude: Vec<String>,
    /// See [`Config::include`].
    #[serde(default)]
    include: Vec<String>,
    /// See [`Config::mode`].
    #[serde(default)]
    mode: OutputMode,
    /// See [`Config::overrides`].
    overrides: Option<PathBuf>,
    /// See [`Config::wikilink_style`].
    #[serde(default)]
    wikilink_style: WikilinkStyle,
}

impl Config {
    /// Load config from `.linkfix.toml` in the given root directory.
    /// Returns a default that rewrites everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        Self::parse(&content, &path)
    }

    /// Parse config text. `file` is only used for error context.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str, file: &Path) -> Result<Self, Error> {
        let raw: LinkfixTomlConfig =
            toml::from_str(content).map_err(|source| Error::TomlDe { file: file.to_path_buf(), source })?;
        Ok(Self {
            annotate_removed: raw.annotate_removed,
            check_anchors: raw.check_anchors,
            exclude: raw.exclude,
            include: raw.include,
            mode: raw.mode,
            overrides: raw.overrides,
            wikilink_style: raw.wikilink_style,
        })
    }

    /// Check whether a document path should be rewritten.
    ///
    /// A path is included if no include patterns are set (rewrite everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_rewrite(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        !self.exclude.iter().any(|p| relative_path.starts_with(p.as_str()))
    }
}
