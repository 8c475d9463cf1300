use crate::config::CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render a fatal error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// something to do about it, how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::RootNotFound { path } => format!("\
# Error: Tree Root Not Found

`{}` does not exist or is not a directory.

## Fix

Pass the directory that holds your documents:

    linkfix docs/
", path.display()),

        Error::OverridesNotFound { path } => format!("\
# Error: Override Table Not Found

`{}` does not exist.

## Fix

Check `--overrides` or the `overrides` key in `{CONFIG_FILE}`. Paths in the
config file are relative to the tree root.
", path.display()),

        Error::OverrideConflict { file, key } => format!("\
# Error: Conflicting Override

`{key}` is listed under both `[rewrite]` and `[removed]` in `{}`.

## Fix

Keep exactly one entry for `{key}`.
", file.display()),

        Error::OverrideChain { destination, file, key, next } => format!("\
# Error: Chained Override

`{key}` rewrites to `{destination}`, but `{next}` in `{}` matches that
destination too. A second run would move the link again.

## Fix

Point `{key}` straight at the final document, or drop the `{next}` entry.
", file.display()),

        Error::TomlDe { file, source } => format!("\
# Error: Invalid TOML

`{}` could not be parsed:

{source}
", file.display()),

        Error::Walk(err) => format!("\
# Error: Tree Traversal Failed

{err}

No files were changed: a partial index could resolve links to the wrong documents.
"),

        Error::InvalidUtf8 { .. } | Error::Io(_) | Error::Json(_) => format!("\
# Error

{e}
"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn root_not_found_suggests_a_fix() {
        let md = render_error(&Error::RootNotFound { path: PathBuf::from("site/docs") });
        assert!(md.starts_with("# Error: Tree Root Not Found"));
        assert!(md.contains("`site/docs`"));
        assert!(md.contains("## Fix"));
    }

    #[test]
    fn conflict_names_the_key() {
        let md = render_error(&Error::OverrideConflict {
            file: PathBuf::from("link-overrides.toml"),
            key: "old-page".to_string(),
        });
        assert!(md.contains("`old-page` is listed under both"));
    }

    #[test]
    fn chain_names_both_entries() {
        let md = render_error(&Error::OverrideChain {
            destination: "x/beta".to_string(),
            file: PathBuf::from("link-overrides.toml"),
            key: "alpha".to_string(),
            next: "beta".to_string(),
        });
        assert!(md.starts_with("# Error: Chained Override"));
        assert!(md.contains("`alpha` rewrites to `x/beta`, but `beta`"));
    }
}
