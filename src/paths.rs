//! Lexical path helpers. Nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// File extensions treated as documents.
pub const DOCUMENT_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Trim whitespace, turn backslashes into `/`, and drop leading `./` segments.
pub fn clean_target(raw: &str) -> String {
    let mut out = raw.trim().replace('\\', "/");
    while let Some(rest) = out.strip_prefix("./") {
        out = rest.to_string();
    }
    out
}

/// True when the path's final extension is a document extension.
pub fn has_document_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    components.iter().collect()
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            let can_pop = matches!(components.last(), Some(c) if !matches!(c, Component::ParentDir));
            if can_pop {
                components.pop();
            } else {
                components.push(component);
            }
        },
        other => components.push(other),
    }
}

/// Path from directory `from_dir` to `to`, both relative to the same root.
///
/// Counts the shared leading components, emits one `..` per remaining
/// component of `from_dir`, then appends the rest of `to`.
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let base = normalize_path(from_dir);
    let from: Vec<Component<'_>> = base.components().collect();
    let target = normalize_path(to);
    let to_components: Vec<Component<'_>> = target.components().collect();

    let shared = from.iter().zip(&to_components).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in from.iter().skip(shared) {
        out.push("..");
    }
    for component in to_components.iter().skip(shared) {
        out.push(component.as_os_str());
    }
    out
}

/// True when a normalized relative path climbs above its root.
pub fn escapes_root(path: &Path) -> bool {
    matches!(path.components().next(), Some(Component::ParentDir | Component::RootDir))
}

/// Drop a trailing document extension, if present.
pub fn strip_document_extension(path: &str) -> &str {
    if !has_document_extension(path) {
        return path;
    }
    path.rsplit_once('.').map_or(path, |(head, _)| head)
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
