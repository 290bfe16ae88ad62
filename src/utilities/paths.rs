// Path Utilities
// Helper functions for path manipulation across local and remote roots

use std::path::{Component, Path};

/// Strip trailing separators from a root, keeping a bare `/` intact
pub fn trim_root(root: &str) -> &str {
    let trimmed = root.trim_end_matches('/');
    if trimmed.is_empty() && root.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Normalize a listed path into the relative form used as a diff key
///
/// Removes any number of leading `./` segments and leading separators, so
/// `./a/b`, `/a/b` and `a/b` all become `a/b`.
pub fn normalize_relative(path: &str) -> String {
    let mut rest = path;
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.to_string()
}

/// Render a relative path with `/` separators regardless of platform
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a relative path onto a remote root
pub fn join_remote(root: &str, relative: &str) -> String {
    let root = trim_root(root);
    let relative = normalize_relative(relative);
    if root == "/" {
        format!("/{}", relative)
    } else {
        format!("{}/{}", root, relative)
    }
}

/// Parent directory of a remote path, if it has one
pub fn remote_parent(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Quote a string for a POSIX shell command line
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
