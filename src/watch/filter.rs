// src/watch/filter.rs

//! Decides whether a raw event path is worth acting on.

use std::path::{Component, Path};

/// Extension allow-list plus hidden-path exclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    extensions: Vec<String>,
}

impl EventFilter {
    /// `extensions` are matched exactly (case-sensitive, leading dot
    /// included). An empty list allows every extension.
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    pub fn should_handle(&self, path: &Path) -> bool {
        if is_hidden(path) {
            return false;
        }

        if self.extensions.is_empty() {
            return true;
        }

        let ext = extension_of(path);
        self.extensions.iter().any(|allowed| allowed == ext)
    }
}

/// True if any component of `path` starts with `.`.
///
/// `.` and `..` components are not names and never count; callers pass
/// normalized absolute paths anyway.
pub fn is_hidden(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Extension of the last path element including the dot (`main.go` →
/// `.go`), or `""` when there is none.
///
/// Unlike [`Path::extension`], a name that *is* only an extension
/// (`.bashrc`) yields the whole name.
pub fn extension_of(path: &Path) -> &str {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return "";
    };
    match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}
