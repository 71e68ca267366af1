//! Path conventions shared by both backends
//!
//! The tree model always presents forward-slash paths. Share-side paths use
//! the separator of the server's operating system and carry no leading slash.

use serde::{Deserialize, Serialize};

/// Id of the synthetic share root folder
pub const ROOT_ID: &str = "root";

/// Path of the repository root
pub const ROOT_PATH: &str = "/";

/// Separator convention of the file-share server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PathConvention {
    /// Backslash separated (Windows servers)
    #[default]
    Windows,
    /// Forward-slash separated
    #[serde(alias = "LINUX", alias = "MACOS")]
    Unix,
}

impl PathConvention {
    pub fn separator(&self) -> char {
        match self {
            PathConvention::Windows => '\\',
            PathConvention::Unix => '/',
        }
    }

    /// Convert a presentation id into a share path: leading and trailing
    /// separators stripped, separators rewritten to this convention.
    pub fn to_share_path(&self, id: &str) -> String {
        let trimmed = id.trim_matches(&['/', '\\'][..]);
        match self {
            PathConvention::Windows => trimmed.replace('/', "\\"),
            PathConvention::Unix => trimmed.to_string(),
        }
    }

    /// Join a share-side parent and a child name
    pub fn join(&self, parent: &str, name: &str) -> String {
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", parent, self.separator(), name)
        }
    }
}

/// Rewrite any share path into forward-slash form without a leading slash
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches('/').to_string()
}

/// Split a path into its parent location and final segment.
///
/// The parent is absolute, forward-slash, and `/` for top-level entries.
/// The root itself splits into `("/", "")`.
pub fn split_parent(path: &str) -> (String, String) {
    let absolute = format!("/{}", normalize(path));
    let absolute = absolute.trim_end_matches('/');
    match absolute.rfind('/') {
        Some(0) | None => (ROOT_PATH.to_string(), absolute.trim_start_matches('/').to_string()),
        Some(idx) => (absolute[..idx].to_string(), absolute[idx + 1..].to_string()),
    }
}

/// Join a presentation parent path and a name
pub fn join(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if name.is_empty() {
        if parent.is_empty() {
            ROOT_PATH.to_string()
        } else {
            parent.to_string()
        }
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Non-empty segments of a path, accepting either separator
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(&['/', '\\'][..]).filter(|s| !s.is_empty())
}

/// Final segment of a path
pub fn basename(path: &str) -> &str {
    segments(path).last().unwrap_or("")
}
