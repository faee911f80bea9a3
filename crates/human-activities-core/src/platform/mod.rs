#[cfg(target_os = "windows")]
pub mod windows;

use std::fs::Metadata;
use std::path::Path;

/// An entry is hidden when its name starts with a dot, or when the platform
/// marks it hidden (Windows `FILE_ATTRIBUTE_HIDDEN`).
pub fn is_hidden(path: &Path, metadata: &Metadata) -> bool {
    has_dot_name(path) || has_hidden_attribute(metadata)
}

pub fn has_dot_name(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(target_os = "windows")]
fn has_hidden_attribute(metadata: &Metadata) -> bool {
    windows::has_hidden_attribute(metadata)
}

#[cfg(not(target_os = "windows"))]
fn has_hidden_attribute(_metadata: &Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_names_are_hidden() {
        assert!(has_dot_name(Path::new("/home/user/.cache")));
        assert!(has_dot_name(Path::new(".git")));
        assert!(!has_dot_name(Path::new("/home/user/Photos")));
        assert!(!has_dot_name(Path::new("/home/user/file.txt")));
    }

    #[test]
    fn test_root_has_no_dot_name() {
        assert!(!has_dot_name(Path::new("/")));
    }
}
