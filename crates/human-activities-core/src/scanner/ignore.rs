use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// First existing ignore-file among `candidates` (user config dir first, then
/// the global one).
pub fn find_ignore_file(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// Glob patterns from an ignore-file, one per line. Blank lines and `#`
/// comments are skipped. A pattern without a slash matches any path
/// component; otherwise it is matched against the path relative to the
/// scanned directory.
#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    patterns: Vec<Pattern>,
}

impl IgnorePatterns {
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let patterns = Self::parse(&contents);
                debug!(
                    "Loaded {} ignore patterns from {}",
                    patterns.patterns.len(),
                    path.display()
                );
                patterns
            }
            Err(err) => {
                warn!("Cannot read ignore file {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Self {
        let patterns = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.trim_end_matches('/').trim_start_matches('/'))
            .filter(|line| !line.is_empty())
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, relative: &Path) -> bool {
        self.patterns.iter().any(|pattern| {
            if pattern.as_str().contains('/') {
                pattern.matches_path(relative)
            } else {
                relative
                    .file_name()
                    .map(|name| pattern.matches(&name.to_string_lossy()))
                    .unwrap_or(false)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let patterns = IgnorePatterns::parse("# comment\n\nnode_modules/\n*.tmp\n");
        assert!(!patterns.is_empty());
        assert!(patterns.matches(Path::new("project/node_modules")));
        assert!(patterns.matches(Path::new("scratch.tmp")));
        assert!(!patterns.matches(Path::new("project/src")));
    }

    #[test]
    fn test_slash_patterns_match_relative_path() {
        let patterns = IgnorePatterns::parse("build/cache\n");
        assert!(patterns.matches(Path::new("build/cache")));
        assert!(!patterns.matches(Path::new("other/build/cachex")));
        assert!(!patterns.matches(Path::new("cache")));
    }

    #[test]
    fn test_find_ignore_file_prefers_first_existing() {
        let tmp = tempdir().unwrap();
        let user = tmp.path().join("user").join("ignore");
        let global = tmp.path().join("global_ignore");
        fs::write(&global, "*.iso\n").unwrap();

        let candidates = vec![user.clone(), global.clone()];
        assert_eq!(find_ignore_file(&candidates), Some(global.clone()));

        fs::create_dir_all(user.parent().unwrap()).unwrap();
        fs::write(&user, "*.vdi\n").unwrap();
        assert_eq!(find_ignore_file(&candidates), Some(user));

        assert_eq!(find_ignore_file(&[tmp.path().join("none")]), None);
    }
}
