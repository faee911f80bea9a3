use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Colors used to tell configured directories apart. One more directory than
/// there are colors is allowed; it is drawn in the neutral color.
pub const HIGHLIGHT_COLORS: [&str; 6] = [
    "#e5bb3b", "#7aa4d9", "#e57373", "#81c784", "#ba68c8", "#4db6ac",
];
pub const NEUTRAL_COLOR: &str = "#a3a3a3";
pub const MAX_NAMED_DIRS: usize = HIGHLIGHT_COLORS.len() + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedDir {
    pub path: String,
    pub name: String,
}

/// Ordered, capacity-bounded list of user-labelled directories. Insertion
/// order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedDirs {
    items: Vec<NamedDir>,
    truncated: bool,
}

impl NamedDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a directory. Returns `false` and sets the truncation flag when
    /// the list is already full.
    pub fn push(&mut self, path: impl Into<String>, name: impl Into<String>) -> bool {
        if self.items.len() >= MAX_NAMED_DIRS {
            self.truncated = true;
            return false;
        }
        self.items.push(NamedDir {
            path: path.into(),
            name: name.into(),
        });
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<NamedDir> {
        if index >= self.items.len() {
            return None;
        }
        self.truncated = false;
        Some(self.items.remove(index))
    }

    pub fn remove_path(&mut self, path: &str) -> Option<NamedDir> {
        let index = self.items.iter().position(|item| item.path == path)?;
        self.remove(index)
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedDir> {
        self.items.iter()
    }

    /// `(path, name)` pairs with duplicate paths dropped, first occurrence wins.
    pub fn to_map(&self) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter(|item| seen.insert(item.path.as_str()))
            .map(|item| (item.path.clone(), item.name.clone()))
            .collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.to_map().into_iter().map(|(path, _)| path).collect()
    }
}

impl Serialize for NamedDirs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.to_map();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (path, name) in &entries {
            map.serialize_entry(path, name)?;
        }
        map.end()
    }
}

struct NamedDirsVisitor;

impl<'de> Visitor<'de> for NamedDirsVisitor {
    type Value = NamedDirs;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of directory path to display name")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut dirs = NamedDirs::new();
        while let Some((path, name)) = access.next_entry::<String, String>()? {
            dirs.push(path, name);
        }
        Ok(dirs)
    }
}

impl<'de> Deserialize<'de> for NamedDirs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(NamedDirsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> NamedDirs {
        let mut dirs = NamedDirs::new();
        for i in 0..MAX_NAMED_DIRS {
            assert!(dirs.push(format!("/data/{}", i), format!("Dir {}", i)));
        }
        dirs
    }

    #[test]
    fn test_push_beyond_capacity_sets_truncated() {
        let mut dirs = full();
        assert!(!dirs.truncated());
        assert!(!dirs.push("/data/extra", "Extra"));
        assert!(dirs.truncated());
        assert_eq!(dirs.len(), MAX_NAMED_DIRS);
    }

    #[test]
    fn test_remove_clears_truncated() {
        let mut dirs = full();
        dirs.push("/data/extra", "Extra");
        assert!(dirs.truncated());

        let removed = dirs.remove(0).unwrap();
        assert_eq!(removed.path, "/data/0");
        assert!(!dirs.truncated());
        assert_eq!(dirs.len(), MAX_NAMED_DIRS - 1);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut dirs = NamedDirs::new();
        assert!(dirs.remove(3).is_none());
    }

    #[test]
    fn test_to_map_first_occurrence_wins() {
        let mut dirs = NamedDirs::new();
        dirs.push("/a", "First");
        dirs.push("/b", "B");
        dirs.push("/a", "Second");

        let map = dirs.to_map();
        assert_eq!(
            map,
            vec![
                ("/a".to_string(), "First".to_string()),
                ("/b".to_string(), "B".to_string()),
            ]
        );
        assert_eq!(dirs.paths(), vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn test_json_preserves_insertion_order() {
        let json = r#"{"/z/Photos": "Photos", "/a/Music": "Music", "/m/Docs": "Docs"}"#;
        let dirs: NamedDirs = serde_json::from_str(json).unwrap();
        assert_eq!(
            dirs.paths(),
            vec!["/z/Photos".to_string(), "/a/Music".to_string(), "/m/Docs".to_string()]
        );

        let back = serde_json::to_string(&dirs).unwrap();
        assert_eq!(back, r#"{"/z/Photos":"Photos","/a/Music":"Music","/m/Docs":"Docs"}"#);
    }

    #[test]
    fn test_json_over_capacity_is_truncated() {
        let entries: Vec<String> = (0..MAX_NAMED_DIRS + 2)
            .map(|i| format!(r#""/d/{}": "D{}""#, i, i))
            .collect();
        let json = format!("{{{}}}", entries.join(","));
        let dirs: NamedDirs = serde_json::from_str(&json).unwrap();
        assert_eq!(dirs.len(), MAX_NAMED_DIRS);
        assert!(dirs.truncated());
    }
}
