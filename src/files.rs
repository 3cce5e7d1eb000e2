use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry file every preview starts from.
pub const ENTRY_FILE: &str = "index.html";

/// In-memory project snapshot: forward-slash paths (no leading slash) to content.
///
/// Content is either UTF-8 text or a binary asset encoded as a `data:` URL.
/// Each assignment replaces a whole file; there are no partial writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualFileSet {
    files: BTreeMap<String, String>,
}

impl VirtualFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// The stored key equal to `path`, borrowed from the set.
    pub fn key(&self, path: &str) -> Option<&str> {
        self.files.get_key_value(path).map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Assign the full content of `path`, returning the previous content.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.files.insert(path.into(), content.into())
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Overlay every file of `other` on top of this set; `other` wins on conflicts.
    pub fn overlay(&mut self, other: &BTreeMap<String, String>) {
        for (path, content) in other {
            self.files.insert(path.clone(), content.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VirtualFileSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// True when `content` is a binary asset stored as a data URL.
pub fn is_data_url(content: &str) -> bool {
    content.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_replaces_existing() {
        let mut set: VirtualFileSet = [("a.js", "old"), ("b.css", "keep")].into_iter().collect();
        let mut incoming = BTreeMap::new();
        incoming.insert("a.js".to_string(), "new".to_string());
        incoming.insert("c.md".to_string(), "added".to_string());
        set.overlay(&incoming);

        assert_eq!(set.get("a.js"), Some("new"));
        assert_eq!(set.get("b.css"), Some("keep"));
        assert_eq!(set.get("c.md"), Some("added"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_is_data_url() {
        assert!(is_data_url("data:image/png;base64,AAAA"));
        assert!(!is_data_url("<svg></svg>"));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let set: VirtualFileSet = [("index.html", "<h1>Hi</h1>")].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"index.html":"<h1>Hi</h1>"}"#);
    }
}
