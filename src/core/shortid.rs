//! Short ID system for easier entity selection
//!
//! Provides numeric aliases like `@1`, `@2` that map to full entity IDs.
//! Aliases are handed out whenever deals, options or items are listed and
//! stay stable until the index file is removed.

use std::collections::HashMap;
use std::fs;

use crate::core::project::Project;

/// Index file location within a project
const INDEX_FILE: &str = ".pq/shortids.json";

/// A mapping of short IDs (@N) to full entity IDs
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    /// Maps short number to full entity ID string
    entries: HashMap<u32, String>,
    /// Maps full entity ID to short number (reverse lookup)
    #[serde(skip)]
    reverse: HashMap<String, u32>,
    /// Next available short ID
    next_id: u32,
}

impl ShortIdIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            reverse: HashMap::new(),
            next_id: 1,
        }
    }

    /// Load the index from a project, or create empty if not found
    pub fn load(project: &Project) -> Self {
        let path = project.root().join(INDEX_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(mut index) = serde_json::from_str::<ShortIdIndex>(&content) {
                index.reverse = index.entries.iter().map(|(k, v)| (v.clone(), *k)).collect();
                index.next_id = index.next_id.max(1);
                return index;
            }
        }
        Self::new()
    }

    /// Save the index to a project
    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let path = project.root().join(INDEX_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Add an entity ID and return its short number
    pub fn add(&mut self, entity_id: String) -> u32 {
        if let Some(&short_id) = self.reverse.get(&entity_id) {
            return short_id;
        }

        let short_id = self.next_id;
        self.next_id += 1;
        self.entries.insert(short_id, entity_id.clone());
        self.reverse.insert(entity_id, short_id);
        short_id
    }

    /// Make sure every ID has an alias
    pub fn ensure_all(&mut self, entity_ids: impl IntoIterator<Item = String>) {
        for id in entity_ids {
            self.add(id);
        }
    }

    /// Resolve a reference to a full or partial entity ID
    ///
    /// Accepts `@N`, or passes anything else through for prefix matching.
    /// Returns None for an unknown `@N`.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        match reference.strip_prefix('@') {
            Some(num) => num
                .parse::<u32>()
                .ok()
                .and_then(|n| self.entries.get(&n).cloned()),
            None => Some(reference.to_string()),
        }
    }

    /// Get the `@N` alias for a full entity ID
    pub fn get_short_id(&self, entity_id: &str) -> Option<String> {
        self.reverse.get(entity_id).map(|n| format!("@{}", n))
    }

    /// Alias if known, otherwise the full ID
    pub fn display(&self, entity_id: &str) -> String {
        self.get_short_id(entity_id)
            .unwrap_or_else(|| entity_id.to_string())
    }

    /// Number of entries in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_short_id_add_and_resolve() {
        let mut index = ShortIdIndex::new();
        let first = index.add("DEAL-01AAA".to_string());
        let second = index.add("ITEM-01BBB".to_string());

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(index.resolve("@1"), Some("DEAL-01AAA".to_string()));
        assert_eq!(index.resolve("@2"), Some("ITEM-01BBB".to_string()));
        assert_eq!(index.resolve("@9"), None);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut index = ShortIdIndex::new();
        index.add("OPT-01AAA".to_string());
        index.add("OPT-01AAA".to_string());
        assert_eq!(index.len(), 1);
        assert_eq!(index.get_short_id("OPT-01AAA"), Some("@1".to_string()));
    }

    #[test]
    fn test_resolve_passes_through_ids() {
        let index = ShortIdIndex::new();
        assert_eq!(index.resolve("DEAL-01A"), Some("DEAL-01A".to_string()));
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let mut index = ShortIdIndex::new();
        index.ensure_all(["DEAL-01AAA".to_string(), "DEAL-01BBB".to_string()]);
        index.save(&project).unwrap();

        let mut loaded = ShortIdIndex::load(&project);
        assert_eq!(loaded.resolve("@2"), Some("DEAL-01BBB".to_string()));
        assert_eq!(loaded.display("DEAL-01AAA"), "@1");
        assert_eq!(loaded.add("DEAL-01CCC".to_string()), 3);
    }
}
