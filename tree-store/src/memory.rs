use crate::error::Result;
use crate::{StoredTree, TreeStore, validate_key};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local tree store
#[derive(Debug, Default)]
pub struct InMemoryTreeStore {
    bots: RwLock<HashMap<String, BTreeMap<String, StoredTree>>>,
}

impl InMemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored trees across all bots
    pub async fn len(&self) -> usize {
        self.bots.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TreeStore for InMemoryTreeStore {
    async fn load(&self, bot_id: &str, source_id: &str) -> Result<Option<StoredTree>> {
        let bots = self.bots.read().await;
        Ok(bots
            .get(bot_id)
            .and_then(|sources| sources.get(source_id))
            .cloned())
    }

    async fn list_sources(&self, bot_id: &str) -> Result<Vec<String>> {
        let bots = self.bots.read().await;
        Ok(bots
            .get(bot_id)
            .map(|sources| sources.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn replace(&self, tree: StoredTree) -> Result<()> {
        validate_key(&tree.bot_id)?;
        validate_key(&tree.source_id)?;

        let mut bots = self.bots.write().await;
        bots.entry(tree.bot_id.clone())
            .or_default()
            .insert(tree.source_id.clone(), tree);
        Ok(())
    }

    async fn remove(&self, bot_id: &str, source_id: &str) -> Result<bool> {
        let mut bots = self.bots.write().await;
        let Some(sources) = bots.get_mut(bot_id) else {
            return Ok(false);
        };
        let removed = sources.remove(source_id).is_some();
        if sources.is_empty() {
            bots.remove(bot_id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowbot_document_tree::{DocumentType, StructureKind, TreeIndex, TreeSection};
    use pretty_assertions::assert_eq;

    fn tree(bot: &str, source: &str, content: &str) -> StoredTree {
        let index = TreeIndex::new(
            vec![TreeSection::leaf("1", "Doc", content, 0).with_summary(content)],
            DocumentType::Generic,
            source,
            StructureKind::Unstructured,
        );
        StoredTree::new(bot, source, index)
    }

    #[tokio::test]
    async fn test_replace_and_load() {
        let store = InMemoryTreeStore::new();
        assert!(store.is_empty().await);

        store.replace(tree("bot", "b-source", "v1")).await.expect("replace");
        store.replace(tree("bot", "a-source", "v1")).await.expect("replace");
        store.replace(tree("bot", "b-source", "v2")).await.expect("replace");

        assert_eq!(store.len().await, 2);
        assert_eq!(
            store.list_sources("bot").await.expect("list"),
            vec!["a-source".to_string(), "b-source".to_string()]
        );

        let loaded = store.load("bot", "b-source").await.expect("load").expect("present");
        assert_eq!(loaded.index.root_sections[0].content, "v2");
        assert!(store.load("bot", "missing").await.expect("load").is_none());
        assert!(store.list_sources("other").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryTreeStore::new();
        store.replace(tree("bot", "src", "v1")).await.expect("replace");

        assert!(store.remove("bot", "src").await.expect("remove"));
        assert!(!store.remove("bot", "src").await.expect("remove"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let store = InMemoryTreeStore::new();
        assert!(store.replace(tree("bot", "../escape", "v1")).await.is_err());
    }
}
