use crate::config::{MAX_CONFIDENCE, RetrievalConfig};
use crate::error::{Result, RetrievalError};
use crate::result::RetrievalResult;
use crate::traversal::Traversal;
use knowbot_document_tree::normalize_whitespace;
use knowbot_language_model::LanguageModel;
use knowbot_tree_store::{StoredTree, TreeStore};
use log::{debug, info, warn};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Reasoning-guided retrieval over the trees of a bot
pub struct TreeRetriever {
    config: RetrievalConfig,
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn TreeStore>,
    cache: Option<Mutex<LruCache<String, RetrievalResult>>>,
}

impl TreeRetriever {
    /// Create new retriever
    pub fn new(
        config: RetrievalConfig,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn TreeStore>,
    ) -> Result<Self> {
        config.validate().map_err(RetrievalError::InvalidConfig)?;

        let cache = if config.enable_cache {
            let size = NonZeroUsize::new(config.cache_size)
                .ok_or_else(|| RetrievalError::InvalidConfig("Invalid cache size".to_string()))?;
            Some(Mutex::new(LruCache::new(size)))
        } else {
            None
        };

        Ok(Self {
            config,
            model,
            store,
            cache,
        })
    }

    /// Answer `query` from every tree stored for `bot_id`.
    ///
    /// Sources whose tree cannot be loaded contribute no candidates; the
    /// reasoning trace records each one.
    pub async fn search_with_reasoning(
        &self,
        query: &str,
        bot_id: &str,
        confidence_threshold: u8,
    ) -> Result<RetrievalResult> {
        let start = Instant::now();
        self.validate_request(query, confidence_threshold)?;

        let (trees, skipped) = self.load_trees(bot_id).await?;
        let key = cache_key(bot_id, query, confidence_threshold, &trees);

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().await;
            if let Some(cached) = cache.get(&key) {
                info!("Cache hit for query: '{query}'");
                let mut result = cached.clone();
                result.stats.cache_hit = true;
                result.stats.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                return Ok(result);
            }
        }

        let mut result = self.traverse(query, &trees, confidence_threshold).await;
        if trees.is_empty() && skipped.is_empty() {
            result
                .reasoning
                .insert(0, format!("Bot {bot_id} has no indexed sources"));
        }
        for (position, line) in skipped.into_iter().enumerate() {
            result.reasoning.insert(position, line);
        }

        if let Some(cache) = &self.cache {
            cache.lock().await.put(key, result.clone());
        }
        Ok(result)
    }

    /// Answer `query` from an explicit, read-only collection of trees
    pub async fn search_trees(
        &self,
        query: &str,
        trees: &[StoredTree],
        confidence_threshold: u8,
    ) -> Result<RetrievalResult> {
        self.validate_request(query, confidence_threshold)?;
        Ok(self.traverse(query, trees, confidence_threshold).await)
    }

    /// [`Self::search_with_reasoning`] with the configured default threshold
    pub async fn search(&self, query: &str, bot_id: &str) -> Result<RetrievalResult> {
        self.search_with_reasoning(query, bot_id, self.config.default_confidence_threshold)
            .await
    }

    /// Clear result cache
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().await.clear();
            info!("Retrieval cache cleared");
        }
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        match &self.cache {
            Some(cache) => {
                let cache = cache.lock().await;
                CacheStats {
                    size: cache.len(),
                    capacity: cache.cap().get(),
                }
            }
            None => CacheStats {
                size: 0,
                capacity: 0,
            },
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    fn validate_request(&self, query: &str, confidence_threshold: u8) -> Result<()> {
        if confidence_threshold > MAX_CONFIDENCE {
            return Err(RetrievalError::InvalidThreshold(confidence_threshold));
        }

        let actual = query.trim().chars().count();
        if actual < self.config.min_query_length {
            return Err(RetrievalError::QueryTooShort {
                min: self.config.min_query_length,
                actual,
            });
        }
        Ok(())
    }

    async fn traverse(
        &self,
        query: &str,
        trees: &[StoredTree],
        confidence_threshold: u8,
    ) -> RetrievalResult {
        let query = query.trim();
        debug!(
            "Tree search for '{query}' over {} trees (threshold {confidence_threshold})",
            trees.len()
        );
        Traversal {
            model: self.model.as_ref(),
            config: &self.config,
            query,
            threshold: confidence_threshold,
        }
        .run(trees)
        .await
    }

    /// Load every tree of a bot, in source id order. Missing or unreadable
    /// trees are skipped with a reasoning line each.
    async fn load_trees(&self, bot_id: &str) -> Result<(Vec<StoredTree>, Vec<String>)> {
        let sources = self.store.list_sources(bot_id).await?;
        let mut trees = Vec::with_capacity(sources.len());
        let mut skipped = Vec::new();

        for source_id in sources {
            match self.store.load(bot_id, &source_id).await {
                Ok(Some(tree)) => trees.push(tree),
                Ok(None) => {
                    warn!("Tree for {bot_id}/{source_id} is missing, skipping source");
                    skipped.push(format!("Source {source_id} has no tree; skipped"));
                }
                Err(err) => {
                    warn!("Failed to load tree {bot_id}/{source_id}: {err}");
                    skipped.push(format!("Source {source_id} could not be loaded; skipped"));
                }
            }
        }
        Ok((trees, skipped))
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
}

/// Bot, normalized query, threshold and the version of every loaded tree
fn cache_key(bot_id: &str, query: &str, threshold: u8, trees: &[StoredTree]) -> String {
    let versions = trees
        .iter()
        .map(|tree| format!("{}@{}", tree.source_id, tree.updated_at.timestamp_micros()))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{bot_id}\u{1f}{}\u{1f}{threshold}\u{1f}{versions}",
        normalize_whitespace(query).to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowbot_document_tree::{DocumentType, StructureKind, TreeIndex, TreeSection};
    use pretty_assertions::assert_eq;

    fn tree(source: &str) -> StoredTree {
        let index = TreeIndex::new(
            vec![TreeSection::leaf("1", "Doc", "text", 0).with_summary("text")],
            DocumentType::Generic,
            source,
            StructureKind::Unstructured,
        );
        StoredTree::new("bot", source, index)
    }

    #[test]
    fn test_cache_key_normalizes_query() {
        let trees = vec![tree("a")];
        assert_eq!(
            cache_key("bot", "Parental  Leave", 50, &trees),
            cache_key("bot", " parental leave ", 50, &trees)
        );
        assert_ne!(
            cache_key("bot", "parental leave", 50, &trees),
            cache_key("bot", "parental leave", 60, &trees)
        );
    }

    #[test]
    fn test_cache_key_tracks_tree_versions() {
        let before = vec![tree("a")];
        let mut after = before.clone();
        after[0].updated_at += chrono::Duration::seconds(1);
        assert_ne!(
            cache_key("bot", "leave", 50, &before),
            cache_key("bot", "leave", 50, &after)
        );
    }
}
