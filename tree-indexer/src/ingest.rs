use crate::error::{IndexerError, Result};
use crate::indexer::{BuildStats, TreeIndexer};
use chrono::{DateTime, Utc};
use knowbot_document_tree::{DocumentType, normalize_whitespace};
use knowbot_section_splitter::SplitterConfig;
use knowbot_tree_store::{StoredTree, TreeStore, validate_key};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

type SourceKey = (String, String);

/// Result of ingesting one knowledge source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The stored tree was built from the same text, label and splitter
    /// settings; nothing was rebuilt
    Unchanged { updated_at: DateTime<Utc> },

    /// A new tree was built and replaced the stored one
    Rebuilt {
        stats: BuildStats,
        document_type: DocumentType,
    },
}

/// Builds trees and keeps the store in sync, at most one build per source
/// at a time
pub struct KnowledgeIngestor {
    indexer: Arc<TreeIndexer>,
    store: Arc<dyn TreeStore>,
    locks: Mutex<HashMap<SourceKey, Arc<Mutex<()>>>>,
}

impl KnowledgeIngestor {
    pub fn new(indexer: Arc<TreeIndexer>, store: Arc<dyn TreeStore>) -> Self {
        Self {
            indexer,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn indexer(&self) -> &TreeIndexer {
        &self.indexer
    }

    /// Index `text` as the source `(bot_id, source_id)`, replacing the
    /// stored tree unless it was built from the same text under the same
    /// label and splitter settings
    pub async fn ingest(
        &self,
        bot_id: &str,
        source_id: &str,
        text: &str,
        source_name: &str,
    ) -> Result<IngestOutcome> {
        validate_key(bot_id)?;
        validate_key(source_id)?;
        if text.trim().is_empty() {
            return Err(IndexerError::ExtractionEmpty);
        }

        let lock = self.source_lock(bot_id, source_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.ingest_locked(bot_id, source_id, text, source_name).await
        };
        self.release_lock(bot_id, source_id, lock).await;
        outcome
    }

    async fn ingest_locked(
        &self,
        bot_id: &str,
        source_id: &str,
        text: &str,
        source_name: &str,
    ) -> Result<IngestOutcome> {
        let digest = fingerprint(text, &self.indexer.config().splitter);
        if let Some(existing) = self.store.load(bot_id, source_id).await?
            && existing.fingerprint.as_deref() == Some(digest.as_str())
            && existing.index.source_name == source_name
        {
            info!("Source {bot_id}/{source_id} unchanged, keeping stored tree");
            return Ok(IngestOutcome::Unchanged {
                updated_at: existing.updated_at,
            });
        }

        let (index, stats) = self.indexer.build_with_stats(text, source_name).await?;
        let document_type = index.document_type;
        self.store
            .replace(StoredTree::new(bot_id, source_id, index).with_fingerprint(digest))
            .await?;

        info!(
            "Rebuilt source {bot_id}/{source_id}: {} sections in {}ms",
            stats.sections, stats.elapsed_ms
        );
        Ok(IngestOutcome::Rebuilt {
            stats,
            document_type,
        })
    }

    /// Delete a source's tree; returns whether one existed
    pub async fn remove(&self, bot_id: &str, source_id: &str) -> Result<bool> {
        let lock = self.source_lock(bot_id, source_id).await;
        let removed = {
            let _guard = lock.lock().await;
            self.store.remove(bot_id, source_id).await
        };
        self.release_lock(bot_id, source_id, lock).await;
        Ok(removed?)
    }

    async fn source_lock(&self, bot_id: &str, source_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry((bot_id.to_string(), source_id.to_string()))
                .or_default(),
        )
    }

    /// Drop the per-source lock once no other task holds or awaits it
    async fn release_lock(&self, bot_id: &str, source_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference lives in the map, the other is `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&(bot_id.to_string(), source_id.to_string()));
            debug!("Released lock for {bot_id}/{source_id}");
        }
    }
}

/// SHA-256 of the whitespace-normalized text and the splitter settings
/// that shape its tree, hex encoded
pub fn fingerprint(text: &str, splitter: &SplitterConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_whitespace(text).as_bytes());
    hasher.update([0]);
    hasher.update(
        format!(
            "{}/{}/{}/{}/{}/{}/{}/{:?}",
            splitter.target_leaf_chars,
            splitter.max_leaf_chars,
            splitter.min_leaf_chars,
            splitter.max_depth,
            splitter.max_sections,
            splitter.max_children,
            splitter.min_markers,
            splitter.strategy
        )
        .as_bytes(),
    );
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use knowbot_language_model::LexicalModel;
    use knowbot_tree_store::InMemoryTreeStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fingerprint_ignores_whitespace_layout() {
        let splitter = SplitterConfig::default();
        assert_eq!(
            fingerprint("Employees get\n16 weeks.", &splitter),
            fingerprint("  Employees   get 16\tweeks.  ", &splitter)
        );
        assert_ne!(
            fingerprint("16 weeks", &splitter),
            fingerprint("18 weeks", &splitter)
        );
        assert_eq!(fingerprint("x", &splitter).len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_splitter_settings() {
        assert_ne!(
            fingerprint("16 weeks", &SplitterConfig::default()),
            fingerprint("16 weeks", &SplitterConfig::small())
        );
    }

    #[tokio::test]
    async fn test_idle_source_locks_are_dropped() {
        let indexer = TreeIndexer::new(IndexerConfig::default(), Arc::new(LexicalModel::new()))
            .expect("indexer");
        let ingestor = KnowledgeIngestor::new(Arc::new(indexer), Arc::new(InMemoryTreeStore::new()));

        for source in ["a", "b", "c"] {
            ingestor
                .ingest("acme", source, "Employees get 16 weeks.", "leave.txt")
                .await
                .expect("ingest");
        }
        assert!(ingestor.locks.lock().await.is_empty());

        assert!(ingestor.remove("acme", "a").await.expect("remove"));
        assert!(!ingestor.remove("acme", "missing").await.expect("remove"));
        assert!(ingestor.locks.lock().await.is_empty());
    }
}
