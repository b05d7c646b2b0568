//! # Knowbot Tree Store
//!
//! Persistence for built document trees, keyed by `(bot_id, source_id)`.
//!
//! A store is a plain key-value map: every rebuild replaces a source's
//! tree wholesale, and readers always see either the old or the new tree.
//!
//! - [`InMemoryTreeStore`]: process-local map, for tests and embedding
//! - [`JsonFileTreeStore`]: one JSON file per source under
//!   `<root>/<bot_id>/<source_id>.json`, written atomically
//!
//! ## Example
//!
//! ```
//! use knowbot_document_tree::{DocumentType, StructureKind, TreeIndex, TreeSection};
//! use knowbot_tree_store::{InMemoryTreeStore, StoredTree, TreeStore};
//!
//! # #[tokio::main]
//! # async fn main() -> knowbot_tree_store::Result<()> {
//! let store = InMemoryTreeStore::new();
//! let index = TreeIndex::new(
//!     vec![TreeSection::leaf("1", "Leave", "Employees get 16 weeks.", 0)],
//!     DocumentType::Policy,
//!     "handbook.md",
//!     StructureKind::Unstructured,
//! );
//! store.replace(StoredTree::new("acme-bot", "handbook", index)).await?;
//!
//! assert_eq!(store.list_sources("acme-bot").await?, vec!["handbook".to_string()]);
//! # Ok(())
//! # }
//! ```

mod error;
mod json_file;
mod memory;

pub use error::{Result, TreeStoreError};
pub use json_file::JsonFileTreeStore;
pub use memory::InMemoryTreeStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use knowbot_document_tree::TreeIndex;
use serde::{Deserialize, Serialize};

const MAX_KEY_LEN: usize = 128;

/// A tree as persisted for one knowledge source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTree {
    pub bot_id: String,
    pub source_id: String,

    /// When this tree replaced the previous one
    pub updated_at: DateTime<Utc>,

    /// Digest of the text the tree was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    pub index: TreeIndex,
}

impl StoredTree {
    pub fn new(bot_id: impl Into<String>, source_id: impl Into<String>, index: TreeIndex) -> Self {
        Self {
            bot_id: bot_id.into(),
            source_id: source_id.into(),
            updated_at: Utc::now(),
            fingerprint: None,
            index,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }
}

/// Key-value storage of trees per `(bot_id, source_id)`
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Tree for one source, `None` when the source has no tree
    async fn load(&self, bot_id: &str, source_id: &str) -> Result<Option<StoredTree>>;

    /// Source ids stored for a bot, sorted
    async fn list_sources(&self, bot_id: &str) -> Result<Vec<String>>;

    /// Store `tree`, replacing any previous tree for the same source
    async fn replace(&self, tree: StoredTree) -> Result<()>;

    /// Delete a source's tree; returns whether one existed
    async fn remove(&self, bot_id: &str, source_id: &str) -> Result<bool>;
}

/// Reject ids that cannot double as file names
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(TreeStoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("acme-bot").is_ok());
        assert!(validate_key("handbook_v2.md").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key(&"x".repeat(200)).is_err());
    }
}
