use crate::error::Result;
use crate::{StoredTree, TreeStore, validate_key};
use async_trait::async_trait;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const TREE_EXTENSION: &str = "json";

/// Tree store backed by one JSON file per source:
/// `<root>/<bot_id>/<source_id>.json`.
///
/// Writes go to a temporary sibling file that is renamed over the target,
/// so readers never observe a partially written tree.
#[derive(Debug, Clone)]
pub struct JsonFileTreeStore {
    root: PathBuf,
}

impl JsonFileTreeStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!("Opened tree store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bot_dir(&self, bot_id: &str) -> Result<PathBuf> {
        validate_key(bot_id)?;
        Ok(self.root.join(bot_id))
    }

    fn tree_path(&self, bot_id: &str, source_id: &str) -> Result<PathBuf> {
        validate_key(source_id)?;
        Ok(self
            .bot_dir(bot_id)?
            .join(format!("{source_id}.{TREE_EXTENSION}")))
    }
}

#[async_trait]
impl TreeStore for JsonFileTreeStore {
    async fn load(&self, bot_id: &str, source_id: &str) -> Result<Option<StoredTree>> {
        let path = self.tree_path(bot_id, source_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let tree: StoredTree = serde_json::from_slice(&bytes)?;
        debug!(
            "Loaded tree {bot_id}/{source_id} ({} sections)",
            tree.index.total_sections
        );
        Ok(Some(tree))
    }

    async fn list_sources(&self, bot_id: &str) -> Result<Vec<String>> {
        let dir = self.bot_dir(bot_id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut sources = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(TREE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
                && validate_key(stem).is_ok()
            {
                sources.push(stem.to_string());
            }
        }
        sources.sort();
        Ok(sources)
    }

    async fn replace(&self, tree: StoredTree) -> Result<()> {
        let path = self.tree_path(&tree.bot_id, &tree.source_id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(&tree)?;
        let tmp = path.with_extension(format!("{TREE_EXTENSION}.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!(
            "Stored tree {}/{} ({} sections, {} bytes)",
            tree.bot_id,
            tree.source_id,
            tree.index.total_sections,
            bytes.len()
        );
        Ok(())
    }

    async fn remove(&self, bot_id: &str, source_id: &str) -> Result<bool> {
        let path = self.tree_path(bot_id, source_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed tree {bot_id}/{source_id}");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
