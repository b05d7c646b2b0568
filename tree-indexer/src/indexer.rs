use crate::classify::classify_document;
use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::summarize::Summarizer;
use futures::future::join_all;
use knowbot_document_tree::{TreeIndex, TreeSection};
use knowbot_language_model::LanguageModel;
use knowbot_section_splitter::{SplitOutcome, Splitter};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

const UTF8_BOM: &str = "\u{feff}";

/// Progress callback for build operations
pub type ProgressCallback = Arc<dyn Fn(BuildProgress) + Send + Sync>;

/// Build progress information
#[derive(Debug, Clone)]
pub struct BuildProgress {
    pub phase: BuildPhase,
    pub current: usize,
    pub total: usize,
    pub current_section: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Splitting,
    Summarizing,
    Classifying,
    Complete,
}

/// Statistics about one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub sections: usize,
    pub leaves: usize,
    pub summaries_generated: usize,
    pub summaries_degraded: usize,
    pub max_depth: usize,
    pub elapsed_ms: u64,
}

/// Builds [`TreeIndex`] values from plain text
pub struct TreeIndexer {
    config: IndexerConfig,
    splitter: Splitter,
    model: Arc<dyn LanguageModel>,
    progress: Option<ProgressCallback>,
}

impl TreeIndexer {
    /// Create new indexer
    pub fn new(config: IndexerConfig, model: Arc<dyn LanguageModel>) -> Result<Self> {
        config.validate().map_err(IndexerError::InvalidConfig)?;
        let splitter = Splitter::new(config.splitter.clone())?;

        Ok(Self {
            config,
            splitter,
            model,
            progress: None,
        })
    }

    /// Report progress of every build to `callback`
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Name of the model producing summaries
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Build a tree from extracted plain text
    pub async fn build_tree_index_from_text(
        &self,
        text: &str,
        source_name: &str,
    ) -> Result<TreeIndex> {
        let (index, _) = self.build_with_stats(text, source_name).await?;
        Ok(index)
    }

    /// Build a tree and report what the build did
    pub async fn build_with_stats(
        &self,
        text: &str,
        source_name: &str,
    ) -> Result<(TreeIndex, BuildStats)> {
        if text.trim().is_empty() {
            return Err(IndexerError::ExtractionEmpty);
        }

        info!(
            "Building tree index for {source_name} ({} chars)",
            text.len()
        );
        self.report_progress(BuildPhase::Splitting, 0, 0, None);
        let outcome = self.splitter.split(text)?;
        self.build_from_outcome(outcome, source_name).await
    }

    /// Build a tree from raw bytes, which must be UTF-8 text
    pub async fn build_tree_index(&self, bytes: &[u8], source_name: &str) -> Result<TreeIndex> {
        let text = std::str::from_utf8(bytes)?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
        self.build_tree_index_from_text(text, source_name).await
    }

    /// Build a tree from a text file, labelled with the file name
    pub async fn build_tree_index_from_file(&self, path: impl AsRef<Path>) -> Result<TreeIndex> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        self.build_tree_index(&bytes, &label).await
    }

    /// Build one tree over several named documents, one top-level section
    /// per non-blank document
    pub async fn build_tree_index_from_documents<N, T>(
        &self,
        documents: &[(N, T)],
        source_name: &str,
    ) -> Result<TreeIndex>
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        info!(
            "Building tree index for {source_name} from {} documents",
            documents.len()
        );
        self.report_progress(BuildPhase::Splitting, 0, documents.len(), None);
        let outcome = self.splitter.split_documents(documents)?;
        let (index, _) = self.build_from_outcome(outcome, source_name).await?;
        Ok(index)
    }

    async fn build_from_outcome(
        &self,
        outcome: SplitOutcome,
        source_name: &str,
    ) -> Result<(TreeIndex, BuildStats)> {
        let started = Instant::now();
        let total = outcome.section_count();

        let summarizer = Summarizer::new(
            Arc::clone(&self.model),
            self.config.max_concurrent_summaries,
            self.config.summary_timeout(),
            self.config.fallback_summary_chars,
            self.config.max_summary_input_chars,
            self.progress.clone(),
            total,
        );

        let root_sections: Vec<TreeSection> = join_all(
            outcome
                .sections
                .iter()
                .enumerate()
                .map(|(position, draft)| {
                    summarizer.summarize_section(draft, TreeSection::root_id(position), 0)
                }),
        )
        .await;

        let generated = summarizer.generated();
        let degraded = summarizer.degraded();
        if generated == 0 && degraded > 0 {
            // Only a model that never answered aborts; bad answers degrade.
            if self.config.abort_if_model_unreachable && summarizer.unreachable() == degraded {
                return Err(IndexerError::LanguageModelUnavailable(format!(
                    "all {degraded} summary calls to {} failed",
                    self.model.name()
                )));
            }
            warn!(
                "Every summary for {source_name} is a truncated-content fallback ({degraded} sections)"
            );
        }

        self.report_progress(BuildPhase::Classifying, total, total, None);
        let document_type = classify_document(outcome.structure, &root_sections);
        let index = TreeIndex::new(root_sections, document_type, source_name, outcome.structure);

        let stats = BuildStats {
            sections: index.total_sections,
            leaves: index.leaf_count(),
            summaries_generated: generated,
            summaries_degraded: degraded,
            max_depth: index.height(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            "Built tree index for {source_name}: {} sections, {} leaves, depth {}, {} degraded summaries, type {}",
            stats.sections, stats.leaves, stats.max_depth, stats.summaries_degraded, index.document_type
        );
        self.report_progress(BuildPhase::Complete, total, total, None);

        Ok((index, stats))
    }

    fn report_progress(
        &self,
        phase: BuildPhase,
        current: usize,
        total: usize,
        current_section: Option<String>,
    ) {
        if let Some(callback) = &self.progress {
            callback(BuildProgress {
                phase,
                current,
                total,
                current_section,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowbot_language_model::LexicalModel;

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = IndexerConfig::default();
        config.max_concurrent_summaries = 0;

        let result = TreeIndexer::new(config, Arc::new(LexicalModel::new()));
        assert!(matches!(result, Err(IndexerError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_whitespace_only_is_extraction_empty() {
        let indexer = TreeIndexer::new(IndexerConfig::default(), Arc::new(LexicalModel::new()))
            .expect("indexer");

        let err = indexer
            .build_tree_index_from_text(" \n\t\n ", "blank.txt")
            .await
            .expect_err("empty input");
        assert!(matches!(err, IndexerError::ExtractionEmpty));
    }

    #[tokio::test]
    async fn test_bom_is_stripped() {
        let indexer = TreeIndexer::new(IndexerConfig::default(), Arc::new(LexicalModel::new()))
            .expect("indexer");

        let index = indexer
            .build_tree_index("\u{feff}Plain note.".as_bytes(), "note.txt")
            .await
            .expect("build");
        assert_eq!(index.get_all_content(), "Plain note.");
    }
}
