/*!
# Knowbot Tree Indexer

Turns extracted document text into a summarized [`TreeIndex`].

## Features

- **Structural splitting**: headings, numbered sections and chat boundaries
  become tree depth, with a length-bounded fallback
- **Bottom-up summaries**: every node gets a title and summary, parents
  only after all of their children
- **Bounded fan-out**: sibling subtrees summarized concurrently under a
  semaphore, each call behind a timeout
- **Partial degradation**: a failed summary falls back to truncated
  content instead of failing the build
- **Per-source ingestion**: fingerprinted rebuilds, one build per source
  at a time

## Example

```rust
use knowbot_language_model::LexicalModel;
use knowbot_tree_indexer::{IndexerConfig, TreeIndexer};
use std::sync::Arc;

# #[tokio::main]
# async fn main() -> knowbot_tree_indexer::Result<()> {
let indexer = TreeIndexer::new(IndexerConfig::default(), Arc::new(LexicalModel::new()))?;
let index = indexer
    .build_tree_index_from_text(
        "# Policy\n\n## Leave\nEmployees get 16 weeks.\n\n## Expenses\nSubmit via the portal.",
        "handbook.md",
    )
    .await?;

assert_eq!(index.total_sections, 3);
assert_eq!(index.root_sections[0].children[0].content, "Employees get 16 weeks.");
# Ok(())
# }
```
*/

mod classify;
mod config;
mod error;
mod indexer;
mod ingest;
mod summarize;

pub use classify::classify_document;
pub use config::IndexerConfig;
pub use error::{IndexerError, Result};
pub use indexer::{BuildPhase, BuildProgress, BuildStats, ProgressCallback, TreeIndexer};
pub use ingest::{IngestOutcome, KnowledgeIngestor, fingerprint};
pub use knowbot_document_tree::{TreeIndex, get_all_content};
