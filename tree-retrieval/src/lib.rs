/*!
# Knowbot Tree Retrieval

Reasoning-guided search over summarized document trees.

Instead of ranking flat chunks by vector similarity, the retriever walks
every tree of a bot top-down, one level at a time, and lets a relevance
judge decide for each node whether to accept it, drill into its children
or prune it.

## Architecture

```text
Query + bot id
  └─> Load trees (storage collaborator)
        └─> Frontier = top-level sections of every tree
              ├─> Judge frontier in batches (concurrently, with timeouts)
              ├─> score < threshold         -> prune
              ├─> leaf, or judged sufficient -> accept
              └─> otherwise                 -> children join next frontier
        └─> Rank accepted sections (confidence, then document order)
              └─> build_context_from_results -> prompt block
```

A failed or malformed judgment is treated as scoring exactly at the
threshold with a request to descend, so a flaky judge costs precision
rather than recall. The walk never goes deeper than
[`RetrievalConfig::max_depth`] levels.

## Example

```rust
use knowbot_document_tree::{DocumentType, StructureKind, TreeIndex, TreeSection};
use knowbot_language_model::LexicalModel;
use knowbot_tree_retrieval::{RetrievalConfig, TreeRetriever, build_context_from_results};
use knowbot_tree_store::{InMemoryTreeStore, StoredTree, TreeStore};
use std::sync::Arc;

# #[tokio::main]
# async fn main() -> Result<(), Box<dyn std::error::Error>> {
let root = TreeSection::internal(
    "1",
    "Policy",
    vec![
        TreeSection::leaf("1.1", "Leave", "Employees get 16 weeks.", 1)
            .with_summary("Employees get 16 weeks."),
        TreeSection::leaf("1.2", "Expenses", "Submit via the portal.", 1)
            .with_summary("Submit via the portal."),
    ],
    0,
)
.with_summary("Leave: Employees get 16 weeks.; Expenses: Submit via the portal.");
let index = TreeIndex::new(vec![root], DocumentType::Policy, "handbook.md", StructureKind::Markdown);

let store = Arc::new(InMemoryTreeStore::new());
store.replace(StoredTree::new("acme", "handbook", index)).await?;

let retriever = TreeRetriever::new(RetrievalConfig::default(), Arc::new(LexicalModel::new()), store)?;
let result = retriever.search_with_reasoning("parental leave policy", "acme", 50).await?;

assert_eq!(result.relevant_sections.len(), 1);
assert_eq!(result.relevant_sections[0].section_content, "Employees get 16 weeks.");
println!("{}", build_context_from_results(&result));
# Ok(())
# }
```
*/

mod config;
mod context;
mod error;
mod judgment;
mod result;
mod retrieval;
mod traversal;

pub use config::{MAX_CONFIDENCE, RetrievalConfig};
pub use context::{build_context_from_results, build_context_with_budget};
pub use error::{Result, RetrievalError};
pub use judgment::{
    JudgeAction, Judgment, JudgmentError, batch_node_id, validate_batch, validate_judgment,
};
pub use result::{RelevantSection, RetrievalResult, Termination, TraversalStats};
pub use retrieval::{CacheStats, TreeRetriever};
