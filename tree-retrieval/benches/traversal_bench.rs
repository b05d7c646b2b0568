use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use knowbot_document_tree::{DocumentType, StructureKind, TreeIndex, TreeSection};
use knowbot_language_model::LexicalModel;
use knowbot_tree_retrieval::{RetrievalConfig, TreeRetriever};
use knowbot_tree_store::{InMemoryTreeStore, StoredTree, TreeStore};
use std::sync::Arc;
use tokio::runtime::Runtime;

const TOPICS: &[&str] = &[
    "leave", "expenses", "travel", "security", "payroll", "benefits", "hiring", "training",
];

/// Tree with `fanout` sections per level, `depth` levels deep
fn synthetic_section(id: String, level: usize, depth: usize, fanout: usize) -> TreeSection {
    let topic = TOPICS[id.len() % TOPICS.len()];
    if level + 1 == depth {
        let content = format!("Rules about {topic} for section {id}.");
        return TreeSection::leaf(id.clone(), format!("{topic} {id}"), content.clone(), level)
            .with_summary(content);
    }

    let children = (0..fanout)
        .map(|position| {
            synthetic_section(TreeSection::child_id(&id, position), level + 1, depth, fanout)
        })
        .collect();
    TreeSection::internal(id.clone(), format!("{topic} {id}"), children, level)
        .with_summary(format!("Overview of {topic} topics"))
}

fn synthetic_index(depth: usize, fanout: usize) -> TreeIndex {
    let roots = (0..fanout)
        .map(|position| synthetic_section(TreeSection::root_id(position), 0, depth, fanout))
        .collect();
    TreeIndex::new(roots, DocumentType::Generic, "synthetic.md", StructureKind::Markdown)
}

fn bench_tree_shapes(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("tree_traversal");

    for (depth, fanout) in [(2, 8), (3, 6), (4, 4)] {
        let store = Arc::new(InMemoryTreeStore::new());
        let tree = StoredTree::new("bench", "synthetic", synthetic_index(depth, fanout));
        runtime.block_on(store.replace(tree)).unwrap();
        let config = RetrievalConfig {
            enable_cache: false,
            ..RetrievalConfig::broad()
        };
        let retriever =
            TreeRetriever::new(config, Arc::new(LexicalModel::new()), store).unwrap();

        group.bench_with_input(
            BenchmarkId::new("shape", format!("depth{depth}_fanout{fanout}")),
            &retriever,
            |b, retriever| {
                b.to_async(&runtime).iter(|| async {
                    let result = retriever
                        .search_with_reasoning(black_box("travel expenses rules"), "bench", 50)
                        .await
                        .unwrap();
                    black_box(result);
                });
            },
        );
    }

    group.finish();
}

fn bench_cached_search(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let store = Arc::new(InMemoryTreeStore::new());
    runtime
        .block_on(store.replace(StoredTree::new("bench", "synthetic", synthetic_index(3, 6))))
        .unwrap();
    let retriever =
        TreeRetriever::new(RetrievalConfig::default(), Arc::new(LexicalModel::new()), store)
            .unwrap();

    c.bench_function("cached_search", |b| {
        b.to_async(&runtime).iter(|| async {
            let result = retriever
                .search_with_reasoning(black_box("leave rules"), "bench", 50)
                .await
                .unwrap();
            black_box(result);
        });
    });
}

criterion_group!(benches, bench_tree_shapes, bench_cached_search);
criterion_main!(benches);
