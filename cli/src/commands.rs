use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use knowbot_document_tree::{TreeSection, truncate_with_ellipsis};
use knowbot_language_model::{LanguageModel, LexicalModel, OpenAiCompatibleModel};
use knowbot_tree_indexer::{IngestOutcome, KnowledgeIngestor, TreeIndexer};
use knowbot_tree_retrieval::{TreeRetriever, build_context_from_results};
use knowbot_tree_store::{JsonFileTreeStore, TreeStore};
use log::debug;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Index knowledge sources into summarized trees and query them
#[derive(Debug, Parser)]
#[command(name = "knowbot", version)]
pub struct Cli {
    /// Path to a knowbot.toml config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory of the tree store (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub store_dir: Option<PathBuf>,

    /// Use the offline lexical model instead of the HTTP model
    #[arg(long, global = true)]
    pub offline: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build and store the tree of a text file
    Index(IndexArgs),

    /// Search a bot's trees and print the assembled context
    Query(QueryArgs),

    /// Print the outline of a stored tree
    Show(ShowArgs),

    /// List the stored sources of a bot
    Sources(SourcesArgs),
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Text file to index
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[arg(long)]
    pub bot: String,

    /// Source id (defaults to the file stem)
    #[arg(long)]
    pub source: Option<String>,

    /// Display name used in citations (defaults to the file name)
    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(value_name = "QUERY")]
    pub query: String,

    #[arg(long)]
    pub bot: String,

    /// Confidence threshold 0-100 (defaults to the configured one)
    #[arg(short, long)]
    pub threshold: Option<u8>,

    /// Print the traversal trace
    #[arg(long)]
    pub show_reasoning: bool,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long)]
    pub bot: String,

    #[arg(long)]
    pub source: String,
}

#[derive(Debug, Args)]
pub struct SourcesArgs {
    #[arg(long)]
    pub bot: String,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = CliConfig::load(self.config.as_deref())?;
        let store_dir = config.resolve_store_dir(self.store_dir.clone());
        let store: Arc<dyn TreeStore> = Arc::new(
            JsonFileTreeStore::open(&store_dir)
                .await
                .with_context(|| format!("Failed to open tree store at {}", store_dir.display()))?,
        );

        match self.command {
            Command::Index(args) => {
                let model = build_model(&config, self.offline)?;
                run_index(args, &config, model, store).await
            }
            Command::Query(args) => {
                let model = build_model(&config, self.offline)?;
                run_query(args, &config, model, store).await
            }
            Command::Show(args) => run_show(args, store).await,
            Command::Sources(args) => run_sources(args, store).await,
        }
    }
}

fn build_model(config: &CliConfig, offline: bool) -> Result<Arc<dyn LanguageModel>> {
    if offline {
        debug!("Using the offline lexical model");
        return Ok(Arc::new(LexicalModel::new()));
    }
    let model = OpenAiCompatibleModel::new(config.language_model.clone())
        .context("Failed to initialize language model (use --offline to run without one)")?;
    debug!(
        "Using model {} at {}",
        config.language_model.model,
        config.language_model.base_url
    );
    Ok(Arc::new(model))
}

async fn run_index(
    args: IndexArgs,
    config: &CliConfig,
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn TreeStore>,
) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8 text", args.file.display()))?;

    let source_id = match args.source {
        Some(source) => source,
        None => source_id_from_path(&args.file)?,
    };
    let label = args.label.unwrap_or_else(|| file_label(&args.file));

    println!(
        "{} Indexing {} as {}/{}",
        "▶".bright_blue(),
        args.file.display(),
        args.bot,
        source_id
    );

    let indexer = TreeIndexer::new(config.indexer.clone(), model)
        .context("Failed to initialize indexer")?;
    let ingestor = KnowledgeIngestor::new(Arc::new(indexer), store);
    let outcome = ingestor
        .ingest(&args.bot, &source_id, &text, &label)
        .await
        .context("Failed to index source")?;

    match outcome {
        IngestOutcome::Unchanged { updated_at } => {
            println!(
                "{} Unchanged since {}, kept stored tree",
                "✓".bright_green(),
                updated_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        IngestOutcome::Rebuilt {
            stats,
            document_type,
        } => {
            println!("{} Indexing complete!", "✓".bright_green());
            println!("  Sections: {}", stats.sections.bright_cyan());
            println!("  Leaves: {}", stats.leaves.bright_cyan());
            println!("  Depth: {}", stats.max_depth.bright_cyan());
            println!("  Document type: {}", document_type.bright_cyan());
            if stats.summaries_degraded > 0 {
                println!(
                    "  {} {} summaries fell back to raw text",
                    "!".bright_yellow(),
                    stats.summaries_degraded
                );
            }
        }
    }
    Ok(())
}

async fn run_query(
    args: QueryArgs,
    config: &CliConfig,
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn TreeStore>,
) -> Result<()> {
    let retriever = TreeRetriever::new(config.retrieval.clone(), model, store)
        .context("Failed to initialize retriever")?;
    let threshold = args
        .threshold
        .unwrap_or(config.retrieval.default_confidence_threshold);
    let result = retriever
        .search_with_reasoning(&args.query, &args.bot, threshold)
        .await
        .context("Search failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if args.show_reasoning {
        println!("{}", "Reasoning:".bright_blue());
        for line in &result.reasoning {
            println!("  {}", line.dimmed());
        }
        println!();
    }

    if result.is_empty() {
        println!("{} No relevant sections found", "✗".bright_red());
        return Ok(());
    }

    print!("{}", build_context_from_results(&result));
    if result.is_partial() {
        println!(
            "\n{} Search stopped at the depth cap; results may be incomplete",
            "!".bright_yellow()
        );
    }
    Ok(())
}

async fn run_show(args: ShowArgs, store: Arc<dyn TreeStore>) -> Result<()> {
    let Some(tree) = store
        .load(&args.bot, &args.source)
        .await
        .context("Failed to load tree")?
    else {
        anyhow::bail!(
            "No tree for {}/{}. Run 'knowbot index' first.",
            args.bot,
            args.source
        );
    };

    let index = &tree.index;
    println!(
        "{} {} ({}, {} structure, {} sections)",
        "▶".bright_blue(),
        index.source_name.bright_cyan(),
        index.document_type,
        index.structure,
        index.total_sections
    );
    println!(
        "  Updated: {}",
        tree.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for section in &index.root_sections {
        print_outline(section);
    }
    Ok(())
}

async fn run_sources(args: SourcesArgs, store: Arc<dyn TreeStore>) -> Result<()> {
    let sources = store
        .list_sources(&args.bot)
        .await
        .context("Failed to list sources")?;
    if sources.is_empty() {
        println!("No sources indexed for {} yet.", args.bot);
        return Ok(());
    }

    for source_id in sources {
        match store.load(&args.bot, &source_id).await {
            Ok(Some(tree)) => println!(
                "{}  {}  {}",
                source_id.bright_cyan(),
                tree.index.source_name,
                tree.updated_at.format("%Y-%m-%d %H:%M").dimmed()
            ),
            Ok(None) => println!("{}  {}", source_id.bright_cyan(), "(missing)".bright_red()),
            Err(err) => println!(
                "{}  {}",
                source_id.bright_cyan(),
                format!("(unreadable: {err})").bright_red()
            ),
        }
    }
    Ok(())
}

fn print_outline(section: &TreeSection) {
    let indent = "  ".repeat(section.level + 1);
    let marker = if section.summary_degraded { " [degraded]" } else { "" };
    println!(
        "{indent}{} {}{}",
        section.id.bright_yellow(),
        section.title,
        marker.bright_red()
    );
    if !section.summary.is_empty() {
        println!(
            "{indent}  {}",
            truncate_with_ellipsis(&section.summary, 100).dimmed()
        );
    }
    for child in &section.children {
        print_outline(child);
    }
}

/// Source id from a file stem, with characters a store key cannot hold
/// replaced by '-'
pub fn source_id_from_path(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let id = id.trim_start_matches('.').to_string();
    if id.is_empty() {
        anyhow::bail!(
            "Cannot derive a source id from {}; pass --source",
            path.display()
        );
    }
    Ok(id)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_id_from_path() {
        assert_eq!(
            source_id_from_path(Path::new("docs/Employee Handbook.md")).unwrap(),
            "Employee-Handbook"
        );
        assert_eq!(
            source_id_from_path(Path::new("/tmp/slack_export.2024.txt")).unwrap(),
            "slack_export.2024"
        );
        assert!(source_id_from_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "knowbot",
            "query",
            "parental leave",
            "--bot",
            "acme",
            "--threshold",
            "70",
            "--offline",
            "--store-dir",
            "/tmp/trees",
        ]);
        assert!(cli.offline);
        assert_eq!(cli.store_dir, Some(PathBuf::from("/tmp/trees")));
        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.query, "parental leave");
                assert_eq!(args.threshold, Some(70));
                assert!(!args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
