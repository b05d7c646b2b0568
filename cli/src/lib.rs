//! Operator binary for the knowbot tree index: build trees from text
//! files, inspect them, and run reasoning-guided queries against the JSON
//! tree store.

mod commands;
pub mod config;

pub use commands::{
    Cli, Command, IndexArgs, QueryArgs, ShowArgs, SourcesArgs, source_id_from_path,
};
pub use config::CliConfig;
