use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A section selected for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantSection {
    /// Leaf content, or the full text below an accepted internal node
    pub section_content: String,

    /// Label of the knowledge source, for citations
    pub source_name: String,
    pub source_id: String,
    pub section_id: String,

    /// When the source's tree was last rebuilt
    pub source_updated_at: DateTime<Utc>,

    /// Titles from the top-level section down to this one
    pub path: Vec<String>,

    pub confidence: u8,
}

impl RelevantSection {
    /// Path rendered for citations: `Policy > Leave`
    pub fn path_label(&self) -> String {
        self.path.join(" > ")
    }
}

/// How a traversal ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Termination {
    /// No candidates left to judge
    #[default]
    FrontierExhausted,
    /// Stopped at the configured depth with candidates still pending
    DepthCap,
}

/// Traversal statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalStats {
    pub levels_visited: usize,
    pub nodes_considered: usize,
    pub judge_calls: usize,

    /// Candidates handled by the at-threshold fallback after a failed
    /// call or an invalid judgment
    pub judge_failures: usize,
    pub pruned: usize,
    pub termination: Termination,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
}

/// Output of one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub query: String,

    /// Ranked by confidence, most relevant first
    pub relevant_sections: Vec<RelevantSection>,

    /// Human-readable trace of traversal decisions
    pub reasoning: Vec<String>,

    /// Threshold in effect for this query
    pub confidence_threshold: u8,

    pub stats: TraversalStats,
}

impl RetrievalResult {
    pub fn new(query: impl Into<String>, confidence_threshold: u8) -> Self {
        Self {
            query: query.into(),
            relevant_sections: Vec::new(),
            reasoning: Vec::new(),
            confidence_threshold,
            stats: TraversalStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.relevant_sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relevant_sections.is_empty()
    }

    /// Whether the traversal stopped before the frontier was exhausted
    pub fn is_partial(&self) -> bool {
        self.stats.termination == Termination::DepthCap
    }
}
