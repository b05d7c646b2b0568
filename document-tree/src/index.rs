use crate::section::{SectionIter, TreeSection};
use crate::text::join_parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred category of an indexed document. Metadata only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Policy,
    Faq,
    Transcript,
    Manual,
    #[default]
    Generic,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Policy => "policy",
            DocumentType::Faq => "faq",
            DocumentType::Transcript => "transcript",
            DocumentType::Manual => "manual",
            DocumentType::Generic => "generic",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which hierarchy markers shaped the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    /// `#`..`######` headings
    Markdown,
    /// `1.`, `1.2`, `Section 3:` style headings
    Numbered,
    /// Channel and date boundaries of chat exports
    Transcript,
    /// Length-bounded pieces only
    #[default]
    Unstructured,
    /// Several documents indexed with different structures
    Mixed,
}

impl StructureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureKind::Markdown => "markdown",
            StructureKind::Numbered => "numbered",
            StructureKind::Transcript => "transcript",
            StructureKind::Unstructured => "unstructured",
            StructureKind::Mixed => "mixed",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hierarchical index of one knowledge source.
///
/// Built once per ingestion and never mutated afterwards; re-indexing
/// replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeIndex {
    /// Top-level sections in document order
    pub root_sections: Vec<TreeSection>,

    /// Number of nodes reachable from `root_sections`
    pub total_sections: usize,

    pub document_type: DocumentType,

    /// Label of the knowledge source, used for citations
    pub source_name: String,

    #[serde(default)]
    pub structure: StructureKind,

    pub built_at: DateTime<Utc>,
}

impl TreeIndex {
    /// Create an index and compute `total_sections` from the tree
    pub fn new(
        root_sections: Vec<TreeSection>,
        document_type: DocumentType,
        source_name: impl Into<String>,
        structure: StructureKind,
    ) -> Self {
        let total_sections = Self::count_sections(&root_sections);
        Self {
            root_sections,
            total_sections,
            document_type,
            source_name: source_name.into(),
            structure,
            built_at: Utc::now(),
        }
    }

    /// Count every node reachable from `sections`
    pub fn count_sections(sections: &[TreeSection]) -> usize {
        sections.iter().map(TreeSection::count).sum()
    }

    /// Pre-order iterator over all sections
    pub fn iter(&self) -> SectionIter<'_> {
        SectionIter::over(&self.root_sections)
    }

    pub fn find(&self, id: &str) -> Option<&TreeSection> {
        self.iter().find(|section| section.id == id)
    }

    pub fn leaf_count(&self) -> usize {
        self.iter().filter(|section| section.is_leaf()).count()
    }

    /// Number of levels in the deepest branch
    pub fn height(&self) -> usize {
        self.root_sections
            .iter()
            .map(TreeSection::height)
            .max()
            .unwrap_or(0)
    }

    /// Whether the stored count still matches the tree
    pub fn is_consistent(&self) -> bool {
        self.total_sections == Self::count_sections(&self.root_sections)
    }

    /// Reconstruct the flat document: headings and leaf content in
    /// depth-first, left-to-right order, separated by blank lines.
    pub fn get_all_content(&self) -> String {
        let mut parts = Vec::new();
        for section in &self.root_sections {
            section.collect_text(&mut parts);
        }
        join_parts(&parts)
    }
}

/// Free-function form of [`TreeIndex::get_all_content`]
pub fn get_all_content(index: &TreeIndex) -> String {
    index.get_all_content()
}
