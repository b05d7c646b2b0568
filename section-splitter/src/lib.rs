//! # Knowbot Section Splitter
//!
//! Turns plain document text into a draft section hierarchy, ready for
//! summarization.
//!
//! ## Architecture
//!
//! ```text
//! Plain text
//!     │
//!     ├──> Structure Detection
//!     │    ├─> Markdown headings (#, ##, ...)
//!     │    ├─> Chat transcripts (channel + date boundaries)
//!     │    └─> Numbered headings (1., 1.2, Section 3:)
//!     │
//!     ├──> Tree Building (marker nesting = tree depth, capped)
//!     │    └─> or Length-bounded fallback (paragraph > sentence > word)
//!     │
//!     └──> Post-processing
//!          ├─> Split oversized leaves
//!          └─> Regroup wide nodes under synthetic parents
//! ```
//!
//! Every leaf's `content` is a contiguous, trimmed slice of the input, and
//! heading lines are kept verbatim in `heading`, so the input can be
//! reconstructed from the draft tree up to whitespace. A leaf cut out of
//! the middle of a token is marked `joins_previous` and reassembles with
//! no separator.
//!
//! ## Example
//!
//! ```
//! use knowbot_section_splitter::{Splitter, SplitterConfig};
//!
//! # fn main() -> Result<(), knowbot_section_splitter::SplitterError> {
//! let splitter = Splitter::new(SplitterConfig::default())?;
//! let outcome = splitter.split("# Policy\n\n## Leave\nEmployees get 16 weeks.\n\n## Expenses\nSubmit via the portal.")?;
//!
//! assert_eq!(outcome.sections.len(), 1);
//! assert_eq!(outcome.sections[0].children.len(), 2);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod splitter;
mod strategy;
mod structure;

pub use config::{SplitterConfig, SplittingStrategy};
pub use error::SplitterError;
use knowbot_document_tree::{TextPart, join_parts};

pub use knowbot_document_tree::StructureKind;
pub use splitter::Splitter;
pub use strategy::{LengthSplitter, Piece};

/// A section of the draft tree, before summarization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSection {
    /// Heading text, or a placeholder for synthetic sections
    pub title: String,

    /// Verbatim marker line, if the section was opened by one
    pub heading: Option<String>,

    /// Text owned by this section (empty when it has children)
    pub content: String,

    /// Child sections in document order
    pub children: Vec<DraftSection>,

    /// What produced this section
    pub origin: SectionOrigin,

    /// Content continues the previous leaf with no whitespace between them
    pub joins_previous: bool,
}

/// What produced a draft section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionOrigin {
    /// Markdown or numbered heading
    Heading,
    /// Chat channel boundary
    Channel,
    /// Chat messages sharing one date
    Date,
    /// Text before the first marker
    Preamble,
    /// Body text of a section that also has subsections
    Overview,
    /// Length-bounded piece
    Piece,
    /// Synthetic parent over length-split pieces or wide sibling lists
    Group,
    /// One input document
    Document,
}

impl SectionOrigin {
    /// Whether the title is a placeholder the summarizer should replace
    pub fn is_synthetic(self) -> bool {
        matches!(
            self,
            SectionOrigin::Preamble
                | SectionOrigin::Overview
                | SectionOrigin::Piece
                | SectionOrigin::Group
        )
    }
}

impl DraftSection {
    pub fn leaf(title: impl Into<String>, content: impl Into<String>, origin: SectionOrigin) -> Self {
        Self {
            title: title.into(),
            heading: None,
            content: content.into(),
            children: Vec::new(),
            origin,
            joins_previous: false,
        }
    }

    pub fn with_joins_previous(mut self, joins_previous: bool) -> Self {
        self.joins_previous = joins_previous;
        self
    }

    pub fn internal(
        title: impl Into<String>,
        children: Vec<DraftSection>,
        origin: SectionOrigin,
    ) -> Self {
        Self {
            title: title.into(),
            heading: None,
            content: String::new(),
            children,
            origin,
            joins_previous: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of sections in this subtree, including `self`
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(DraftSection::count).sum::<usize>()
    }

    /// Height of this subtree (a leaf has height 1)
    pub fn height(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(DraftSection::height)
            .max()
            .unwrap_or(0)
    }

    /// Headings and leaf content in document order
    pub fn collect_text<'a>(&'a self, parts: &mut Vec<TextPart<'a>>) {
        if let Some(heading) = self.heading.as_deref() {
            parts.push(TextPart::separate(heading));
        }
        if self.is_leaf() {
            if !self.content.is_empty() {
                parts.push(TextPart {
                    text: &self.content,
                    joined: self.joins_previous,
                });
            }
            return;
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }
}

/// Result of splitting one or more documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Which markers shaped the tree
    pub structure: StructureKind,

    /// Top-level draft sections in document order
    pub sections: Vec<DraftSection>,
}

impl SplitOutcome {
    /// Total number of draft sections
    pub fn section_count(&self) -> usize {
        self.sections.iter().map(DraftSection::count).sum()
    }

    /// Reassemble the text the draft tree covers
    pub fn reassemble(&self) -> String {
        let mut parts = Vec::new();
        for section in &self.sections {
            section.collect_text(&mut parts);
        }
        join_parts(&parts)
    }
}
