//! # Knowbot Document Tree
//!
//! Shared data model for hierarchical knowledge-source indexes.
//!
//! A [`TreeIndex`] is an ordered forest of [`TreeSection`] nodes. Leaves own
//! verbatim excerpts of the source text; internal nodes only aggregate their
//! children and carry a summary that lets a relevance judge decide whether to
//! drill down without reading the full text.
//!
//! ## Invariants
//!
//! - A leaf's `content` is a contiguous substring of the source text.
//! - Walking the tree in pre-order and emitting every `heading` plus every
//!   leaf `content` reconstructs the source text up to whitespace
//!   (see [`TreeIndex::get_all_content`] and [`normalize_whitespace`]).
//!   Leaves flagged `joins_previous` were cut out of one token and are
//!   glued back onto the preceding text without a separator.
//! - `total_sections` equals the number of nodes reachable from
//!   `root_sections`.
//!
//! ## Example
//!
//! ```
//! use knowbot_document_tree::{DocumentType, StructureKind, TreeIndex, TreeSection};
//!
//! let leaf = TreeSection::leaf("1.1", "Leave", "Employees get 16 weeks.", 1);
//! let root = TreeSection::internal("1", "Policy", vec![leaf], 0);
//! let index = TreeIndex::new(vec![root], DocumentType::Policy, "handbook.md", StructureKind::Markdown);
//!
//! assert_eq!(index.total_sections, 2);
//! assert_eq!(index.get_all_content(), "Employees get 16 weeks.");
//! ```

mod index;
mod section;
mod text;

pub use index::{get_all_content, DocumentType, StructureKind, TreeIndex};
pub use section::{SectionIter, TreeSection};
pub use text::{
    TextPart, join_parts, normalize_whitespace, truncate_chars, truncate_with_ellipsis,
};
