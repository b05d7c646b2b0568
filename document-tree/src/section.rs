use crate::text::{TextPart, join_parts};
use serde::{Deserialize, Serialize};

/// A node of a document tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSection {
    /// Path-based identifier, unique within one tree (`"1"`, `"1.2"`, `"1.2.3"`)
    pub id: String,

    /// Short human-readable label (heading text or synthesized title)
    pub title: String,

    /// Abstract of the subtree, used for relevance judging
    pub summary: String,

    /// Text owned by this node; empty for internal nodes
    #[serde(default)]
    pub content: String,

    /// Verbatim marker line that opened this section (e.g. `## Leave`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,

    /// Child sections in document order
    #[serde(default)]
    pub children: Vec<TreeSection>,

    /// Depth from the top level (top-level sections are 0)
    pub level: usize,

    /// Set when the summary is a truncated-content fallback
    #[serde(default)]
    pub summary_degraded: bool,

    /// Leaf content continues the previous leaf mid-token
    #[serde(default)]
    pub joins_previous: bool,
}

impl TreeSection {
    /// Create a leaf section owning `content`
    pub fn leaf(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        level: usize,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            content: content.into(),
            heading: None,
            children: Vec::new(),
            level,
            summary_degraded: false,
            joins_previous: false,
        }
    }

    /// Create a structural section whose text lives in `children`
    pub fn internal(
        id: impl Into<String>,
        title: impl Into<String>,
        children: Vec<TreeSection>,
        level: usize,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            content: String::new(),
            heading: None,
            children,
            level,
            summary_degraded: false,
            joins_previous: false,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn with_joins_previous(mut self, joins_previous: bool) -> Self {
        self.joins_previous = joins_previous;
        self
    }

    /// Identifier of the top-level section at `position` (0-based)
    pub fn root_id(position: usize) -> String {
        (position + 1).to_string()
    }

    /// Identifier of the child of `parent_id` at `position` (0-based)
    pub fn child_id(parent_id: &str, position: usize) -> String {
        format!("{parent_id}.{}", position + 1)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including `self`
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeSection::count).sum::<usize>()
    }

    /// Height of this subtree (a leaf has height 1)
    pub fn height(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeSection::height)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order iterator over this subtree
    pub fn iter(&self) -> SectionIter<'_> {
        SectionIter { stack: vec![self] }
    }

    /// Leaves of this subtree in document order
    pub fn leaves(&self) -> impl Iterator<Item = &TreeSection> {
        self.iter().filter(|section| section.is_leaf())
    }

    pub fn find(&self, id: &str) -> Option<&TreeSection> {
        self.iter().find(|section| section.id == id)
    }

    /// Text of the subtree below this node: descendant headings and leaf
    /// content in document order. A leaf returns its own content.
    pub fn full_content(&self) -> String {
        if self.is_leaf() {
            return self.content.trim().to_string();
        }

        let mut parts = Vec::new();
        for child in &self.children {
            child.collect_text(&mut parts);
        }
        join_parts(&parts)
    }

    pub(crate) fn collect_text<'a>(&'a self, parts: &mut Vec<TextPart<'a>>) {
        if let Some(heading) = self.heading.as_deref() {
            let heading = heading.trim();
            if !heading.is_empty() {
                parts.push(TextPart::separate(heading));
            }
        }

        if self.is_leaf() {
            let content = self.content.trim();
            if !content.is_empty() {
                parts.push(TextPart {
                    text: content,
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

/// Pre-order (document order) iterator over a subtree
pub struct SectionIter<'a> {
    stack: Vec<&'a TreeSection>,
}

impl<'a> SectionIter<'a> {
    pub(crate) fn over(sections: &'a [TreeSection]) -> Self {
        Self {
            stack: sections.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for SectionIter<'a> {
    type Item = &'a TreeSection;

    fn next(&mut self) -> Option<Self::Item> {
        let section = self.stack.pop()?;
        self.stack.extend(section.children.iter().rev());
        Some(section)
    }
}
