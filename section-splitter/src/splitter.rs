use crate::config::{SplitterConfig, SplittingStrategy};
use crate::error::SplitterError;
use crate::strategy::LengthSplitter;
use crate::structure::{self, Detection, Marker, MarkerKind};
use crate::{DraftSection, SectionOrigin, SplitOutcome};
use knowbot_document_tree::StructureKind;
use log::{debug, info, warn};

const PREAMBLE_TITLE: &str = "Introduction";
const DOCUMENT_TITLE: &str = "Document";

/// Builds draft section trees from plain text
#[derive(Debug, Clone)]
pub struct Splitter {
    config: SplitterConfig,
    length: LengthSplitter,
}

impl Splitter {
    /// Create a splitter, rejecting invalid configuration
    pub fn new(config: SplitterConfig) -> Result<Self, SplitterError> {
        config.validate().map_err(SplitterError::InvalidConfig)?;
        let length = LengthSplitter::new(&config);
        Ok(Self { config, length })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split one document into draft sections
    pub fn split(&self, text: &str) -> Result<SplitOutcome, SplitterError> {
        if text.trim().is_empty() {
            return Err(SplitterError::EmptyInput);
        }

        let detection = match self.config.strategy {
            SplittingStrategy::LengthOnly => None,
            SplittingStrategy::Adaptive | SplittingStrategy::StructureOnly => {
                structure::detect(text, self.config.min_markers)
            }
        };

        let (structure, mut sections) = match detection {
            Some(detection) => {
                let kind = detection.kind;
                match self.split_structured(text, detection) {
                    Some(sections) => (kind, sections),
                    None => (StructureKind::Unstructured, self.split_unstructured(text)),
                }
            }
            None => (StructureKind::Unstructured, self.split_unstructured(text)),
        };

        if self.config.strategy == SplittingStrategy::Adaptive {
            for section in &mut sections {
                self.enforce_leaf_budget(section);
            }
        }
        let sections = self.regroup(sections);

        let outcome = SplitOutcome {
            structure,
            sections,
        };
        info!(
            "Split {} chars into {} sections ({:?} structure)",
            text.len(),
            outcome.section_count(),
            outcome.structure
        );
        Ok(outcome)
    }

    /// Split several named documents, one top-level section per document.
    /// Blank documents are skipped.
    pub fn split_documents<N, T>(&self, documents: &[(N, T)]) -> Result<SplitOutcome, SplitterError>
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        let mut sections = Vec::new();
        let mut kinds = Vec::new();

        for (name, text) in documents {
            let (name, text) = (name.as_ref(), text.as_ref());
            if text.trim().is_empty() {
                debug!("Skipping empty document {name}");
                continue;
            }

            let outcome = self.split(text)?;
            kinds.push(outcome.structure);

            let mut children = outcome.sections;
            let section = if children.len() == 1 && children[0].is_leaf() && children[0].heading.is_none() {
                let only = children.remove(0);
                DraftSection::leaf(name, only.content, SectionOrigin::Document)
                    .with_joins_previous(only.joins_previous)
            } else {
                DraftSection::internal(name, children, SectionOrigin::Document)
            };
            sections.push(section);
        }

        let Some(first) = kinds.first().copied() else {
            return Err(SplitterError::EmptyInput);
        };
        let structure = if kinds.iter().all(|kind| *kind == first) {
            first
        } else {
            StructureKind::Mixed
        };

        Ok(SplitOutcome {
            structure,
            sections: self.regroup(sections),
        })
    }

    fn split_structured(&self, text: &str, detection: Detection) -> Option<Vec<DraftSection>> {
        let markers = self.cap_sections(detection.markers)?;
        let markers = self.limit_depth(markers);
        if markers.is_empty() {
            return None;
        }

        let mut sections = Vec::new();
        let preamble = text[..markers[0].start].trim();
        if !preamble.is_empty() {
            sections.push(DraftSection::leaf(
                PREAMBLE_TITLE,
                preamble,
                SectionOrigin::Preamble,
            ));
        }
        sections.extend(build_sections(text, &markers, text.len()));
        Some(sections)
    }

    /// Drop the deepest marker level until at most `max_sections` remain.
    /// `None` when even a single level is too many.
    fn cap_sections(&self, mut markers: Vec<Marker>) -> Option<Vec<Marker>> {
        while markers.len() > self.config.max_sections {
            let deepest = markers.iter().map(|m| m.level).max()?;
            let shallowest = markers.iter().map(|m| m.level).min()?;
            if deepest == shallowest {
                warn!(
                    "{} markers exceed max_sections {}, falling back to length splitting",
                    markers.len(),
                    self.config.max_sections
                );
                return None;
            }
            debug!("Dropping level-{deepest} markers to honour max_sections");
            markers.retain(|m| m.level < deepest);
        }
        Some(markers)
    }

    /// Markers nested deeper than `max_depth` become body text of their
    /// closest kept ancestor.
    fn limit_depth(&self, markers: Vec<Marker>) -> Vec<Marker> {
        let mut open: Vec<usize> = Vec::new();
        let mut kept = Vec::with_capacity(markers.len());

        for marker in markers {
            while open.last().is_some_and(|level| *level >= marker.level) {
                open.pop();
            }
            if open.len() >= self.config.max_depth {
                continue;
            }
            open.push(marker.level);
            kept.push(marker);
        }
        kept
    }

    fn split_unstructured(&self, text: &str) -> Vec<DraftSection> {
        let pieces = self.length.split_pieces(text);
        match pieces.as_slice() {
            [] => Vec::new(),
            [only] => vec![DraftSection::leaf(DOCUMENT_TITLE, only.text, SectionOrigin::Piece)],
            _ => {
                let children = pieces
                    .iter()
                    .enumerate()
                    .map(|(idx, piece)| {
                        DraftSection::leaf(format!("Part {}", idx + 1), piece.text, SectionOrigin::Piece)
                            .with_joins_previous(piece.joins_previous)
                    })
                    .collect();
                vec![DraftSection::internal(
                    DOCUMENT_TITLE,
                    children,
                    SectionOrigin::Group,
                )]
            }
        }
    }

    /// Replace leaves longer than `max_leaf_chars` with length-split parts
    fn enforce_leaf_budget(&self, section: &mut DraftSection) {
        if !section.is_leaf() {
            for child in &mut section.children {
                self.enforce_leaf_budget(child);
            }
            return;
        }

        if section.content.chars().count() <= self.length.max_chars() {
            return;
        }

        let pieces: Vec<(String, bool)> = self
            .length
            .split_pieces(&section.content)
            .into_iter()
            .map(|piece| (piece.text.to_string(), piece.joins_previous))
            .collect();
        if pieces.len() < 2 {
            return;
        }

        debug!(
            "Splitting oversized section '{}' into {} parts",
            section.title,
            pieces.len()
        );
        let title = section.title.clone();
        section.children = pieces
            .into_iter()
            .enumerate()
            .map(|(idx, (piece, joins_previous))| {
                DraftSection::leaf(format!("{title} (part {})", idx + 1), piece, SectionOrigin::Piece)
                    .with_joins_previous(joins_previous)
            })
            .collect();
        section.content.clear();
    }

    /// Bound every node's child count by `max_children`
    fn regroup(&self, sections: Vec<DraftSection>) -> Vec<DraftSection> {
        let mut sections: Vec<DraftSection> = sections
            .into_iter()
            .map(|mut section| {
                section.children = self.regroup(std::mem::take(&mut section.children));
                section
            })
            .collect();

        while sections.len() > self.config.max_children {
            sections = group_siblings(sections, self.config.max_children);
        }
        sections
    }
}

fn group_siblings(sections: Vec<DraftSection>, max_children: usize) -> Vec<DraftSection> {
    let mut grouped = Vec::new();
    let mut buffer = Vec::with_capacity(max_children);

    for section in sections {
        buffer.push(section);
        if buffer.len() == max_children {
            grouped.push(make_group(std::mem::take(&mut buffer)));
        }
    }
    match buffer.len() {
        0 => {}
        1 => grouped.append(&mut buffer),
        _ => grouped.push(make_group(buffer)),
    }
    grouped
}

fn make_group(children: Vec<DraftSection>) -> DraftSection {
    let first = children.first().map_or("", |s| s.title.as_str());
    let last = children.last().map_or("", |s| s.title.as_str());
    let title = format!("{first} to {last}");
    DraftSection::internal(title, children, SectionOrigin::Group)
}

/// Build the sections opened by `markers`, which all lie inside a region
/// ending at `region_end`.
fn build_sections(text: &str, markers: &[Marker], region_end: usize) -> Vec<DraftSection> {
    let mut sections = Vec::new();
    let mut idx = 0;

    while idx < markers.len() {
        let marker = &markers[idx];
        let section_len = markers[idx + 1..]
            .iter()
            .position(|next| next.level <= marker.level)
            .map_or(markers.len() - idx, |pos| pos + 1);
        let section_end = markers
            .get(idx + section_len)
            .map_or(region_end, |next| next.start);

        let nested = &markers[idx + 1..idx + section_len];
        let body_end = nested.first().map_or(section_end, |next| next.start);
        let body = if marker.body_start < body_end {
            text[marker.body_start..body_end].trim()
        } else {
            ""
        };

        let children = build_sections(text, nested, section_end);
        sections.push(structural_section(marker, body, children));
        idx += section_len;
    }

    sections
}

fn structural_section(marker: &Marker, body: &str, children: Vec<DraftSection>) -> DraftSection {
    let origin = match marker.kind {
        MarkerKind::Heading => SectionOrigin::Heading,
        MarkerKind::Channel => SectionOrigin::Channel,
        MarkerKind::Date => SectionOrigin::Date,
    };

    let mut section = if children.is_empty() {
        DraftSection::leaf(marker.title.as_str(), body, origin)
    } else {
        let mut kids = Vec::with_capacity(children.len() + 1);
        if !body.is_empty() {
            kids.push(DraftSection::leaf(
                format!("{} (overview)", marker.title),
                body,
                SectionOrigin::Overview,
            ));
        }
        kids.extend(children);
        DraftSection::internal(marker.title.as_str(), kids, origin)
    };
    section.heading = marker.heading.clone();
    section
}
