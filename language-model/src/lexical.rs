use crate::LanguageModel;
use crate::error::Result;
use crate::types::{CandidateBrief, RawJudgment, SectionSummary, SummaryInput, SummaryRequest};
use async_trait::async_trait;
use knowbot_document_tree::{normalize_whitespace, truncate_with_ellipsis};
use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "about", "after", "all", "also", "and", "any", "are", "can", "could", "does", "for", "from",
    "get", "has", "have", "how", "into", "its", "not", "our", "should", "that", "the", "their",
    "there", "this", "was", "were", "what", "when", "where", "which", "who", "why", "will", "with",
    "would", "you", "your",
];

const MIN_TERM_CHARS: usize = 3;
const MAX_TITLE_WORDS: usize = 8;

/// Deterministic, offline model.
///
/// Summaries are the first sentence of a section (or a digest of child
/// titles); relevance is keyword overlap between the question and a
/// candidate's title and summary. Good enough to exercise the pipeline
/// end to end without network access.
#[derive(Debug, Clone)]
pub struct LexicalModel {
    summary_chars: usize,
}

impl Default for LexicalModel {
    fn default() -> Self {
        Self { summary_chars: 240 }
    }
}

impl LexicalModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summary_chars(summary_chars: usize) -> Self {
        Self {
            summary_chars: summary_chars.max(16),
        }
    }

    /// Score 0 when nothing matches, otherwise 50..=100 by share of terms hit
    pub fn score(&self, query: &str, candidate: &CandidateBrief) -> u32 {
        let terms = keywords(query);
        if terms.is_empty() {
            return 0;
        }

        let haystack = keywords(&format!("{} {}", candidate.title, candidate.summary));
        let matched = terms
            .iter()
            .filter(|term| haystack.iter().any(|word| terms_match(term, word)))
            .count();
        if matched == 0 {
            return 0;
        }

        let span = (terms.len() - 1).max(1) as u32;
        50 + 50 * (matched as u32 - 1) / span
    }
}

fn keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= MIN_TERM_CHARS)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .collect()
}

fn stem(word: &str) -> &str {
    word.strip_suffix("ies")
        .or_else(|| word.strip_suffix("es"))
        .or_else(|| word.strip_suffix('s'))
        .filter(|stem| stem.chars().count() >= MIN_TERM_CHARS)
        .unwrap_or(word)
}

fn terms_match(term: &str, word: &str) -> bool {
    let (term, word) = (stem(term), stem(word));
    term == word || (term.len() >= 4 && word.len() >= 4 && (word.starts_with(term) || term.starts_with(word)))
}

fn first_sentence(text: &str) -> String {
    let normalized = normalize_whitespace(text);
    let end = normalized
        .char_indices()
        .find(|&(idx, ch)| {
            matches!(ch, '.' | '!' | '?')
                && normalized[idx + ch.len_utf8()..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace)
        })
        .map_or(normalized.len(), |(idx, ch)| idx + ch.len_utf8());
    normalized[..end].to_string()
}

fn title_from_text(text: &str) -> String {
    let line = text.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    let sentence = first_sentence(line);
    let words: Vec<&str> = sentence.split_whitespace().take(MAX_TITLE_WORDS).collect();
    let title = words.join(" ");
    title.trim_end_matches(['.', ':', ',', ';']).to_string()
}

#[async_trait]
impl LanguageModel for LexicalModel {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<SectionSummary> {
        let hint = request
            .title_hint
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty());

        let (title, summary) = match &request.input {
            SummaryInput::Content(content) => {
                let title = hint.map_or_else(|| title_from_text(content), str::to_string);
                let summary = truncate_with_ellipsis(&first_sentence(content), self.summary_chars);
                (title, summary)
            }
            SummaryInput::ChildSummaries(children) => {
                let title = hint
                    .map(str::to_string)
                    .or_else(|| children.first().map(|child| child.title.clone()))
                    .unwrap_or_default();
                let digest = children
                    .iter()
                    .map(|child| format!("{}: {}", child.title, child.summary))
                    .collect::<Vec<_>>()
                    .join("; ");
                (title, truncate_with_ellipsis(&digest, self.summary_chars))
            }
        };

        let summary = if summary.is_empty() { title.clone() } else { summary };
        Ok(SectionSummary::new(title, summary))
    }

    async fn judge_relevance(
        &self,
        query: &str,
        candidates: &[CandidateBrief],
    ) -> Result<Vec<RawJudgment>> {
        Ok(candidates
            .iter()
            .map(|candidate| {
                let score = self.score(query, candidate);
                let action = if candidate.has_children {
                    "descend"
                } else {
                    "accept"
                };
                RawJudgment::new(candidate.node_id.clone(), score, action)
                    .with_reason("keyword overlap")
            })
            .collect())
    }
}
