use crate::config::RetrievalConfig;
use crate::judgment::{JudgeAction, Judgment, batch_node_id, validate_batch};
use crate::result::{RelevantSection, RetrievalResult, Termination};
use futures::future::join_all;
use knowbot_document_tree::TreeSection;
use knowbot_language_model::{CandidateBrief, LanguageModel};
use knowbot_tree_store::StoredTree;
use log::{debug, info, warn};
use std::time::Instant;

/// A node on the frontier, tagged with the tree it came from
struct Candidate<'a> {
    tree: &'a StoredTree,
    source_rank: usize,
    section: &'a TreeSection,
    /// Titles from the top-level section down to `section`
    path: Vec<&'a str>,
    /// Child positions from the top-level section down, for document order
    order: Vec<usize>,
}

impl<'a> Candidate<'a> {
    fn child(&self, position: usize, section: &'a TreeSection) -> Self {
        let mut path = self.path.clone();
        path.push(section.title.as_str());
        let mut order = self.order.clone();
        order.push(position);
        Self {
            tree: self.tree,
            source_rank: self.source_rank,
            section,
            path,
            order,
        }
    }

    fn brief(&self, index: usize) -> CandidateBrief {
        CandidateBrief {
            node_id: batch_node_id(index),
            title: self.section.title.clone(),
            summary: self.section.summary.clone(),
            has_children: !self.section.is_leaf(),
        }
    }

    fn into_relevant(self, confidence: u8) -> RelevantSection {
        let section_content = if self.section.is_leaf() {
            self.section.content.clone()
        } else {
            self.section.full_content()
        };
        RelevantSection {
            section_content,
            source_name: self.tree.index.source_name.clone(),
            source_id: self.tree.source_id.clone(),
            section_id: self.section.id.clone(),
            source_updated_at: self.tree.updated_at,
            path: self.path.iter().map(|title| (*title).to_string()).collect(),
            confidence,
        }
    }
}

/// One level-order, threshold-pruned walk over a set of trees
pub(crate) struct Traversal<'a> {
    pub(crate) model: &'a dyn LanguageModel,
    pub(crate) config: &'a RetrievalConfig,
    pub(crate) query: &'a str,
    pub(crate) threshold: u8,
}

impl Traversal<'_> {
    pub(crate) async fn run(&self, trees: &[StoredTree]) -> RetrievalResult {
        let started = Instant::now();
        let threshold = self.threshold;
        let mut result = RetrievalResult::new(self.query, threshold);

        let mut frontier: Vec<Candidate<'_>> = trees
            .iter()
            .enumerate()
            .flat_map(|(source_rank, tree)| {
                tree.index
                    .root_sections
                    .iter()
                    .enumerate()
                    .map(move |(position, section)| Candidate {
                        tree,
                        source_rank,
                        section,
                        path: vec![section.title.as_str()],
                        order: vec![position],
                    })
            })
            .collect();

        let mut accepted: Vec<(Candidate<'_>, u8)> = Vec::new();
        let mut best: Option<(u8, String)> = None;
        let mut depth = 0;

        while !frontier.is_empty() {
            if depth >= self.config.max_depth {
                result.stats.termination = Termination::DepthCap;
                result.reasoning.push(format!(
                    "Stopped at depth cap {} with {} candidates unexplored",
                    self.config.max_depth,
                    frontier.len()
                ));
                break;
            }

            let verdicts = self.judge_level(&frontier, depth, &mut result).await;
            let considered = frontier.len();
            let (mut selected, mut descended, mut pruned) = (0, 0, 0);
            let mut next = Vec::new();

            for (candidate, verdict) in frontier.into_iter().zip(verdicts) {
                let (confidence, action) = match verdict {
                    Some(judgment) => {
                        if best
                            .as_ref()
                            .is_none_or(|(score, _)| judgment.confidence > *score)
                        {
                            best = Some((judgment.confidence, candidate.section.title.clone()));
                        }
                        (judgment.confidence, judgment.action)
                    }
                    None => (threshold, JudgeAction::Descend),
                };

                if confidence < threshold {
                    pruned += 1;
                } else if candidate.section.is_leaf() || action == JudgeAction::Accept {
                    selected += 1;
                    accepted.push((candidate, confidence));
                } else {
                    descended += 1;
                    next.extend(
                        candidate
                            .section
                            .children
                            .iter()
                            .enumerate()
                            .map(|(position, child)| candidate.child(position, child)),
                    );
                }
            }

            let line = format!(
                "Considered {considered} candidates at depth {depth}, selected {selected}, descended into {descended}, pruned {pruned} because score < {threshold}"
            );
            debug!("{line}");
            result.reasoning.push(line);
            result.stats.levels_visited += 1;
            result.stats.nodes_considered += considered;
            result.stats.pruned += pruned;

            frontier = next;
            depth += 1;
        }

        // Highest confidence first; ties keep source order, then document order
        accepted.sort_by(|(a, a_conf), (b, b_conf)| {
            b_conf
                .cmp(a_conf)
                .then_with(|| a.source_rank.cmp(&b.source_rank))
                .then_with(|| a.order.cmp(&b.order))
        });

        let total_accepted = accepted.len();
        if total_accepted > self.config.max_results {
            accepted.truncate(self.config.max_results);
            result.reasoning.push(format!(
                "Kept the top {} of {total_accepted} accepted sections",
                self.config.max_results
            ));
        }

        if accepted.is_empty() {
            let explanation = self.explain_miss(&result, best);
            result.reasoning.push(explanation);
        }

        result.relevant_sections = accepted
            .into_iter()
            .map(|(candidate, confidence)| candidate.into_relevant(confidence))
            .collect();
        result.stats.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            "Retrieval selected {} sections in {}ms ({} levels, {} judge calls, {} fallbacks)",
            result.relevant_sections.len(),
            result.stats.elapsed_ms,
            result.stats.levels_visited,
            result.stats.judge_calls,
            result.stats.judge_failures
        );
        result
    }

    /// Judge every candidate of one level. Batches run concurrently and all
    /// resolve before the caller descends. Returns one slot per candidate,
    /// `None` where the at-threshold fallback applies.
    async fn judge_level(
        &self,
        frontier: &[Candidate<'_>],
        depth: usize,
        result: &mut RetrievalResult,
    ) -> Vec<Option<Judgment>> {
        let batches: Vec<&[Candidate<'_>]> =
            frontier.chunks(self.config.judge_batch_size).collect();
        let responses = join_all(batches.iter().map(|batch| self.judge_batch(batch))).await;
        result.stats.judge_calls += batches.len();

        let mut verdicts = Vec::with_capacity(frontier.len());
        for (batch, response) in batches.iter().zip(responses) {
            match response {
                Ok(slots) => {
                    let missing = slots.iter().filter(|slot| slot.is_none()).count();
                    if missing > 0 {
                        result.stats.judge_failures += missing;
                        result.reasoning.push(format!(
                            "{missing} of {} candidates at depth {depth} had no valid judgment; treated as at-threshold",
                            batch.len()
                        ));
                    }
                    verdicts.extend(slots);
                }
                Err(err) => {
                    warn!("Relevance judgment failed at depth {depth}: {err}");
                    result.stats.judge_failures += batch.len();
                    result.reasoning.push(format!(
                        "Judge call for {} candidates at depth {depth} failed ({err}); treated as at-threshold",
                        batch.len()
                    ));
                    verdicts.extend(std::iter::repeat_n(None, batch.len()));
                }
            }
        }
        verdicts
    }

    async fn judge_batch(
        &self,
        batch: &[Candidate<'_>],
    ) -> Result<Vec<Option<Judgment>>, String> {
        let briefs: Vec<CandidateBrief> = batch
            .iter()
            .enumerate()
            .map(|(index, candidate)| candidate.brief(index))
            .collect();

        let timeout = self.config.judge_timeout();
        match tokio::time::timeout(timeout, self.model.judge_relevance(self.query, &briefs)).await {
            Ok(Ok(raw)) => Ok(validate_batch(&raw, batch.len())),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("timed out after {timeout:?}")),
        }
    }

    fn explain_miss(&self, result: &RetrievalResult, best: Option<(u8, String)>) -> String {
        if result.stats.nodes_considered == 0 {
            return "No indexed sections to search".to_string();
        }
        match best {
            Some((score, title)) if score < self.threshold => format!(
                "No section reached the confidence threshold of {}; best score was {score} for \"{title}\"",
                self.threshold
            ),
            _ if result.stats.termination == Termination::DepthCap => format!(
                "No section was accepted before the depth cap of {}",
                self.config.max_depth
            ),
            _ => format!(
                "No section reached the confidence threshold of {}",
                self.threshold
            ),
        }
    }
}
