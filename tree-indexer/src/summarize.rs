use crate::indexer::{BuildPhase, BuildProgress, ProgressCallback};
use futures::future::{BoxFuture, FutureExt, join_all};
use knowbot_document_tree::{TreeSection, truncate_chars, truncate_with_ellipsis};
use knowbot_language_model::{LanguageModel, SectionSummary, SummaryRequest};
use knowbot_section_splitter::DraftSection;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

const MAX_TITLE_CHARS: usize = 80;

/// Bottom-up summarizer for one build.
///
/// Sibling subtrees run concurrently; a parent waits for all of its
/// children. The semaphore bounds in-flight model calls, and a permit is
/// only held for the duration of one call so that waiting parents never
/// starve their own children.
pub(crate) struct Summarizer {
    model: Arc<dyn LanguageModel>,
    permits: Semaphore,
    timeout: Duration,
    fallback_chars: usize,
    max_input_chars: usize,
    progress: Option<ProgressCallback>,
    total: usize,
    completed: AtomicUsize,
    generated: AtomicUsize,
    degraded: AtomicUsize,
    unreachable: AtomicUsize,
}

impl Summarizer {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        model: Arc<dyn LanguageModel>,
        max_concurrent: usize,
        timeout: Duration,
        fallback_chars: usize,
        max_input_chars: usize,
        progress: Option<ProgressCallback>,
        total: usize,
    ) -> Self {
        Self {
            model,
            permits: Semaphore::new(max_concurrent.max(1)),
            timeout,
            fallback_chars,
            max_input_chars,
            progress,
            total,
            completed: AtomicUsize::new(0),
            generated: AtomicUsize::new(0),
            degraded: AtomicUsize::new(0),
            unreachable: AtomicUsize::new(0),
        }
    }

    /// Summaries produced by the model
    pub(crate) fn generated(&self) -> usize {
        self.generated.load(Ordering::Relaxed)
    }

    /// Summaries replaced by the truncated-content fallback
    pub(crate) fn degraded(&self) -> usize {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Model calls that failed because the endpoint could not be reached
    pub(crate) fn unreachable(&self) -> usize {
        self.unreachable.load(Ordering::Relaxed)
    }

    /// Summarize `draft` and its whole subtree
    pub(crate) fn summarize_section<'a>(
        &'a self,
        draft: &'a DraftSection,
        id: String,
        level: usize,
    ) -> BoxFuture<'a, TreeSection> {
        async move {
            let section = if draft.is_leaf() {
                self.summarize_leaf(draft, id, level).await
            } else {
                let children = join_all(draft.children.iter().enumerate().map(
                    |(position, child)| {
                        self.summarize_section(child, TreeSection::child_id(&id, position), level + 1)
                    },
                ))
                .await;
                self.summarize_internal(draft, id, children, level).await
            };
            self.report(&section.title);
            section
        }
        .boxed()
    }

    async fn summarize_leaf(&self, draft: &DraftSection, id: String, level: usize) -> TreeSection {
        let title_hint = title_hint(draft);
        let mut section = TreeSection::leaf(id, draft.title.clone(), draft.content.clone(), level);
        section.heading = draft.heading.clone();
        section.joins_previous = draft.joins_previous;

        if draft.content.trim().is_empty() {
            section.summary = draft.title.clone();
            return section;
        }

        let input = truncate_chars(&draft.content, self.max_input_chars);
        let request = SummaryRequest::content(title_hint.clone(), input);
        match self.call_model(&request, &section.id).await {
            Some(summary) => self.apply(&mut section, title_hint.is_none(), summary),
            None => {
                section.summary = truncate_with_ellipsis(&draft.content, self.fallback_chars);
                self.degrade(&mut section);
            }
        }
        section
    }

    async fn summarize_internal(
        &self,
        draft: &DraftSection,
        id: String,
        children: Vec<TreeSection>,
        level: usize,
    ) -> TreeSection {
        let title_hint = title_hint(draft);
        let child_summaries = children
            .iter()
            .map(|child| SectionSummary::new(child.title.clone(), child.summary.clone()))
            .collect();

        let mut section = TreeSection::internal(id, draft.title.clone(), children, level);
        section.heading = draft.heading.clone();

        let request = SummaryRequest::children(title_hint.clone(), child_summaries);
        match self.call_model(&request, &section.id).await {
            Some(summary) => self.apply(&mut section, title_hint.is_none(), summary),
            None => {
                let fallback = truncate_with_ellipsis(&section.full_content(), self.fallback_chars);
                section.summary = if fallback.is_empty() {
                    section.title.clone()
                } else {
                    fallback
                };
                self.degrade(&mut section);
            }
        }
        section
    }

    async fn call_model(&self, request: &SummaryRequest, section_id: &str) -> Option<SectionSummary> {
        let Ok(_permit) = self.permits.acquire().await else {
            warn!("Summary semaphore closed, degrading section {section_id}");
            return None;
        };

        match tokio::time::timeout(self.timeout, self.model.summarize(request)).await {
            Ok(Ok(summary)) if !summary.summary.trim().is_empty() => Some(summary),
            Ok(Ok(_)) => {
                warn!(
                    "Model {} returned an empty summary for section {section_id}",
                    self.model.name()
                );
                None
            }
            Ok(Err(err)) => {
                if err.is_unreachable() {
                    self.unreachable.fetch_add(1, Ordering::Relaxed);
                }
                warn!("Summary failed for section {section_id}: {err}");
                None
            }
            Err(_) => {
                self.unreachable.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Summary for section {section_id} timed out after {:?}",
                    self.timeout
                );
                None
            }
        }
    }

    fn apply(&self, section: &mut TreeSection, retitle: bool, summary: SectionSummary) {
        let title = summary.title.trim();
        if (retitle || section.title.trim().is_empty()) && !title.is_empty() {
            section.title = truncate_with_ellipsis(title, MAX_TITLE_CHARS);
        }
        section.summary = summary.summary.trim().to_string();
        self.generated.fetch_add(1, Ordering::Relaxed);
        debug!("Summarized section {} ({})", section.id, section.title);
    }

    fn degrade(&self, section: &mut TreeSection) {
        section.summary_degraded = true;
        self.degraded.fetch_add(1, Ordering::Relaxed);
        warn!(
            "Using truncated-content summary for section {} ({})",
            section.id, section.title
        );
    }

    fn report(&self, title: &str) {
        let current = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = &self.progress {
            callback(BuildProgress {
                phase: BuildPhase::Summarizing,
                current,
                total: self.total,
                current_section: Some(title.to_string()),
            });
        }
    }
}

/// Real heading text is passed to the model as a hint; placeholder titles
/// are left for the model to replace.
fn title_hint(draft: &DraftSection) -> Option<String> {
    if draft.origin.is_synthetic() || draft.title.trim().is_empty() {
        None
    } else {
        Some(draft.title.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowbot_language_model::LexicalModel;
    use knowbot_section_splitter::SectionOrigin;
    use pretty_assertions::assert_eq;

    fn summarizer(model: Arc<dyn LanguageModel>) -> Summarizer {
        Summarizer::new(model, 2, Duration::from_secs(5), 40, 1000, None, 0)
    }

    #[test]
    fn test_title_hint_skips_placeholders() {
        let heading = DraftSection::leaf("Leave", "text", SectionOrigin::Heading);
        let piece = DraftSection::leaf("Part 1", "text", SectionOrigin::Piece);
        let blank = DraftSection::leaf("  ", "text", SectionOrigin::Heading);

        assert_eq!(title_hint(&heading).as_deref(), Some("Leave"));
        assert_eq!(title_hint(&piece), None);
        assert_eq!(title_hint(&blank), None);
    }

    #[tokio::test]
    async fn test_ids_and_levels_follow_tree_shape() {
        let draft = DraftSection::internal(
            "Policy",
            vec![
                DraftSection::leaf("Leave", "Employees get 16 weeks.", SectionOrigin::Heading),
                DraftSection::leaf("Expenses", "Submit via the portal.", SectionOrigin::Heading),
            ],
            SectionOrigin::Heading,
        );
        let summarizer = summarizer(Arc::new(LexicalModel::new()));

        let section = summarizer.summarize_section(&draft, "1".into(), 0).await;

        assert_eq!(section.id, "1");
        assert_eq!(section.level, 0);
        let ids: Vec<_> = section.children.iter().map(|c| (c.id.as_str(), c.level)).collect();
        assert_eq!(ids, vec![("1.1", 1), ("1.2", 1)]);
        assert_eq!(summarizer.generated(), 3);
        assert_eq!(summarizer.degraded(), 0);
    }

    #[tokio::test]
    async fn test_empty_leaf_uses_title_without_model_call() {
        let draft = DraftSection::leaf("Appendix", "   ", SectionOrigin::Heading);
        let summarizer = summarizer(Arc::new(LexicalModel::new()));

        let section = summarizer.summarize_section(&draft, "3".into(), 0).await;

        assert_eq!(section.summary, "Appendix");
        assert!(!section.summary_degraded);
        assert_eq!(summarizer.generated(), 0);
    }
}
