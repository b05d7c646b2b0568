use crate::types::{CandidateBrief, SummaryInput, SummaryRequest};
use knowbot_document_tree::truncate_chars;
use std::fmt::Write;

pub const SUMMARY_SYSTEM_PROMPT: &str = "\
You index sections of a company knowledge base so that a retrieval system can \
decide which sections answer a user's question without reading them in full.

Reply with a single JSON object: {\"title\": string, \"summary\": string}.
- title: at most 8 words naming the topic. Reuse the existing title when one is given and it fits.
- summary: one to three sentences stating the concrete facts, rules, numbers and names a reader could look up here.
Do not invent facts that are not in the input.";

pub const JUDGE_SYSTEM_PROMPT: &str = "\
You route questions through a hierarchical knowledge base. For each candidate \
section, judge how likely it is to contain the answer, using only its title and summary.

Reply with a single JSON object:
{\"judgments\": [{\"nodeId\": string, \"confidenceScore\": integer 0-100, \"action\": \"accept\" | \"descend\", \"reason\": string}]}
- Return exactly one judgment per candidate, echoing its nodeId.
- confidenceScore: 0 = clearly unrelated, 50 = plausibly related, 100 = certainly answers the question.
- action: \"descend\" when the section has subsections and a narrower one would answer better; \"accept\" when the section as a whole is the right amount of context.";

/// User message for a summary call
pub fn summary_prompt(request: &SummaryRequest, max_input_chars: usize) -> String {
    let mut prompt = String::new();
    if let Some(hint) = request.title_hint.as_deref().filter(|h| !h.trim().is_empty()) {
        let _ = writeln!(prompt, "Existing title: {}\n", hint.trim());
    }

    match &request.input {
        SummaryInput::Content(content) => {
            let clipped = truncate_chars(content, max_input_chars);
            prompt.push_str("Section text:\n");
            prompt.push_str(clipped);
            if clipped.len() < content.len() {
                prompt.push_str("\n[...truncated]");
            }
        }
        SummaryInput::ChildSummaries(children) => {
            prompt.push_str("This section contains the following subsections:\n");
            let mut budget = max_input_chars;
            for child in children {
                let line = format!("- {}: {}\n", child.title.trim(), child.summary.trim());
                let line_chars = line.chars().count();
                if line_chars > budget {
                    prompt.push_str("- [...further subsections omitted]\n");
                    break;
                }
                budget -= line_chars;
                prompt.push_str(&line);
            }
        }
    }

    prompt
}

/// User message for a relevance-judging call
pub fn judge_prompt(query: &str, candidates: &[CandidateBrief]) -> String {
    let mut prompt = format!("Question: {}\n\nCandidates:\n", query.trim());
    for candidate in candidates {
        let kind = if candidate.has_children {
            "has subsections"
        } else {
            "leaf"
        };
        let _ = writeln!(
            prompt,
            "[{}] {} ({kind})\n    {}",
            candidate.node_id,
            candidate.title.trim(),
            candidate.summary.trim()
        );
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SectionSummary;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_content_prompt_is_truncated() {
        let request = SummaryRequest::content(Some("Leave".into()), "abcdefghij");
        let prompt = summary_prompt(&request, 4);
        assert_eq!(
            prompt,
            "Existing title: Leave\n\nSection text:\nabcd\n[...truncated]"
        );
    }

    #[test]
    fn test_children_prompt_lists_subsections() {
        let request = SummaryRequest::children(
            None,
            vec![
                SectionSummary::new("Leave", "16 weeks parental leave."),
                SectionSummary::new("Expenses", "Use the portal."),
            ],
        );
        let prompt = summary_prompt(&request, 1000);
        assert_eq!(
            prompt,
            "This section contains the following subsections:\n- Leave: 16 weeks parental leave.\n- Expenses: Use the portal.\n"
        );
    }

    #[test]
    fn test_judge_prompt() {
        let candidates = vec![CandidateBrief {
            node_id: "1".into(),
            title: "Leave".into(),
            summary: "Parental leave rules.".into(),
            has_children: true,
        }];
        assert_eq!(
            judge_prompt(" parental leave? ", &candidates),
            "Question: parental leave?\n\nCandidates:\n[1] Leave (has subsections)\n    Parental leave rules.\n"
        );
    }
}
