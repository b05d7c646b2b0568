use knowbot_document_tree::{DocumentType, StructureKind, TreeSection};

const QUESTION_SHARE: f64 = 0.4;
const MIN_VOCABULARY_HITS: usize = 2;

const POLICY_TERMS: &[&str] = &[
    "policy",
    "policies",
    "leave",
    "benefit",
    "benefits",
    "compliance",
    "conduct",
    "entitle",
    "eligib",
    "employee",
    "must",
    "prohibit",
    "expense",
    "reimburse",
    "vacation",
    "holiday",
    "procedure",
    "terms",
    "privacy",
];

const MANUAL_TERMS: &[&str] = &[
    "step",
    "install",
    "setup",
    "set up",
    "configure",
    "configuration",
    "getting started",
    "how to",
    "guide",
    "tutorial",
    "instruction",
    "click",
    "troubleshoot",
    "usage",
    "manual",
];

/// Infer the document type from structure, titles and top-level summaries
pub fn classify_document(structure: StructureKind, root_sections: &[TreeSection]) -> DocumentType {
    if structure == StructureKind::Transcript {
        return DocumentType::Transcript;
    }

    let titles: Vec<String> = root_sections
        .iter()
        .flat_map(TreeSection::iter)
        .map(|section| section.title.trim().to_lowercase())
        .filter(|title| !title.is_empty())
        .collect();

    if looks_like_faq(&titles) {
        return DocumentType::Faq;
    }

    let mut corpus = titles.join("\n");
    for section in root_sections {
        corpus.push('\n');
        corpus.push_str(&section.summary.to_lowercase());
    }

    let policy = vocabulary_hits(&corpus, POLICY_TERMS);
    let manual = vocabulary_hits(&corpus, MANUAL_TERMS);

    if policy >= MIN_VOCABULARY_HITS && policy >= manual {
        DocumentType::Policy
    } else if manual >= MIN_VOCABULARY_HITS {
        DocumentType::Manual
    } else {
        DocumentType::Generic
    }
}

fn looks_like_faq(titles: &[String]) -> bool {
    if titles
        .iter()
        .any(|title| title.contains("faq") || title.contains("frequently asked"))
    {
        return true;
    }
    if titles.len() < 2 {
        return false;
    }

    let questions = titles.iter().filter(|title| title.ends_with('?')).count();
    questions as f64 / titles.len() as f64 >= QUESTION_SHARE
}

/// Number of vocabulary terms that occur at least once
fn vocabulary_hits(corpus: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|term| corpus.contains(*term)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leaf(id: &str, title: &str) -> TreeSection {
        TreeSection::leaf(id, title, "text", 1).with_summary("text")
    }

    #[test]
    fn test_transcript_structure_wins() {
        let sections = vec![leaf("1", "Leave policy")];
        assert_eq!(
            classify_document(StructureKind::Transcript, &sections),
            DocumentType::Transcript
        );
    }

    #[test]
    fn test_question_titles_are_faq() {
        let root = TreeSection::internal(
            "1",
            "Help",
            vec![
                leaf("1.1", "How do I reset my password?"),
                leaf("1.2", "Can I change my plan?"),
                leaf("1.3", "Billing"),
            ],
            0,
        );
        assert_eq!(
            classify_document(StructureKind::Markdown, &[root]),
            DocumentType::Faq
        );
    }

    #[test]
    fn test_policy_vocabulary() {
        let root = TreeSection::internal(
            "1",
            "Policy",
            vec![leaf("1.1", "Leave"), leaf("1.2", "Expenses")],
            0,
        )
        .with_summary("Company policy on parental leave and expense claims.");
        assert_eq!(
            classify_document(StructureKind::Markdown, &[root]),
            DocumentType::Policy
        );
    }

    #[test]
    fn test_manual_vocabulary() {
        let root = TreeSection::internal(
            "1",
            "Getting started",
            vec![leaf("1.1", "Install the agent"), leaf("1.2", "Configure alerts")],
            0,
        );
        assert_eq!(
            classify_document(StructureKind::Numbered, &[root]),
            DocumentType::Manual
        );
    }

    #[test]
    fn test_generic_fallback() {
        let sections = vec![leaf("1", "Quarterly update")];
        assert_eq!(
            classify_document(StructureKind::Unstructured, &sections),
            DocumentType::Generic
        );
    }
}
