use crate::result::{RelevantSection, RetrievalResult};
use knowbot_document_tree::truncate_chars;

const CONTEXT_HEADER: &str = "# Knowledge Base Context\n\n";

/// Knowledge-base block for the chat prompt: every selected section in
/// ranked order, each under a citation line. Empty when nothing was
/// selected.
pub fn build_context_from_results(result: &RetrievalResult) -> String {
    if result.is_empty() {
        return String::new();
    }

    let mut formatted = String::from(CONTEXT_HEADER);
    for (i, section) in result.relevant_sections.iter().enumerate() {
        formatted.push_str(&format_section(i + 1, section, &section.section_content));
    }
    formatted.truncate(formatted.trim_end().len());
    formatted.push('\n');
    formatted
}

/// Like [`build_context_from_results`], but stops before the first section
/// that would push the block past `max_chars`. The top section is always
/// included, cut to fit when necessary; under a budget too small for its
/// citation line the block itself is cut. Never longer than `max_chars`.
pub fn build_context_with_budget(result: &RetrievalResult, max_chars: usize) -> String {
    if result.is_empty() {
        return String::new();
    }

    let mut formatted = String::from(CONTEXT_HEADER);
    let mut used = formatted.chars().count();

    for (i, section) in result.relevant_sections.iter().enumerate() {
        let block = format_section(i + 1, section, &section.section_content);
        let block_chars = block.chars().count();

        if used + block_chars <= max_chars {
            formatted.push_str(&block);
            used += block_chars;
            continue;
        }

        if i == 0 {
            let overhead = format_section(i + 1, section, "").chars().count();
            let room = max_chars.saturating_sub(used + overhead);
            let content = truncate_chars(&section.section_content, room);
            formatted.push_str(&format_section(i + 1, section, content));
        }
        break;
    }

    formatted.truncate(formatted.trim_end().len());
    formatted.push('\n');
    if formatted.chars().count() > max_chars {
        return truncate_chars(&formatted, max_chars).to_string();
    }
    formatted
}

fn format_section(number: usize, section: &RelevantSection, content: &str) -> String {
    let mut block = format!("[{number}] {}", section.source_name);
    if !section.path.is_empty() {
        block.push_str(" > ");
        block.push_str(&section.path_label());
    }
    block.push_str(&format!(
        " (updated {})\n",
        section.source_updated_at.format("%Y-%m-%d")
    ));
    block.push_str(content.trim());
    block.push_str("\n\n");
    block
}
