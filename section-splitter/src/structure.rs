use knowbot_document_tree::StructureKind;
use once_cell::sync::Lazy;
use regex_lite::Regex;

static MARKDOWN_HEADING: Lazy<Regex> =
    Lazy::new(|| compile_regex(r"^(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$"));
static NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| compile_regex(r"^(\d{1,3}(?:\.\d{1,3}){0,5})\.?[ \t]+([A-Z].*)$"));
static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    compile_regex(r"^(?i:section)[ \t]+(\d{1,3}(?:\.\d{1,3}){0,5})[ \t]*[:.\-]?[ \t]+(\S.*)$")
});
static CHANNEL_LINE: Lazy<Regex> = Lazy::new(|| {
    compile_regex(r"^(?:={2,}[ \t]*#([\w.\-]+)[ \t]*={2,}|(?i:channel)[ \t]*:[ \t]*#?([\w.\-]+))[ \t]*$")
});
static DATE_PREFIX: Lazy<Regex> = Lazy::new(|| compile_regex(r"^\[?(\d{4}-\d{2}-\d{2})"));

const MAX_NUMBERED_TITLE_CHARS: usize = 120;
const MAX_NUMBERED_TITLE_WORDS: usize = 12;
const MIN_TRANSCRIPT_DATE_LINES: usize = 3;

fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid regex literal {pattern}: {err}"))
}

/// One input line with byte offsets into the source text
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub start: usize,
    /// Offset of the line terminator (or end of text)
    pub end: usize,
    /// Offset of the following line
    pub next: usize,
    pub text: &'a str,
}

impl Line<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub(crate) fn lines_with_offsets(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for piece in text.split_inclusive('\n') {
        let next = start + piece.len();
        let body = piece.trim_end_matches(['\n', '\r']);
        lines.push(Line {
            start,
            end: start + body.len(),
            next,
            text: body,
        });
        start = next;
    }
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkerKind {
    Heading,
    Channel,
    Date,
}

/// A point in the text where a new section opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Marker {
    /// Where the section (including its marker line) starts
    pub start: usize,
    /// Where the section body starts
    pub body_start: usize,
    /// Nesting level, 1 = outermost
    pub level: usize,
    pub title: String,
    /// Verbatim marker line, absent when the line stays part of the body
    pub heading: Option<String>,
    pub kind: MarkerKind,
}

#[derive(Debug, Clone)]
pub(crate) struct Detection {
    pub kind: StructureKind,
    pub markers: Vec<Marker>,
}

/// Find the first structure kind with at least `min_markers` markers.
/// Markdown wins over transcripts, transcripts over numbered headings.
pub(crate) fn detect(text: &str, min_markers: usize) -> Option<Detection> {
    let lines = lines_with_offsets(text);

    let markdown = markdown_markers(&lines);
    if markdown.len() >= min_markers {
        return Some(Detection {
            kind: StructureKind::Markdown,
            markers: markdown,
        });
    }

    if let Some(markers) = transcript_markers(&lines, min_markers) {
        return Some(Detection {
            kind: StructureKind::Transcript,
            markers,
        });
    }

    let numbered = numbered_markers(&lines);
    if numbered.len() >= min_markers {
        return Some(Detection {
            kind: StructureKind::Numbered,
            markers: numbered,
        });
    }

    None
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn heading_marker(line: &Line<'_>, level: usize, title: &str) -> Marker {
    Marker {
        start: line.start,
        body_start: line.next,
        level,
        title: title.trim().to_string(),
        heading: Some(line.text.trim().to_string()),
        kind: MarkerKind::Heading,
    }
}

pub(crate) fn markdown_markers(lines: &[Line<'_>]) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut in_fence = false;

    for line in lines {
        if is_fence(line.text) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some(caps) = MARKDOWN_HEADING.captures(line.text) {
            let level = caps.get(1).map_or(1, |m| m.as_str().len());
            let title = caps.get(2).map_or("", |m| m.as_str());
            if !title.trim().is_empty() {
                markers.push(heading_marker(line, level, title));
            }
        }
    }

    markers
}

fn plausible_numbered_title(title: &str) -> bool {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_NUMBERED_TITLE_CHARS {
        return false;
    }
    if title.split_whitespace().count() > MAX_NUMBERED_TITLE_WORDS {
        return false;
    }
    // List items read as sentences; headings do not.
    !title.ends_with(['.', ',', ';', '!', '?'])
}

pub(crate) fn numbered_markers(lines: &[Line<'_>]) -> Vec<Marker> {
    let mut markers = Vec::new();

    for line in lines {
        let text = line.text.trim();
        let caps = SECTION_HEADING
            .captures(text)
            .or_else(|| NUMBERED_HEADING.captures(text));
        let Some(caps) = caps else {
            continue;
        };

        let number = caps.get(1).map_or("", |m| m.as_str());
        let title = caps.get(2).map_or("", |m| m.as_str());
        if !plausible_numbered_title(title) {
            continue;
        }

        let level = number.split('.').filter(|part| !part.is_empty()).count();
        markers.push(heading_marker(line, level.max(1), title));
    }

    markers
}

/// Channel lines open level-1 sections; a change of message date opens a
/// section one level below the current channel. Date lines stay in the body.
pub(crate) fn transcript_markers(lines: &[Line<'_>], min_markers: usize) -> Option<Vec<Marker>> {
    let mut markers = Vec::new();
    let mut seen_channel = false;
    let mut last_date: Option<&str> = None;
    let mut date_lines = 0;

    for line in lines {
        let text = line.text.trim();

        if let Some(caps) = CHANNEL_LINE.captures(text) {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            markers.push(Marker {
                start: line.start,
                body_start: line.next,
                level: 1,
                title: format!("#{name}"),
                heading: Some(text.to_string()),
                kind: MarkerKind::Channel,
            });
            seen_channel = true;
            last_date = None;
            continue;
        }

        if let Some(date) = DATE_PREFIX.captures(text).and_then(|caps| caps.get(1)) {
            date_lines += 1;
            let date = date.as_str();
            if last_date != Some(date) {
                markers.push(Marker {
                    start: line.start,
                    body_start: line.start,
                    level: if seen_channel { 2 } else { 1 },
                    title: date.to_string(),
                    heading: None,
                    kind: MarkerKind::Date,
                });
                last_date = Some(date);
            }
        }
    }

    let reliable = if seen_channel {
        markers.len() >= min_markers
    } else {
        markers.len() >= min_markers && date_lines >= MIN_TRANSCRIPT_DATE_LINES.max(min_markers)
    };
    reliable.then_some(markers)
}
