use crate::config::SplitterConfig;
use crate::structure::lines_with_offsets;

/// Splits unstructured text into contiguous, length-bounded pieces.
///
/// Boundaries are preferred in this order: blank lines between
/// paragraphs, sentence ends and line breaks, whitespace, and finally a
/// cut at a character boundary. Every piece is a trimmed slice of the
/// input no longer than `max_leaf_chars` characters.
#[derive(Debug, Clone)]
pub struct LengthSplitter {
    target_chars: usize,
    max_chars: usize,
    min_chars: usize,
}

type Span = (usize, usize);

/// One length-bounded piece of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece<'a> {
    pub text: &'a str,

    /// No whitespace separates this piece from the previous one; the cut
    /// fell inside a token
    pub joins_previous: bool,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Shrink `start..end` to exclude surrounding whitespace
fn trim_span(text: &str, start: usize, end: usize) -> Option<Span> {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    let (start, end) = (start + leading, end - trailing);
    (start < end).then_some((start, end))
}

impl LengthSplitter {
    pub fn new(config: &SplitterConfig) -> Self {
        Self {
            target_chars: config.target_leaf_chars,
            max_chars: config.max_leaf_chars.max(1),
            min_chars: config.min_leaf_chars,
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into pieces in document order
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split_pieces(text)
            .into_iter()
            .map(|piece| piece.text)
            .collect()
    }

    /// Like [`Self::split`], also telling which pieces were cut out of the
    /// middle of a token
    pub fn split_pieces<'a>(&self, text: &'a str) -> Vec<Piece<'a>> {
        let mut pieces = Vec::new();
        let mut previous_end = None;
        for (start, end) in self.piece_spans(text) {
            let Some((start, end)) = trim_span(text, start, end) else {
                continue;
            };
            pieces.push(Piece {
                text: &text[start..end],
                joins_previous: previous_end == Some(start),
            });
            previous_end = Some(end);
        }
        pieces
    }

    fn piece_spans(&self, text: &str) -> Vec<Span> {
        let mut pieces: Vec<Span> = Vec::new();
        let mut current: Option<Span> = None;

        for (start, end) in self.units(text) {
            current = match current {
                None => Some((start, end)),
                Some((cur_start, cur_end)) => {
                    let merged = char_len(&text[cur_start..end]);
                    let current_len = char_len(&text[cur_start..cur_end]);
                    if merged <= self.target_chars
                        || (current_len < self.min_chars && merged <= self.max_chars)
                    {
                        Some((cur_start, end))
                    } else {
                        pieces.push((cur_start, cur_end));
                        Some((start, end))
                    }
                }
            };
        }

        if let Some((start, end)) = current {
            // Fold a short tail into its predecessor when it still fits.
            match pieces.last_mut() {
                Some(last)
                    if char_len(&text[start..end]) < self.min_chars
                        && char_len(&text[last.0..end]) <= self.max_chars =>
                {
                    last.1 = end;
                }
                _ => pieces.push((start, end)),
            }
        }

        pieces
    }

    /// Indivisible spans, each at most `max_chars` long
    fn units(&self, text: &str) -> Vec<Span> {
        let mut units = Vec::new();
        for (start, end) in paragraph_spans(text) {
            if char_len(&text[start..end]) <= self.max_chars {
                units.push((start, end));
                continue;
            }
            for (s_start, s_end) in sentence_spans(text, start, end) {
                if char_len(&text[s_start..s_end]) <= self.max_chars {
                    units.push((s_start, s_end));
                } else {
                    self.hard_cut(text, s_start, s_end, &mut units);
                }
            }
        }
        units
    }

    fn hard_cut(&self, text: &str, mut start: usize, end: usize, units: &mut Vec<Span>) {
        while char_len(&text[start..end]) > self.max_chars {
            let window = &text[start..end];
            let limit = window
                .char_indices()
                .nth(self.max_chars)
                .map_or(window.len(), |(idx, _)| idx);
            let prefix = &window[..limit];
            let cut = match prefix.rfind(char::is_whitespace) {
                Some(idx) if idx > limit / 2 => idx,
                _ => limit,
            };

            if let Some(span) = trim_span(text, start, start + cut) {
                units.push(span);
            }
            start += cut;
        }

        if let Some(span) = trim_span(text, start, end) {
            units.push(span);
        }
    }
}

/// Runs of non-blank lines
fn paragraph_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut open: Option<Span> = None;

    for line in lines_with_offsets(text) {
        if line.is_blank() {
            if let Some(span) = open.take() {
                spans.push(span);
            }
            continue;
        }
        open = match open {
            Some((start, _)) => Some((start, line.end)),
            None => Some((line.start, line.end)),
        };
    }
    if let Some(span) = open {
        spans.push(span);
    }

    spans
        .into_iter()
        .filter_map(|(start, end)| trim_span(text, start, end))
        .collect()
}

/// Sentences and lines inside `start..end`
fn sentence_spans(text: &str, start: usize, end: usize) -> Vec<Span> {
    let region = &text[start..end];
    let mut spans = Vec::new();
    let mut from = 0;
    let mut chars = region.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let boundary = match ch {
            '\n' => true,
            '.' | '!' | '?' => chars.peek().is_none_or(|(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            let to = idx + ch.len_utf8();
            if let Some(span) = trim_span(text, start + from, start + to) {
                spans.push(span);
            }
            from = to;
        }
    }
    if let Some(span) = trim_span(text, start + from, end) {
        spans.push(span);
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn splitter(target: usize, max: usize, min: usize) -> LengthSplitter {
        LengthSplitter {
            target_chars: target,
            max_chars: max,
            min_chars: min,
        }
    }

    #[test]
    fn test_short_text_is_one_piece() {
        let pieces = splitter(100, 120, 10).split("  One paragraph.\n\nAnother.  ");
        assert_eq!(pieces, vec!["One paragraph.\n\nAnother."]);
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let text = "Alpha alpha alpha alpha.\n\nBeta beta beta beta.\n\nGamma gamma gamma.";
        let pieces = splitter(30, 40, 5).split(text);
        assert_eq!(
            pieces,
            vec!["Alpha alpha alpha alpha.", "Beta beta beta beta.", "Gamma gamma gamma."]
        );
    }

    #[test]
    fn test_long_paragraph_splits_on_sentences() {
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let pieces = splitter(25, 30, 5).split(text);
        assert_eq!(
            pieces,
            vec![
                "First sentence here.",
                "Second sentence here.",
                "Third sentence here."
            ]
        );
    }

    #[test]
    fn test_hard_cut_respects_limit_and_utf8() {
        let text = "é".repeat(95);
        let pieces = splitter(30, 40, 5).split(&text);
        assert!(pieces.len() >= 3);
        for piece in &pieces {
            assert!(piece.chars().count() <= 40);
        }
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn test_mid_token_cuts_are_flagged() {
        let text = format!("Intro line.\n\n{}", "x".repeat(50));
        let pieces = splitter(20, 20, 5).split_pieces(&text);

        let flags: Vec<bool> = pieces.iter().map(|piece| piece.joins_previous).collect();
        assert_eq!(flags, vec![false, false, true, true]);
        let glued: String = pieces[1..].iter().map(|piece| piece.text).collect();
        assert_eq!(glued, "x".repeat(50));
    }

    #[test]
    fn test_whitespace_cuts_are_not_flagged() {
        let text = "word ".repeat(40);
        let pieces = splitter(30, 40, 5).split_pieces(&text);
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|piece| !piece.joins_previous));
    }

    #[test]
    fn test_pieces_are_contiguous_slices() {
        let text = "Lorem ipsum dolor sit amet. ".repeat(30);
        let pieces = splitter(100, 150, 20).split(&text);
        let rejoined: Vec<&str> = text.split_whitespace().collect();
        let from_pieces: Vec<&str> = pieces.iter().flat_map(|p| p.split_whitespace()).collect();
        assert_eq!(from_pieces, rejoined);
        for piece in &pieces {
            assert!(text.contains(piece));
            assert!(piece.chars().count() <= 150);
        }
    }

    #[test]
    fn test_short_tail_is_merged() {
        let text = "Alpha alpha alpha alpha.\n\nBeta.";
        let pieces = splitter(20, 40, 10).split(text);
        assert_eq!(pieces, vec!["Alpha alpha alpha alpha.\n\nBeta."]);
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert!(splitter(10, 20, 2).split(" \n\n\t ").is_empty());
    }
}
