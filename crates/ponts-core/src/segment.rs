//! Splits assistant text into visible and reasoning segments.
//!
//! Reasoning models wrap their internal monologue in `<think>` / `</think>`
//! markers inline with the answer. The whole accumulated text is re-parsed
//! on every render, so the parser carries no state between calls.
//!
//! ```text
//! "a<think>b</think>c"  ->  [a (visible), b (reasoning), c (visible)]
//! "<think>unfinished"   ->  [unfinished (reasoning)], open_reasoning = true
//! ```
//!
//! Blocks do not nest. An opener seen while already inside a block is
//! consumed without changing state, and the first closer ends the block.

/// Literal marker that opens a reasoning block.
pub const THINK_OPEN: &str = "<think>";

/// Literal marker that closes a reasoning block.
pub const THINK_CLOSE: &str = "</think>";

/// A maximal run of text tagged as reasoning or visible answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub content: String,
    pub is_reasoning: bool,
}

impl Segment {
    pub fn visible(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_reasoning: false,
        }
    }

    pub fn reasoning(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_reasoning: true,
        }
    }
}

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    #[default]
    Normal,
    Reasoning,
}

/// Result of parsing one turn's text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedText {
    pub segments: Vec<Segment>,
    /// The scan ended inside a reasoning block (no closer yet).
    pub open_reasoning: bool,
}

impl ParsedText {
    /// Concatenated visible (non-reasoning) content.
    pub fn visible_text(&self) -> String {
        self.collect(false)
    }

    /// Concatenated reasoning content.
    pub fn reasoning_text(&self) -> String {
        self.collect(true)
    }

    /// Returns true if any reasoning segment has non-whitespace content.
    pub fn has_reasoning_content(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.is_reasoning && !s.content.trim().is_empty())
    }

    fn collect(&self, reasoning: bool) -> String {
        self.segments
            .iter()
            .filter(|s| s.is_reasoning == reasoning)
            .map(|s| s.content.as_str())
            .collect()
    }
}

/// Splits `text` into ordered segments.
pub fn segment(text: &str) -> Vec<Segment> {
    parse(text).segments
}

/// Splits `text` into ordered segments and reports the final scanner state.
pub fn parse(text: &str) -> ParsedText {
    let mut segments = Vec::new();
    let mut state = ParseState::Normal;
    let mut buffer_start = 0;
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let transition = if rest.starts_with(THINK_OPEN) {
            Some((ParseState::Reasoning, THINK_OPEN.len()))
        } else if rest.starts_with(THINK_CLOSE) {
            Some((ParseState::Normal, THINK_CLOSE.len()))
        } else {
            None
        };

        match transition {
            Some((next, marker_len)) => {
                flush(&mut segments, &text[buffer_start..pos], state);
                state = next;
                pos += marker_len;
                buffer_start = pos;
            }
            None => {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    flush(&mut segments, &text[buffer_start..], state);

    ParsedText {
        segments,
        open_reasoning: state == ParseState::Reasoning,
    }
}

fn flush(segments: &mut Vec<Segment>, buffer: &str, state: ParseState) {
    if buffer.is_empty() {
        return;
    }
    segments.push(Segment {
        content: buffer.to_string(),
        is_reasoning: state == ParseState::Reasoning,
    });
}

/// Returns the prefix of `text` that cannot change meaning when more text is
/// appended, i.e. without a trailing partial marker such as `"</thi"`.
pub fn settled_prefix(text: &str) -> &str {
    for marker in [THINK_OPEN, THINK_CLOSE] {
        for len in (1..marker.len()).rev() {
            if text.ends_with(&marker[..len]) {
                return &text[..text.len() - len];
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_markers(s: &str) -> String {
        s.replace(THINK_OPEN, "").replace(THINK_CLOSE, "")
    }

    fn joined(segments: &[Segment]) -> String {
        segments.iter().map(|s| s.content.as_str()).collect()
    }

    #[test]
    fn test_no_markers_is_single_visible_segment() {
        for s in ["no markers here", "x", "line one\nline two", "  padded  ", "émoji 🦀 ok"] {
            assert_eq!(segment(s), vec![Segment::visible(s)]);
        }
    }

    #[test]
    fn test_empty_text_has_no_segments() {
        let parsed = parse("");
        assert!(parsed.segments.is_empty());
        assert!(!parsed.open_reasoning);
    }

    #[test]
    fn test_reasoning_between_markers() {
        assert_eq!(
            segment("a<think>b</think>c"),
            vec![
                Segment::visible("a"),
                Segment::reasoning("b"),
                Segment::visible("c"),
            ]
        );
    }

    #[test]
    fn test_unclosed_block_is_open_reasoning() {
        let parsed = parse("<think>unfinished");
        assert_eq!(parsed.segments, vec![Segment::reasoning("unfinished")]);
        assert!(parsed.open_reasoning);
    }

    #[test]
    fn test_closed_block_is_not_open() {
        let parsed = parse("<think>done</think>answer");
        assert!(!parsed.open_reasoning);
        assert_eq!(parsed.visible_text(), "answer");
        assert_eq!(parsed.reasoning_text(), "done");
    }

    #[test]
    fn test_markers_match_regardless_of_whitespace() {
        assert_eq!(
            segment("x\n<think>\n  y  \n</think>\nz"),
            vec![
                Segment::visible("x\n"),
                Segment::reasoning("\n  y  \n"),
                Segment::visible("\nz"),
            ]
        );
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        assert_eq!(
            segment("<THINK>loud</THINK>"),
            vec![Segment::visible("<THINK>loud</THINK>")]
        );
    }

    #[test]
    fn test_nested_opener_does_not_nest() {
        assert_eq!(
            segment("<think>a<think>b</think>c</think>d"),
            vec![
                Segment::reasoning("a"),
                Segment::reasoning("b"),
                Segment::visible("c"),
                Segment::visible("d"),
            ]
        );
    }

    #[test]
    fn test_multiple_blocks() {
        let parsed = parse("<think>one</think>mid<think>two</think>end");
        assert_eq!(parsed.reasoning_text(), "onetwo");
        assert_eq!(parsed.visible_text(), "midend");
    }

    #[test]
    fn test_concatenation_equals_text_without_markers() {
        let inputs = [
            "",
            "plain",
            "<think></think>",
            "a<think>b</think>c",
            "<think>open",
            "</think>stray closer",
            "<think>a<think>b</think>c",
            "<thin>not a marker</thin>",
            "multi\n<think>\nline\n</think>\n\nanswer",
            "ü<think>ß</think>🦀",
        ];
        for s in inputs {
            assert_eq!(joined(&segment(s)), strip_markers(s), "input: {s:?}");
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let s = "pre<think>mid</think>post<think>tail";
        assert_eq!(parse(s), parse(s));
    }

    #[test]
    fn test_whitespace_only_reasoning_has_no_content() {
        assert!(!parse("<think>\n \n</think>answer").has_reasoning_content());
        assert!(parse("<think> x </think>").has_reasoning_content());
    }

    #[test]
    fn test_streaming_prefixes_are_consistent() {
        // Re-parsing every prefix of a streamed answer must never mark
        // already-complete visible text as reasoning.
        let full = "Intro <think>considering</think> Final answer.";
        for end in 0..=full.len() {
            if !full.is_char_boundary(end) {
                continue;
            }
            let parsed = parse(settled_prefix(&full[..end]));
            assert!(
                "Intro  Final answer.".starts_with(&parsed.visible_text()),
                "prefix {end}: {:?}",
                parsed.visible_text()
            );
        }
    }

    #[test]
    fn test_settled_prefix_holds_back_partial_markers() {
        assert_eq!(settled_prefix("answer <thi"), "answer ");
        assert_eq!(settled_prefix("reasoning</"), "reasoning");
        assert_eq!(settled_prefix("reasoning<"), "reasoning");
        assert_eq!(settled_prefix("done</think>"), "done</think>");
        assert_eq!(settled_prefix("a < b"), "a < b");
        assert_eq!(settled_prefix(""), "");
    }
}
