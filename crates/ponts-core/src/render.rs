//! Turn rendering: splits a turn's text into visible markdown and a single
//! collapsible reasoning block.
//!
//! Nothing here is cached. Every call re-segments the full text, so the
//! output is always consistent with the text the session currently holds.

use std::collections::HashMap;

use crate::core::session::TurnId;
use crate::markdown::{WrapOptions, render_markdown, render_markdown_with_style, wrap_styled_spans};
use crate::math::normalize_math_delimiters;
use crate::segment::{self, ParsedText};
use crate::style::{Style, StyledLine, StyledSpan};

const REASONING_GUTTER: &str = "┆ ";

/// Per-turn "reasoning expanded" flags. Turns start collapsed.
#[derive(Debug, Clone, Default)]
pub struct RevealState {
    revealed: HashMap<TurnId, bool>,
}

impl RevealState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_revealed(&self, turn: TurnId) -> bool {
        self.revealed.get(&turn).copied().unwrap_or(false)
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&mut self, turn: TurnId) -> bool {
        let entry = self.revealed.entry(turn).or_insert(false);
        *entry = !*entry;
        *entry
    }

    pub fn set(&mut self, turn: TurnId, revealed: bool) {
        self.revealed.insert(turn, revealed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: usize,
    /// Turn is still receiving tokens.
    pub streaming: bool,
    /// Reasoning block is expanded.
    pub revealed: bool,
}

impl RenderOptions {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            streaming: false,
            revealed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleLabel {
    Hide,
    Thinking,
    Show,
}

impl ToggleLabel {
    pub fn pick(revealed: bool, streaming: bool, open_reasoning: bool) -> Self {
        if revealed {
            ToggleLabel::Hide
        } else if streaming && open_reasoning {
            ToggleLabel::Thinking
        } else {
            ToggleLabel::Show
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            ToggleLabel::Hide => "Hide reasoning",
            ToggleLabel::Thinking => "Thinking…",
            ToggleLabel::Show => "Show reasoning",
        }
    }

    fn glyph(self) -> &'static str {
        match self {
            ToggleLabel::Hide => "▾",
            ToggleLabel::Thinking => "…",
            ToggleLabel::Show => "▸",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBlock {
    Markdown(Vec<StyledLine>),
    Toggle(ToggleLabel),
    Reasoning(Vec<StyledLine>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTurn {
    pub blocks: Vec<RenderBlock>,
}

impl RenderedTurn {
    pub fn toggle(&self) -> Option<ToggleLabel> {
        self.blocks.iter().find_map(|b| match b {
            RenderBlock::Toggle(label) => Some(*label),
            _ => None,
        })
    }

    /// Flattens the blocks into display lines, separating blocks with a
    /// blank line.
    pub fn lines(&self) -> Vec<StyledLine> {
        let mut out = Vec::new();
        for block in &self.blocks {
            if !out.is_empty() {
                out.push(StyledLine::empty());
            }
            match block {
                RenderBlock::Markdown(lines) | RenderBlock::Reasoning(lines) => {
                    out.extend(lines.iter().cloned());
                }
                RenderBlock::Toggle(label) => out.push(toggle_line(*label)),
            }
        }
        out
    }
}

fn toggle_line(label: ToggleLabel) -> StyledLine {
    StyledLine::from_spans(vec![StyledSpan::new(
        format!("{} {}", label.glyph(), label.text()),
        Style::ReasoningToggle,
    )])
}

/// Renders one assistant turn.
///
/// Visible segments go through math normalisation and markdown. All
/// reasoning is gathered under one toggle placed where the first reasoning
/// segment appears; no toggle at all if the reasoning is blank.
pub fn render_turn(text: &str, opts: RenderOptions) -> RenderedTurn {
    // A marker split across tokens must not flash as visible text.
    let text = if opts.streaming {
        segment::settled_prefix(text)
    } else {
        text
    };
    let parsed = segment::parse(text);
    let show_toggle = parsed.has_reasoning_content();

    let mut blocks = Vec::new();
    let mut toggle_placed = false;
    for seg in &parsed.segments {
        if seg.is_reasoning {
            if show_toggle && !toggle_placed {
                toggle_placed = true;
                let label = ToggleLabel::pick(opts.revealed, opts.streaming, parsed.open_reasoning);
                blocks.push(RenderBlock::Toggle(label));
                if opts.revealed {
                    blocks.push(RenderBlock::Reasoning(render_reasoning(&parsed, opts.width)));
                }
            }
            continue;
        }
        if seg.content.trim().is_empty() {
            continue;
        }
        let normalized = normalize_math_delimiters(&seg.content);
        blocks.push(RenderBlock::Markdown(render_markdown(&normalized, opts.width)));
    }

    RenderedTurn { blocks }
}

/// Reasoning goes through the same math and markdown path as the answer,
/// dimmed and behind a `┆` gutter.
fn render_reasoning(parsed: &ParsedText, width: usize) -> Vec<StyledLine> {
    let normalized = normalize_math_delimiters(parsed.reasoning_text().trim());
    let body = render_markdown_with_style(
        &normalized,
        width.saturating_sub(REASONING_GUTTER.len()),
        Style::Reasoning,
    );
    body.into_iter()
        .map(|line| {
            let gutter = if line.is_blank() {
                REASONING_GUTTER.trim_end()
            } else {
                REASONING_GUTTER
            };
            let mut spans = vec![StyledSpan::new(gutter, Style::Reasoning)];
            spans.extend(line.spans);
            StyledLine::from_spans(spans)
        })
        .collect()
}

/// Renders a user turn: plain text behind a gutter, no markdown.
pub fn render_user_text(text: &str, width: usize) -> Vec<StyledLine> {
    let prefix = || vec![StyledSpan::new("│ ", Style::UserPrefix)];
    let opts = WrapOptions::with_prefixes(width, prefix(), prefix());
    wrap_styled_spans(&[StyledSpan::new(text.trim_end(), Style::User)], &opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::lines_to_text;

    fn opts(streaming: bool, revealed: bool) -> RenderOptions {
        RenderOptions {
            width: 80,
            streaming,
            revealed,
        }
    }

    fn kinds(turn: &RenderedTurn) -> Vec<&'static str> {
        turn.blocks
            .iter()
            .map(|b| match b {
                RenderBlock::Markdown(_) => "md",
                RenderBlock::Toggle(_) => "toggle",
                RenderBlock::Reasoning(_) => "reasoning",
            })
            .collect()
    }

    #[test]
    fn test_plain_answer_has_no_toggle() {
        let turn = render_turn("Hi there", opts(false, false));
        assert_eq!(kinds(&turn), vec!["md"]);
        assert_eq!(turn.toggle(), None);
        assert_eq!(lines_to_text(&turn.lines()), "Hi there");
    }

    #[test]
    fn test_collapsed_reasoning_shows_toggle_only() {
        let turn = render_turn("<think>step one</think>Answer", opts(false, false));
        assert_eq!(kinds(&turn), vec!["toggle", "md"]);
        assert_eq!(turn.toggle(), Some(ToggleLabel::Show));
        let text = lines_to_text(&turn.lines());
        assert!(!text.contains("step one"));
        assert!(text.contains("Answer"));
    }

    #[test]
    fn test_revealed_reasoning_is_dim() {
        let turn = render_turn("<think>step one</think>Answer", opts(false, true));
        assert_eq!(kinds(&turn), vec!["toggle", "reasoning", "md"]);
        assert_eq!(turn.toggle(), Some(ToggleLabel::Hide));
        let RenderBlock::Reasoning(lines) = &turn.blocks[1] else {
            panic!("expected reasoning block");
        };
        assert_eq!(lines_to_text(lines), "┆ step one");
        assert!(lines[0].spans.iter().all(|s| s.style == Style::Reasoning));
    }

    #[test]
    fn test_multiple_reasoning_blocks_share_one_toggle() {
        let turn = render_turn(
            "Intro<think>first</think>Middle<think>second</think>End",
            opts(false, true),
        );
        assert_eq!(kinds(&turn), vec!["md", "toggle", "reasoning", "md", "md"]);
        let RenderBlock::Reasoning(lines) = &turn.blocks[2] else {
            panic!("expected reasoning block");
        };
        assert_eq!(lines_to_text(lines), "┆ firstsecond");
    }

    #[test]
    fn test_blank_reasoning_has_no_toggle() {
        let turn = render_turn("<think>  \n </think>Answer", opts(false, false));
        assert_eq!(kinds(&turn), vec!["md"]);
    }

    #[test]
    fn test_thinking_label_while_streaming_inside_reasoning() {
        let turn = render_turn("<think>pondering", opts(true, false));
        assert_eq!(turn.toggle(), Some(ToggleLabel::Thinking));

        let closed = render_turn("<think>pondering</think>Ans", opts(true, false));
        assert_eq!(closed.toggle(), Some(ToggleLabel::Show));

        let revealed = render_turn("<think>pondering", opts(true, true));
        assert_eq!(revealed.toggle(), Some(ToggleLabel::Hide));

        let done = render_turn("<think>pondering", opts(false, false));
        assert_eq!(done.toggle(), Some(ToggleLabel::Show));
    }

    #[test]
    fn test_partial_marker_hidden_while_streaming() {
        let turn = render_turn("Sure<thi", opts(true, false));
        assert_eq!(lines_to_text(&turn.lines()), "Sure");

        let finished = render_turn("Sure<thi", opts(false, false));
        assert_eq!(lines_to_text(&finished.lines()), "Sure<thi");
    }

    #[test]
    fn test_math_delimiters_normalized_before_markdown() {
        let turn = render_turn(r"The area is \(\pi r^2\).", opts(false, false));
        assert_eq!(lines_to_text(&turn.lines()), "The area is π r².");
    }

    #[test]
    fn test_revealed_reasoning_renders_markdown_and_math() {
        let turn = render_turn(
            r"<think>Area is \(\pi r^2\) and **bold**</think>A",
            opts(false, true),
        );
        let RenderBlock::Reasoning(lines) = &turn.blocks[1] else {
            panic!("expected reasoning block");
        };
        assert_eq!(lines_to_text(lines), "┆ Area is π r² and bold");
        let spans = &lines[0].spans;
        assert!(spans.iter().any(|s| s.style == Style::Strong && s.text == "bold"));
        assert!(spans.iter().any(|s| s.style == Style::Math));
    }

    #[test]
    fn test_revealed_reasoning_paragraphs_keep_gutter() {
        let turn = render_turn("<think>one\n\ntwo</think>A", opts(false, true));
        let RenderBlock::Reasoning(lines) = &turn.blocks[1] else {
            panic!("expected reasoning block");
        };
        assert_eq!(lines_to_text(lines), "┆ one\n┆\n┆ two");
    }

    #[test]
    fn test_reveal_state_toggles() {
        let mut reveal = RevealState::new();
        assert!(!reveal.is_revealed(3));
        assert!(reveal.toggle(3));
        assert!(reveal.is_revealed(3));
        assert!(!reveal.is_revealed(4));
        assert!(!reveal.toggle(3));
        reveal.set(4, true);
        assert!(reveal.is_revealed(4));
    }

    #[test]
    fn test_user_text_has_gutter() {
        let lines = render_user_text("hello", 80);
        assert_eq!(lines_to_text(&lines), "│ hello");
    }
}
