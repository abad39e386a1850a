//! Markdown to styled lines.
//!
//! - `render_markdown()`: parse with pulldown-cmark and lay out at a width
//! - `wrap_styled_spans()`: style-preserving word wrap with hanging prefixes
//!
//! Math (`$..$`, `$$..$$`) is typeset to Unicode through `crate::math`.
//! Raw HTML is dropped so model output cannot inject terminal sequences.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::math;
use crate::style::{Style, StyledLine, StyledSpan};

/// Width and per-line prefixes for `wrap_styled_spans`.
#[derive(Debug, Clone, Default)]
pub struct WrapOptions {
    pub width: usize,
    /// Prepended to the first output line (list marker, quote bar).
    pub first_prefix: Vec<StyledSpan>,
    /// Prepended to every following line.
    pub rest_prefix: Vec<StyledSpan>,
}

impl WrapOptions {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn with_prefixes(
        width: usize,
        first_prefix: Vec<StyledSpan>,
        rest_prefix: Vec<StyledSpan>,
    ) -> Self {
        Self {
            width,
            first_prefix,
            rest_prefix,
        }
    }
}

fn prefix_width(prefix: &[StyledSpan]) -> usize {
    prefix.iter().map(StyledSpan::width).sum()
}

/// Accumulates words into lines of bounded width.
struct LineFiller<'a> {
    opts: &'a WrapOptions,
    lines: Vec<StyledLine>,
    spans: Vec<StyledSpan>,
    used: usize,
    /// A collapsed space waiting for the next word on this line.
    pending_space: Option<Style>,
}

impl<'a> LineFiller<'a> {
    fn new(opts: &'a WrapOptions) -> Self {
        Self {
            opts,
            lines: Vec::new(),
            spans: Vec::new(),
            used: 0,
            pending_space: None,
        }
    }

    fn prefix(&self) -> &'a [StyledSpan] {
        if self.lines.is_empty() {
            &self.opts.first_prefix
        } else {
            &self.opts.rest_prefix
        }
    }

    /// Content width available on the current line. At least one column so
    /// oversize prefixes still make progress.
    fn available(&self) -> usize {
        self.opts
            .width
            .saturating_sub(prefix_width(self.prefix()))
            .max(1)
    }

    fn rest_available(&self) -> usize {
        self.opts
            .width
            .saturating_sub(prefix_width(&self.opts.rest_prefix))
            .max(1)
    }

    fn append(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.used += text.width();
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(StyledSpan::new(text, style)),
        }
    }

    fn break_line(&mut self) {
        let mut spans = self.prefix().to_vec();
        spans.append(&mut self.spans);
        self.lines.push(StyledLine::from_spans(spans));
        self.used = 0;
        self.pending_space = None;
    }

    fn space(&mut self, style: Style) {
        if self.used > 0 {
            self.pending_space = Some(style);
        }
    }

    fn word(&mut self, text: &str, style: Style) {
        let width = text.width();
        let space = usize::from(self.pending_space.is_some());

        if self.used + space + width <= self.available() {
            if let Some(space_style) = self.pending_space.take() {
                self.append(" ", space_style);
            }
            self.append(text, style);
        } else if self.used > 0 && width <= self.rest_available() {
            self.break_line();
            self.append(text, style);
        } else {
            if self.used > 0 {
                self.break_line();
            }
            self.pending_space = None;
            self.hard_split(text, style);
        }
    }

    /// Places a word wider than a line, breaking between characters.
    fn hard_split(&mut self, text: &str, style: Style) {
        let mut chunk = String::new();
        let mut chunk_width = 0;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if w > 0 && chunk_width + w > self.available() && !chunk.is_empty() {
                self.append(&chunk, style);
                self.break_line();
                chunk.clear();
                chunk_width = 0;
            }
            chunk.push(ch);
            chunk_width += w;
        }
        self.append(&chunk, style);
    }

    fn end_hard_line(&mut self) {
        self.break_line();
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if !self.spans.is_empty() || self.lines.is_empty() {
            self.break_line();
        }
        self.lines
    }
}

/// Wraps spans to `opts.width`, keeping each fragment's style.
///
/// Ordinary text wraps at whitespace, with runs of whitespace collapsed to a
/// single space. Verbatim styles (code, math) keep their spacing and only
/// break mid-span when wider than a whole line. `\n` forces a line break.
pub fn wrap_styled_spans(spans: &[StyledSpan], opts: &WrapOptions) -> Vec<StyledLine> {
    if opts.width == 0 {
        let mut all = opts.first_prefix.clone();
        all.extend(spans.iter().cloned());
        return vec![StyledLine::from_spans(all)];
    }

    let mut filler = LineFiller::new(opts);
    for span in spans {
        for (i, part) in span.text.split('\n').enumerate() {
            if i > 0 {
                filler.end_hard_line();
            }
            if span.style.is_verbatim() {
                if !part.is_empty() {
                    filler.word(part, span.style);
                }
                continue;
            }
            push_words(&mut filler, part, span.style);
        }
    }
    filler.finish()
}

fn push_words(filler: &mut LineFiller<'_>, text: &str, style: Style) {
    let mut rest = text;
    while !rest.is_empty() {
        let ws_end = rest
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(rest.len());
        if ws_end > 0 {
            filler.space(style);
            rest = &rest[ws_end..];
            continue;
        }
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        filler.word(&rest[..word_end], style);
        rest = &rest[word_end..];
    }
}

/// Renders markdown into lines of at most `width` columns.
pub fn render_markdown(text: &str, width: usize) -> Vec<StyledLine> {
    render_markdown_with_style(text, width, Style::Assistant)
}

/// Like `render_markdown`, with `base` as the style of unadorned text.
pub fn render_markdown_with_style(text: &str, width: usize, base: Style) -> Vec<StyledLine> {
    if text.trim().is_empty() {
        return vec![StyledLine::empty()];
    }

    let options = Options::ENABLE_MATH
        | Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let mut renderer = MarkdownRenderer::new(width, base);
    for event in Parser::new_ext(text, options) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Debug)]
struct ListLevel {
    next_number: Option<u64>,
    marker: String,
    marker_shown: bool,
}

#[derive(Debug)]
struct CodeBlock {
    lang: Option<String>,
    text: String,
}

#[derive(Debug)]
struct PendingLink {
    url: String,
    /// Index into `spans` where the link text begins.
    start: usize,
}

struct MarkdownRenderer {
    width: usize,
    base: Style,
    lines: Vec<StyledLine>,
    spans: Vec<StyledSpan>,
    styles: Vec<Style>,
    lists: Vec<ListLevel>,
    quote_depth: usize,
    code: Option<CodeBlock>,
    links: Vec<PendingLink>,
    table_cell: usize,
}

impl MarkdownRenderer {
    fn new(width: usize, base: Style) -> Self {
        Self {
            width,
            base,
            lines: Vec::new(),
            spans: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            code: None,
            links: Vec::new(),
            table_cell: 0,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.spans.push(StyledSpan::new(code.as_ref(), Style::CodeInline)),
            Event::InlineMath(latex) => {
                self.spans
                    .push(StyledSpan::new(math::typeset(&latex), Style::Math));
            }
            Event::DisplayMath(latex) => self.display_math(&latex),
            Event::SoftBreak => self.spans.push(StyledSpan::new(" ", self.style())),
            Event::HardBreak => self.spans.push(StyledSpan::new("\n", self.style())),
            Event::Rule => {
                self.flush_block();
                let rule = "─".repeat(self.width.clamp(3, 40));
                self.lines
                    .push(StyledLine::from_spans(vec![StyledSpan::new(rule, Style::Rule)]));
                self.lines.push(StyledLine::empty());
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.spans.push(StyledSpan::new(marker, Style::ListBullet));
            }
            Event::FootnoteReference(label) => {
                self.spans
                    .push(StyledSpan::new(format!("[^{label}]"), Style::Link));
            }
            Event::Html(_) | Event::InlineHtml(_) => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_block();
                self.styles.push(match level {
                    HeadingLevel::H1 => Style::H1,
                    HeadingLevel::H2 => Style::H2,
                    _ => Style::H3,
                });
            }
            Tag::CodeBlock(kind) => {
                self.flush_block();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.code = Some(CodeBlock {
                    lang,
                    text: String::new(),
                });
            }
            Tag::List(start) => {
                self.flush_block();
                self.lists.push(ListLevel {
                    next_number: start,
                    marker: String::new(),
                    marker_shown: true,
                });
            }
            Tag::Item => {
                self.flush_block();
                if let Some(list) = self.lists.last_mut() {
                    list.marker = match list.next_number.as_mut() {
                        Some(n) => {
                            let marker = format!("{n}. ");
                            *n += 1;
                            marker
                        }
                        None => "• ".to_string(),
                    };
                    list.marker_shown = false;
                }
            }
            Tag::BlockQuote(_) => {
                self.flush_block();
                self.quote_depth += 1;
                self.styles.push(Style::BlockQuote);
            }
            Tag::Emphasis => self.styles.push(Style::Emphasis),
            Tag::Strong => self.styles.push(Style::Strong),
            Tag::Strikethrough => self.styles.push(Style::Strikethrough),
            Tag::Link { dest_url, .. } => {
                self.links.push(PendingLink {
                    url: dest_url.to_string(),
                    start: self.spans.len(),
                });
                self.styles.push(Style::Link);
            }
            Tag::Image { .. } => self.styles.push(Style::Link),
            Tag::TableHead => {
                self.table_cell = 0;
                self.styles.push(Style::Strong);
            }
            Tag::TableRow => self.table_cell = 0,
            Tag::TableCell => {
                if self.table_cell > 0 {
                    self.spans.push(StyledSpan::new(" │ ", Style::TableBorder));
                }
                self.table_cell += 1;
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_block();
                if self.lists.is_empty() {
                    self.lines.push(StyledLine::empty());
                }
            }
            TagEnd::Heading(_) => {
                self.flush_block();
                self.styles.pop();
                self.lines.push(StyledLine::empty());
            }
            TagEnd::CodeBlock => {
                self.flush_code_block();
                if self.lists.is_empty() {
                    self.lines.push(StyledLine::empty());
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.lines.push(StyledLine::empty());
                }
            }
            TagEnd::Item => {
                self.flush_block();
                // Empty item: still show its marker.
                if self.lists.last().is_some_and(|l| !l.marker_shown) {
                    let (first, _) = self.take_prefixes();
                    self.lines.push(StyledLine::from_spans(first));
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_block();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.styles.pop();
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Image => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                self.close_link();
            }
            TagEnd::TableHead => {
                self.styles.pop();
                self.flush_block();
                let rule = "─".repeat(self.width.clamp(3, 40));
                self.lines
                    .push(StyledLine::from_spans(vec![StyledSpan::new(rule, Style::TableBorder)]));
            }
            TagEnd::TableRow => self.flush_block(),
            TagEnd::Table => self.lines.push(StyledLine::empty()),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(code) = self.code.as_mut() {
            code.text.push_str(text);
            return;
        }
        if !text.is_empty() {
            self.spans.push(StyledSpan::new(text, self.style()));
        }
    }

    fn close_link(&mut self) {
        let Some(link) = self.links.pop() else {
            return;
        };
        let label: String = self.spans[link.start.min(self.spans.len())..]
            .iter()
            .map(|s| s.text.as_str())
            .collect();
        let url = link.url.trim();
        let autolink = url == label || url.strip_prefix("mailto:") == Some(label.as_str());
        if !url.is_empty() && !autolink {
            self.spans
                .push(StyledSpan::new(format!(" ({url})"), Style::LinkUrl));
        }
    }

    fn display_math(&mut self, latex: &str) {
        self.flush_block();
        let typeset = math::typeset(latex);
        let indent = self.continuation_prefix();
        for row in typeset.trim().lines() {
            let mut spans = indent.clone();
            spans.push(StyledSpan::new("  ", Style::Plain));
            spans.push(StyledSpan::new(row.trim_end(), Style::MathBlock));
            self.lines.push(StyledLine::from_spans(spans));
        }
    }

    /// Prefixes for the next block: quote bars, list indent and, for the
    /// first block of a list item, its marker.
    fn take_prefixes(&mut self) -> (Vec<StyledSpan>, Vec<StyledSpan>) {
        let mut first = self.quote_prefix();
        let mut rest = first.clone();

        let depth = self.lists.len();
        if let Some(list) = self.lists.last_mut() {
            let indent = "  ".repeat(depth - 1);
            let hang = " ".repeat(list.marker.width());
            rest.push(StyledSpan::new(format!("{indent}{hang}"), Style::Plain));
            if list.marker_shown {
                first.push(StyledSpan::new(format!("{indent}{hang}"), Style::Plain));
            } else {
                let marker_style = if list.next_number.is_some() {
                    Style::ListNumber
                } else {
                    Style::ListBullet
                };
                if !indent.is_empty() {
                    first.push(StyledSpan::new(indent, Style::Plain));
                }
                first.push(StyledSpan::new(list.marker.clone(), marker_style));
                list.marker_shown = true;
            }
        }
        (first, rest)
    }

    fn continuation_prefix(&self) -> Vec<StyledSpan> {
        let mut prefix = self.quote_prefix();
        if let Some(list) = self.lists.last() {
            let indent = "  ".repeat(self.lists.len() - 1);
            let hang = " ".repeat(list.marker.width());
            prefix.push(StyledSpan::new(format!("{indent}{hang}"), Style::Plain));
        }
        prefix
    }

    fn quote_prefix(&self) -> Vec<StyledSpan> {
        if self.quote_depth == 0 {
            Vec::new()
        } else {
            vec![StyledSpan::new("│ ".repeat(self.quote_depth), Style::BlockQuote)]
        }
    }

    fn flush_block(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        let (first, rest) = self.take_prefixes();
        let opts = WrapOptions::with_prefixes(self.width, first, rest);
        self.lines.extend(wrap_styled_spans(&spans, &opts));
    }

    /// Code blocks keep their lines as-is; the terminal clips overflow.
    fn flush_code_block(&mut self) {
        let Some(code) = self.code.take() else {
            return;
        };
        let indent = self.continuation_prefix();
        let fence_line = |text: String| {
            let mut spans = indent.clone();
            spans.push(StyledSpan::new(text, Style::CodeFence));
            StyledLine::from_spans(spans)
        };

        self.lines
            .push(fence_line(format!("```{}", code.lang.as_deref().unwrap_or(""))));
        for row in code.text.trim_end_matches('\n').split('\n') {
            let mut spans = indent.clone();
            spans.push(StyledSpan::new("  ", Style::Plain));
            spans.push(StyledSpan::new(row, Style::CodeBlock));
            self.lines.push(StyledLine::from_spans(spans));
        }
        self.lines.push(fence_line("```".to_string()));
    }

    fn finish(mut self) -> Vec<StyledLine> {
        // Unterminated code fence while streaming.
        if self.code.is_some() {
            self.flush_code_block();
        }
        self.flush_block();

        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(StyledLine::empty());
        }
        self.lines
    }
}
