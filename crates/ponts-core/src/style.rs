//! UI-agnostic styled text.
//!
//! Renderers produce these; the TUI maps `Style` to terminal attributes and
//! exec mode prints the plain text.

use unicode_width::UnicodeWidthStr;

/// A run of text with one semantic style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: Style,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn width(&self) -> usize {
        self.text.width()
    }
}

/// One display line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_spans(spans: Vec<StyledSpan>) -> Self {
        Self { spans }
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }

    pub fn width(&self) -> usize {
        self.spans.iter().map(StyledSpan::width).sum()
    }
}

/// Semantic style identifiers, mapped to colors by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Plain,
    /// User message gutter ("│ ").
    UserPrefix,
    User,
    Assistant,
    /// Revealed reasoning text (dim italic).
    Reasoning,
    /// The show/hide reasoning control.
    ReasoningToggle,
    /// "[stopped]" marker on cancelled turns.
    Interrupted,
    Error,

    // Markdown
    CodeInline,
    CodeBlock,
    CodeFence,
    Emphasis,
    Strong,
    Strikethrough,
    H1,
    H2,
    H3,
    Link,
    /// URL shown after link text.
    LinkUrl,
    BlockQuote,
    ListBullet,
    ListNumber,
    Rule,
    TableBorder,
    /// Inline math.
    Math,
    /// Display math.
    MathBlock,
}

impl Style {
    /// Spans in these styles keep their whitespace and are never split at
    /// word boundaries.
    pub fn is_verbatim(self) -> bool {
        matches!(self, Style::CodeInline | Style::CodeBlock | Style::Math)
    }
}

/// Concatenates the text of rendered lines, one per row.
pub fn lines_to_text(lines: &[StyledLine]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&line.plain_text());
    }
    out
}
