//! Pure view functions: read `AppState`, draw a frame.

use ponts_core::core::session::{Turn, TurnStatus};
use ponts_core::providers::Role;
use ponts_core::render::{RenderOptions, render_turn, render_user_text};
use ponts_core::style::{Style as TextStyle, StyledLine};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Padding, Paragraph};

use crate::state::AppState;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Ticks per spinner frame.
const SPINNER_SPEED_DIVISOR: usize = 4;

const MAX_INPUT_LINES: u16 = 6;

/// Horizontal padding around the transcript.
const TRANSCRIPT_MARGIN: u16 = 1;

/// Gutter before assistant lines; carries the focus bar.
const FOCUS_GUTTER: usize = 2;

const HELP: &str =
    "Enter send · Shift+Enter newline · Esc stop · Ctrl+R reasoning · Ctrl+↑/↓ focus · PgUp/PgDn scroll · Ctrl+D quit";

/// Layout facts the runtime feeds back into scroll state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetrics {
    pub total_lines: usize,
    pub viewport: usize,
}

pub fn render(state: &AppState, frame: &mut Frame) -> FrameMetrics {
    let input_rows = u16::try_from(state.input.line_count())
        .unwrap_or(MAX_INPUT_LINES)
        .clamp(1, MAX_INPUT_LINES);
    let [header, body, input, help] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(input_rows + 2),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(state, frame, header);
    let metrics = render_transcript(state, frame, body);
    render_input(state, frame, input);
    render_help(state, frame, help);
    metrics
}

fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Ponts ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(state.model.clone(), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(title), area);

    let status = if state.session.is_streaming() {
        Span::styled(
            format!("{} streaming ", spinner(state.spinner_frame)),
            Style::default().fg(Color::Yellow),
        )
    } else {
        Span::styled("idle ", Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(
        Paragraph::new(Line::from(status)).alignment(Alignment::Right),
        area,
    );
}

fn render_transcript(state: &AppState, frame: &mut Frame, area: Rect) -> FrameMetrics {
    let width = area.width.saturating_sub(TRANSCRIPT_MARGIN * 2) as usize;
    let lines = transcript_lines(state, width);
    let viewport = area.height as usize;

    let mut scroll = state.scroll.clone();
    scroll.set_metrics(lines.len(), viewport);
    let total_lines = lines.len();
    let visible: Vec<Line<'static>> = lines
        .into_iter()
        .skip(scroll.top())
        .take(viewport)
        .collect();

    frame.render_widget(
        Paragraph::new(visible).block(Block::default().padding(Padding::horizontal(TRANSCRIPT_MARGIN))),
        area,
    );
    FrameMetrics {
        total_lines,
        viewport,
    }
}

fn render_input(state: &AppState, frame: &mut Frame, area: Rect) {
    let title = if state.session.is_streaming() {
        " Esc to stop "
    } else {
        " Message "
    };
    let border = if state.session.is_streaming() {
        Color::DarkGray
    } else {
        Color::Cyan
    };
    let block = Block::bordered()
        .title(title)
        .border_style(Style::default().fg(border));

    let visible_rows = area.height.saturating_sub(2).max(1) as usize;
    let (row, col) = state.input.cursor_position();
    let row_offset = row.saturating_sub(visible_rows - 1);

    let text: Vec<Line<'static>> = state
        .input
        .text()
        .split('\n')
        .map(|l| Line::raw(l.to_string()))
        .collect();
    frame.render_widget(
        Paragraph::new(text)
            .block(block)
            .scroll((u16::try_from(row_offset).unwrap_or(u16::MAX), 0)),
        area,
    );

    let inner_width = area.width.saturating_sub(2);
    let x = area.x + 1 + u16::try_from(col).unwrap_or(u16::MAX).min(inner_width.saturating_sub(1));
    let y = area.y + 1 + u16::try_from(row - row_offset).unwrap_or(0);
    frame.set_cursor_position((x, y));
}

fn render_help(state: &AppState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        format!(" {HELP}"),
        Style::default().fg(Color::DarkGray),
    )];
    if !state.scroll.is_following() {
        spans.insert(
            0,
            Span::styled(" ↓ more", Style::default().fg(Color::Yellow)),
        );
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Builds every transcript line at `width` columns.
pub fn transcript_lines(state: &AppState, width: usize) -> Vec<Line<'static>> {
    let turns = state.session.turns();
    if turns.is_empty() {
        return vec![Line::styled(
            "Ask anything. Answers stream in as they are generated.",
            Style::default().fg(Color::DarkGray),
        )];
    }

    let mut lines = Vec::new();
    for (i, turn) in turns.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        match turn.speaker {
            Role::User => lines.extend(render_user_text(&turn.text, width).into_iter().map(convert_line)),
            Role::Assistant => assistant_lines(state, turn, width, &mut lines),
        }
    }
    lines
}

fn assistant_lines(state: &AppState, turn: &Turn, width: usize, out: &mut Vec<Line<'static>>) {
    let focused = state.focus == Some(turn.id);
    let streaming = turn.is_streaming();
    let rendered = render_turn(
        &turn.text,
        RenderOptions {
            width: width.saturating_sub(FOCUS_GUTTER),
            streaming,
            revealed: state.reveal.is_revealed(turn.id),
        },
    );

    let mut body: Vec<Line<'static>> = rendered
        .lines()
        .into_iter()
        .map(|styled| {
            let is_toggle = styled
                .spans
                .first()
                .is_some_and(|s| s.style == TextStyle::ReasoningToggle);
            let line = convert_line(styled);
            if is_toggle && focused {
                line.patch_style(Modifier::REVERSED)
            } else {
                line
            }
        })
        .collect();

    if streaming {
        let label = if rendered.blocks.is_empty() {
            " waiting for model…"
        } else {
            ""
        };
        body.push(Line::from(vec![
            Span::styled(spinner(state.spinner_frame), Style::default().fg(Color::Yellow)),
            Span::styled(label, convert_style(TextStyle::Interrupted)),
        ]));
    }
    match &turn.status {
        TurnStatus::Cancelled => body.push(Line::styled(
            "[stopped]",
            convert_style(TextStyle::Interrupted),
        )),
        TurnStatus::Failed { message } => body.push(Line::styled(
            format!("Error: {message}"),
            convert_style(TextStyle::Error),
        )),
        TurnStatus::Streaming | TurnStatus::Complete => {}
    }

    let gutter = if focused { "┃ " } else { "  " };
    for line in body {
        let mut spans = vec![Span::styled(gutter, Style::default().fg(Color::Yellow))];
        spans.extend(line.spans);
        out.push(Line::from(spans).style(line.style));
    }
}

fn spinner(frame: usize) -> &'static str {
    SPINNER_FRAMES[(frame / SPINNER_SPEED_DIVISOR) % SPINNER_FRAMES.len()]
}

fn convert_line(line: StyledLine) -> Line<'static> {
    Line::from(
        line.spans
            .into_iter()
            .map(|s| Span::styled(s.text, convert_style(s.style)))
            .collect::<Vec<_>>(),
    )
}

fn convert_style(style: TextStyle) -> Style {
    match style {
        TextStyle::Plain | TextStyle::TableBorder => Style::default(),
        TextStyle::UserPrefix => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        TextStyle::User => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::ITALIC),
        TextStyle::Assistant => Style::default().fg(Color::White),
        TextStyle::Reasoning => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM | Modifier::ITALIC),
        TextStyle::ReasoningToggle => Style::default().fg(Color::Magenta),
        TextStyle::Interrupted => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
        TextStyle::Error => Style::default().fg(Color::Red),
        TextStyle::CodeInline | TextStyle::CodeBlock => Style::default().fg(Color::Cyan),
        TextStyle::CodeFence | TextStyle::Rule => Style::default().fg(Color::DarkGray),
        TextStyle::Emphasis => Style::default().add_modifier(Modifier::ITALIC),
        TextStyle::Strong => Style::default().add_modifier(Modifier::BOLD),
        TextStyle::Strikethrough => Style::default().add_modifier(Modifier::CROSSED_OUT),
        TextStyle::H1 => Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        TextStyle::H2 => Style::default().add_modifier(Modifier::BOLD),
        TextStyle::H3 => Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::ITALIC),
        TextStyle::Link => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::UNDERLINED),
        TextStyle::LinkUrl => Style::default().fg(Color::DarkGray),
        TextStyle::BlockQuote => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::ITALIC),
        TextStyle::ListBullet | TextStyle::ListNumber => Style::default().fg(Color::Yellow),
        TextStyle::Math => Style::default().fg(Color::LightBlue),
        TextStyle::MathBlock => Style::default()
            .fg(Color::LightBlue)
            .add_modifier(Modifier::BOLD),
    }
}

#[cfg(test)]
mod tests {
    use ponts_core::core::events::ChatEvent;
    use ponts_core::core::session::ChatSession;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;

    fn text_of(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn state_with_answer(answer: &str, finish: bool) -> AppState {
        let mut session = ChatSession::new("sys");
        let request = session.submit("hello").unwrap();
        session.apply(ChatEvent::token(request.id, answer));
        if finish {
            session.apply(ChatEvent::finished(request.id));
        }
        AppState::new(session, "test-model")
    }

    #[test]
    fn test_empty_transcript_shows_hint() {
        let state = AppState::new(ChatSession::new(""), "m");
        assert!(text_of(&transcript_lines(&state, 80)).starts_with("Ask anything"));
    }

    #[test]
    fn test_reasoning_hidden_until_revealed() {
        let mut state = state_with_answer("<think>secret plan</think>Hi there", true);
        let text = text_of(&transcript_lines(&state, 80));
        assert!(text.contains("│ hello"));
        assert!(text.contains("▸ Show reasoning"));
        assert!(text.contains("Hi there"));
        assert!(!text.contains("secret plan"));

        let turn = state.assistant_turns().last().unwrap();
        state.reveal.toggle(turn);
        let text = text_of(&transcript_lines(&state, 80));
        assert!(text.contains("▾ Hide reasoning"));
        assert!(text.contains("secret plan"));
    }

    #[test]
    fn test_streaming_turn_shows_indicator_and_thinking_label() {
        let state = state_with_answer("<think>pondering", false);
        let text = text_of(&transcript_lines(&state, 80));
        assert!(text.contains("Thinking…"));
        assert!(text.contains(SPINNER_FRAMES[0]));
    }

    #[test]
    fn test_cancelled_turn_is_marked() {
        let mut state = state_with_answer("Par", false);
        state.session.cancel();
        let text = text_of(&transcript_lines(&state, 80));
        assert!(text.contains("Par"));
        assert!(text.contains("[stopped]"));
    }

    #[test]
    fn test_focused_turn_has_gutter_bar() {
        let mut state = state_with_answer("Answer", true);
        state.focus = state.assistant_turns().last();
        let text = text_of(&transcript_lines(&state, 80));
        assert!(text.contains("┃ Answer"));
    }

    #[test]
    fn test_full_frame_renders() {
        let state = state_with_answer("Hi there", true);
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let mut metrics = None;
        terminal
            .draw(|frame| metrics = Some(render(&state, frame)))
            .unwrap();
        let metrics = metrics.unwrap();
        assert_eq!(metrics.viewport, 12 - 1 - 3 - 1);
        assert!(metrics.total_lines >= 3);

        let buffer = terminal.backend().buffer();
        let screen: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(screen.contains("Ponts"));
        assert!(screen.contains("Hi there"));
    }
}
