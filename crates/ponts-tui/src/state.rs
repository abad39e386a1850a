//! TUI application state.

use ponts_core::core::session::{ChatSession, TurnId};
use ponts_core::providers::Role;
use ponts_core::render::RevealState;

use crate::input::TextInput;

/// Transcript viewport position.
///
/// `top == None` means the view follows the bottom, so streamed text stays
/// visible. Scrolling up pins an absolute line; scrolling back to the end
/// resumes following.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollState {
    top: Option<usize>,
    total_lines: usize,
    viewport: usize,
}

impl ScrollState {
    pub fn is_following(&self) -> bool {
        self.top.is_none()
    }

    fn max_top(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport)
    }

    /// First visible line.
    pub fn top(&self) -> usize {
        self.top.unwrap_or(usize::MAX).min(self.max_top())
    }

    pub fn viewport(&self) -> usize {
        self.viewport
    }

    pub fn page(&self) -> usize {
        self.viewport.saturating_sub(1).max(1)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.top = Some(self.top().saturating_sub(lines));
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let target = self.top().saturating_add(lines);
        self.top = (target < self.max_top()).then_some(target);
    }

    pub fn follow(&mut self) {
        self.top = None;
    }

    /// Records the layout of the last drawn frame.
    pub fn set_metrics(&mut self, total_lines: usize, viewport: usize) {
        self.total_lines = total_lines;
        self.viewport = viewport;
        if self.top.is_some_and(|top| top >= self.max_top()) {
            self.top = None;
        }
    }
}

#[derive(Debug)]
pub struct AppState {
    pub session: ChatSession,
    pub model: String,
    pub input: TextInput,
    pub reveal: RevealState,
    /// Assistant turn targeted by Ctrl+R; `None` targets the latest one.
    pub focus: Option<TurnId>,
    pub scroll: ScrollState,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(session: ChatSession, model: impl Into<String>) -> Self {
        Self {
            session,
            model: model.into(),
            input: TextInput::new(),
            reveal: RevealState::new(),
            focus: None,
            scroll: ScrollState::default(),
            spinner_frame: 0,
            should_quit: false,
        }
    }

    pub fn assistant_turns(&self) -> impl DoubleEndedIterator<Item = TurnId> + '_ {
        self.session
            .turns()
            .iter()
            .filter(|t| t.speaker == Role::Assistant)
            .map(|t| t.id)
    }

    /// Turn whose reasoning Ctrl+R toggles.
    pub fn toggle_target(&self) -> Option<TurnId> {
        self.focus.or_else(|| self.assistant_turns().next_back())
    }
}
