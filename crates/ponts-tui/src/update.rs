//! Reducer: `update(state, event) -> effects`.
//!
//! Mutates state only. Spawning and terminal I/O happen in the runtime.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;

pub fn update(state: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Terminal(Event::Key(key)) if key.kind != KeyEventKind::Release => {
            handle_key(state, key)
        }
        UiEvent::Terminal(Event::Paste(text)) => {
            state.input.insert_str(&text);
            vec![]
        }
        UiEvent::Terminal(_) => vec![],
        UiEvent::Chat(event) => {
            state.session.apply(event);
            vec![]
        }
        UiEvent::Tick => {
            if state.session.is_streaming() {
                state.spinner_frame = state.spinner_frame.wrapping_add(1);
            }
            vec![]
        }
    }
}

fn handle_key(state: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let newline_mods = KeyModifiers::SHIFT | KeyModifiers::ALT;

    match key.code {
        KeyCode::Char('c') if ctrl => {
            if state.session.cancel() {
                vec![]
            } else {
                quit(state)
            }
        }
        KeyCode::Char('d') if ctrl => quit(state),
        KeyCode::Char('r') if ctrl => {
            if let Some(turn) = state.toggle_target() {
                let revealed = state.reveal.toggle(turn);
                tracing::debug!(turn, revealed, "Toggled reasoning");
            }
            vec![]
        }
        KeyCode::Up if ctrl => {
            focus_previous(state);
            vec![]
        }
        KeyCode::Down if ctrl => {
            focus_next(state);
            vec![]
        }
        KeyCode::Esc => {
            state.session.cancel();
            vec![]
        }
        KeyCode::Enter if key.modifiers.intersects(newline_mods) => {
            state.input.insert_char('\n');
            vec![]
        }
        KeyCode::Enter => submit(state),
        KeyCode::PageUp => {
            let page = state.scroll.page();
            state.scroll.scroll_up(page);
            vec![]
        }
        KeyCode::PageDown => {
            let page = state.scroll.page();
            state.scroll.scroll_down(page);
            vec![]
        }
        KeyCode::Char(ch) if !ctrl => {
            state.input.insert_char(ch);
            vec![]
        }
        KeyCode::Backspace => {
            state.input.backspace();
            vec![]
        }
        KeyCode::Delete => {
            state.input.delete();
            vec![]
        }
        KeyCode::Left => {
            state.input.move_left();
            vec![]
        }
        KeyCode::Right => {
            state.input.move_right();
            vec![]
        }
        KeyCode::Home => {
            state.input.move_home();
            vec![]
        }
        KeyCode::End => {
            state.input.move_end();
            vec![]
        }
        _ => vec![],
    }
}

fn submit(state: &mut AppState) -> Vec<UiEffect> {
    let Some(request) = state.session.submit(state.input.text()) else {
        return vec![];
    };
    state.input.clear();
    state.focus = None;
    state.scroll.follow();
    vec![UiEffect::StartStream { request }]
}

fn quit(state: &mut AppState) -> Vec<UiEffect> {
    state.session.cancel();
    state.should_quit = true;
    vec![UiEffect::Quit]
}

fn focus_previous(state: &mut AppState) {
    let turns: Vec<_> = state.assistant_turns().collect();
    state.focus = match state.focus.and_then(|f| turns.iter().position(|&t| t == f)) {
        Some(0) => turns.first().copied(),
        Some(i) => Some(turns[i - 1]),
        None => turns.last().copied(),
    };
}

fn focus_next(state: &mut AppState) {
    let turns: Vec<_> = state.assistant_turns().collect();
    state.focus = state
        .focus
        .and_then(|f| turns.iter().position(|&t| t == f))
        .and_then(|i| turns.get(i + 1).copied());
}
