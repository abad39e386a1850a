//! TUI runtime: owns the terminal, collects events, runs the reducer and
//! executes its effects.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use ponts_core::core::engine::spawn_chat_stream;
use ponts_core::core::events::{ChatEvent, ChatEventRx, ChatEventTx, create_event_channel};
use ponts_core::core::interrupt;
use ponts_core::core::session::{ChatRequest, ChatSession};
use ponts_core::providers::{OllamaClient, ProviderError, ProviderErrorKind};

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::terminal::{self, TuiTerminal};
use crate::{render, update};

/// Frame cadence while a response streams.
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Poll timeout when idle.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

pub struct TuiRuntime {
    terminal: TuiTerminal,
    pub state: AppState,
    client: OllamaClient,
    chat_tx: ChatEventTx,
    chat_rx: ChatEventRx,
    last_tick: Instant,
}

impl TuiRuntime {
    pub fn new(client: OllamaClient, system_prompt: String) -> Result<Self> {
        terminal::install_panic_hook();
        interrupt::set_restore_hook(|| {
            let _ = terminal::restore_terminal();
        });

        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let state = AppState::new(ChatSession::new(system_prompt), client.model());
        let (chat_tx, chat_rx) = create_event_channel();

        Ok(Self {
            terminal,
            state,
            client,
            chat_tx,
            chat_rx,
            last_tick: Instant::now(),
        })
    }

    /// Runs until the user quits. Must be called inside a tokio runtime.
    pub fn run(&mut self) -> Result<()> {
        let mut dirty = true;
        while !self.state.should_quit {
            let events = self.collect_events()?;
            for event in events {
                dirty = true;
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                let state = &self.state;
                let mut metrics = None;
                self.terminal
                    .draw(|frame| metrics = Some(render::render(state, frame)))?;
                if let Some(m) = metrics {
                    self.state.scroll.set_metrics(m.total_lines, m.viewport);
                }
                dirty = false;
            }
        }
        Ok(())
    }

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        while let Ok(event) = self.chat_rx.try_recv() {
            events.push(UiEvent::Chat(event));
        }

        let tick_interval = if self.state.session.is_streaming() {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };
        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            match effect {
                UiEffect::StartStream { request } => self.start_stream(request),
                UiEffect::Quit => self.state.should_quit = true,
            }
        }
    }

    /// Spawns the stream driver. If the task dies without reporting, a
    /// failure event is sent on its behalf so the session leaves the
    /// streaming state.
    fn start_stream(&self, request: ChatRequest) {
        let id = request.id;
        let tx = self.chat_tx.clone();
        let handle = spawn_chat_stream(self.client.clone(), request, tx.clone());
        tokio::spawn(async move {
            if let Err(err) = handle.await {
                tracing::error!(request = id, error = %err, "Stream task ended abnormally");
                let error = ProviderError::new(
                    ProviderErrorKind::Network,
                    format!("stream task ended: {err}"),
                );
                let _ = tx.send(ChatEvent::failed(id, error));
            }
        });
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        self.state.session.cancel();
        let _ = terminal::restore_terminal();
    }
}
