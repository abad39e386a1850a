//! Inputs to the reducer.

use ponts_core::core::events::ChatEvent;

#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Key press, paste or resize from crossterm.
    Terminal(crossterm::event::Event),
    /// Output of the stream driver.
    Chat(ChatEvent),
    /// Animation cadence; advances the typing indicator.
    Tick,
}
