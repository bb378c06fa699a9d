use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

/// What woke the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Key(KeyEvent),
    /// Nothing arrived before the timeout; redraw so background updates show.
    Tick,
}

/// Wait up to `timeout` for a key press. Releases, repeats, mouse and
/// resize events are swallowed; ratatui picks up the new size on draw.
pub fn next_input(timeout: Duration) -> color_eyre::Result<Input> {
    if !event::poll(timeout)? {
        return Ok(Input::Tick);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Input::Key(key)),
        _ => Ok(Input::Tick),
    }
}
