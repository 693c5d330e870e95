use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, error};

use crate::constants::ASCEND_HOLD_WINDOW_MS;

// --- KeyboardState: tracks the ascend key and quit requests between frames ---
pub struct KeyboardState {
    ascend_down: bool,
    last_ascend_event: Option<Instant>,
    reports_release: bool,
    quit_requested: bool,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardState {
    pub fn new() -> Self {
        KeyboardState {
            ascend_down: false,
            last_ascend_event: None,
            reports_release: false,
            quit_requested: false,
        }
    }

    /// Drains every pending terminal event without blocking.
    pub fn poll(&mut self) -> io::Result<()> {
        while event::poll(Duration::ZERO).map_err(|e| {
            error!("Failed to poll event: {}", e);
            e
        })? {
            let event = event::read().map_err(|e| {
                error!("Failed to read event: {}", e);
                e
            })?;
            self.handle_event(event, Instant::now());
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) {
        if let Event::Key(key_event) = event {
            self.handle_key(key_event, now);
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char(' ') => match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    self.ascend_down = true;
                    self.last_ascend_event = Some(now);
                }
                KeyEventKind::Release => {
                    if !self.reports_release {
                        debug!("Terminal reports key releases; hold window disabled.");
                    }
                    self.reports_release = true;
                    self.ascend_down = false;
                }
            },
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit_requested = true;
            }
            KeyCode::Char('q') | KeyCode::Esc if key.kind != KeyEventKind::Release => {
                self.quit_requested = true;
            }
            _ => {}
        }
    }

    /// Terminals without release events only send presses and auto-repeats, so
    /// the key counts as held until no event arrived for the hold window.
    pub fn is_ascend_down(&self, now: Instant) -> bool {
        if self.reports_release {
            return self.ascend_down;
        }
        match self.last_ascend_event {
            Some(at) => {
                self.ascend_down
                    && now.saturating_duration_since(at) < Duration::from_millis(ASCEND_HOLD_WINDOW_MS)
            }
            None => false,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

// --- SimulatedInput: scripted ascend state per frame for headless runs ---
#[cfg(test)]
pub struct SimulatedInput {
    held_frames: std::collections::HashSet<u64>,
    current_frame: u64,
}

#[cfg(test)]
impl SimulatedInput {
    pub fn new(held_frames: impl IntoIterator<Item = u64>) -> Self {
        SimulatedInput { held_frames: held_frames.into_iter().collect(), current_frame: 0 }
    }

    pub fn idle() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn advance(&mut self) {
        self.current_frame += 1;
    }

    pub fn is_ascend_down(&self) -> bool {
        self.held_frames.contains(&self.current_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind))
    }

    #[test]
    fn press_without_release_support_expires_after_hold_window() {
        let mut keyboard = KeyboardState::new();
        let start = Instant::now();
        keyboard.handle_event(key(KeyCode::Char(' '), KeyEventKind::Press), start);

        assert!(keyboard.is_ascend_down(start + Duration::from_millis(10)));
        assert!(!keyboard.is_ascend_down(start + Duration::from_millis(ASCEND_HOLD_WINDOW_MS + 1)));
    }

    #[test]
    fn press_survives_default_auto_repeat_delay() {
        let mut keyboard = KeyboardState::default();
        let start = Instant::now();
        keyboard.handle_event(key(KeyCode::Char(' '), KeyEventKind::Press), start);

        // X11 waits 660 ms before the first repeat.
        assert!(keyboard.is_ascend_down(start + Duration::from_millis(660)));
    }

    #[test]
    fn repeats_keep_the_key_held() {
        let mut keyboard = KeyboardState::new();
        let start = Instant::now();
        keyboard.handle_event(key(KeyCode::Char(' '), KeyEventKind::Press), start);
        let later = start + Duration::from_millis(ASCEND_HOLD_WINDOW_MS - 10);
        keyboard.handle_event(key(KeyCode::Char(' '), KeyEventKind::Repeat), later);

        assert!(keyboard.is_ascend_down(later + Duration::from_millis(20)));
    }

    #[test]
    fn release_event_switches_to_exact_tracking() {
        let mut keyboard = KeyboardState::new();
        let start = Instant::now();
        keyboard.handle_event(key(KeyCode::Char(' '), KeyEventKind::Press), start);
        keyboard.handle_event(key(KeyCode::Char(' '), KeyEventKind::Release), start);
        assert!(!keyboard.is_ascend_down(start));

        keyboard.handle_event(key(KeyCode::Char(' '), KeyEventKind::Press), start);
        assert!(keyboard.is_ascend_down(start + Duration::from_secs(10)));
    }

    #[test]
    fn quit_keys() {
        let mut keyboard = KeyboardState::new();
        keyboard.handle_event(key(KeyCode::Char('x'), KeyEventKind::Press), Instant::now());
        assert!(!keyboard.quit_requested());

        keyboard.handle_event(key(KeyCode::Esc, KeyEventKind::Press), Instant::now());
        assert!(keyboard.quit_requested());

        let mut keyboard = KeyboardState::new();
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        keyboard.handle_event(ctrl_c, Instant::now());
        assert!(keyboard.quit_requested());
    }

    #[test]
    fn simulated_input_follows_frame_script() {
        let mut input = SimulatedInput::new([2, 3]);
        input.advance();
        assert!(!input.is_ascend_down());
        input.advance();
        assert!(input.is_ascend_down());
        input.advance();
        assert!(input.is_ascend_down());
        input.advance();
        assert!(!input.is_ascend_down());
    }
}
