/// Keyboard state tracker.
///
/// Turns crossterm key events into the per-tick `FrameInput`:
///   - directions are HELD state (continuous movement, diagonals allowed)
///   - restart is EDGE-triggered (fires once per physical press)
///
/// When the renderer enabled keyboard enhancement, Release events end a hold
/// and keys stay held between repeats. Otherwise holds expire after
/// `HOLD_TIMEOUT` without a Press/Repeat event.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::FrameInput;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key bindings ──

pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
pub const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1), KeyCode::Char('p'), KeyCode::Char('P')];
pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent drain.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.begin_frame();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }
        self.expire(Instant::now());
    }

    /// Snapshot for the simulation.
    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            left: self.any_held(KEYS_LEFT),
            right: self.any_held(KEYS_RIGHT),
            up: self.any_held(KEYS_UP),
            down: self.any_held(KEYS_DOWN),
            restart: self.any_pressed(KEYS_RESTART),
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.held_at(code, Instant::now())
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    pub fn quit_pressed(&self) -> bool {
        self.ctrl_c_pressed() || self.any_pressed(KEYS_QUIT)
    }

    pub fn pause_pressed(&self) -> bool {
        self.any_pressed(KEYS_PAUSE)
    }

    // ── Internal ──

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Unreliable without enhancement; expiry handles it
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        if self.honor_release {
            return;
        }
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map(|t| self.honor_release || now.saturating_duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    fn press(input: &mut InputState, code: KeyCode) {
        input.record(key(code, KeyEventKind::Press), Instant::now());
    }

    #[test]
    fn held_directions_map_to_frame_input() {
        let mut input = InputState::new();
        input.begin_frame();
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Char('s'));
        let frame = input.frame_input();
        assert!(frame.left && frame.down);
        assert!(!frame.right && !frame.up && !frame.restart);
    }

    #[test]
    fn restart_fires_only_on_first_press() {
        let mut input = InputState::new();
        input.begin_frame();
        press(&mut input, KeyCode::Char('r'));
        assert!(input.frame_input().restart);

        // Key repeat while still held: no new edge
        input.begin_frame();
        input.record(key(KeyCode::Char('r'), KeyEventKind::Repeat), Instant::now());
        assert!(!input.frame_input().restart);
    }

    #[test]
    fn release_is_honored_only_when_enabled() {
        let mut input = InputState::new();
        press(&mut input, KeyCode::Up);
        input.record(key(KeyCode::Up, KeyEventKind::Release), Instant::now());
        assert!(input.is_held(KeyCode::Up));

        input.honor_release = true;
        input.record(key(KeyCode::Up, KeyEventKind::Release), Instant::now());
        assert!(!input.is_held(KeyCode::Up));
    }

    #[test]
    fn enhanced_keys_stay_held_until_release() {
        let mut input = InputState::new();
        input.honor_release = true;
        let then = Instant::now();
        input.record(key(KeyCode::Left, KeyEventKind::Press), then);
        input.expire(then + HOLD_TIMEOUT * 4);
        assert!(input.held_at(KeyCode::Left, then + HOLD_TIMEOUT * 4));

        input.record(key(KeyCode::Left, KeyEventKind::Release), then + HOLD_TIMEOUT * 5);
        assert!(!input.is_held(KeyCode::Left));
    }

    #[test]
    fn keys_expire_without_repeat() {
        let mut input = InputState::new();
        let then = Instant::now();
        input.record(key(KeyCode::Right, KeyEventKind::Press), then);
        input.expire(then + HOLD_TIMEOUT);
        assert!(!input.is_held(KeyCode::Right));
    }

    #[test]
    fn meta_keys() {
        let mut input = InputState::new();
        input.begin_frame();
        input.record(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        assert!(input.quit_pressed());
        press(&mut input, KeyCode::F(1));
        assert!(input.pause_pressed());
    }
}
