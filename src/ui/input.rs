/// Input state tracker.
///
/// Tracks which keys are currently held down and turns the combined
/// keyboard + gamepad held state into press/release intent edges:
///   - Directions are level-sensitive in the simulation, so only their
///     edges are sent; the simulation remembers what is held.
///   - Fire and Restart act on release, so their release edge matters.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, poll};

use crate::domain::entity::{InputIntent, IntentKind};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Every intent kind, in the order edges are emitted.
pub const INTENT_KINDS: [IntentKind; 6] = [
    IntentKind::Up,
    IntentKind::Down,
    IntentKind::Left,
    IntentKind::Right,
    IntentKind::Fire,
    IntentKind::Restart,
];

/// Keys bound to an intent.
pub fn keys_for(kind: IntentKind) -> &'static [KeyCode] {
    match kind {
        IntentKind::Up => &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')],
        IntentKind::Down => &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')],
        IntentKind::Left => &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')],
        IntentKind::Right => &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')],
        IntentKind::Fire => &[
            KeyCode::Char(' '),
            KeyCode::Char('z'),
            KeyCode::Char('Z'),
            KeyCode::Char('x'),
            KeyCode::Char('X'),
        ],
        IntentKind::Restart => &[KeyCode::Char('r'), KeyCode::Char('R')],
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before simulation tick.
    pub fn drain_events(&mut self) {
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);

                match key.kind {
                    KeyEventKind::Release if self.honor_release => {
                        self.last_active.remove(&key.code);
                    }
                    KeyEventKind::Release => {
                        // Enhancement not confirmed; rely on timeout expiry
                    }
                    _ => {
                        self.last_active.insert(key.code, Instant::now());
                    }
                }
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    /// Is any key bound to `kind` held?
    pub fn intent_held(&self, kind: IntentKind) -> bool {
        keys_for(kind).iter().any(|&c| self.is_held(c))
    }

    /// Esc, Q or Ctrl+C this frame.
    pub fn quit_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            if k.kind == KeyEventKind::Release {
                return false;
            }
            let ctrl_c = k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'));
            ctrl_c || matches!(k.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q'))
        })
    }
}

/// Turns per-frame held state into press/release edges.
#[derive(Default)]
pub struct IntentTracker {
    held: [bool; 6],
}

impl IntentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `is_held` against last frame and emit one intent per change.
    pub fn edges(&mut self, is_held: impl Fn(IntentKind) -> bool) -> Vec<InputIntent> {
        let mut out = vec![];
        for (i, &kind) in INTENT_KINDS.iter().enumerate() {
            let now = is_held(kind);
            if now != self.held[i] {
                self.held[i] = now;
                out.push(InputIntent { kind, pressed: now });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_only_on_change() {
        let mut t = IntentTracker::new();
        assert!(t.edges(|_| false).is_empty());
        let e = t.edges(|k| k == IntentKind::Left);
        assert_eq!(e, vec![InputIntent::press(IntentKind::Left)]);
        assert!(t.edges(|k| k == IntentKind::Left).is_empty());
        let e = t.edges(|k| k == IntentKind::Fire);
        assert_eq!(e, vec![
            InputIntent::release(IntentKind::Left),
            InputIntent::press(IntentKind::Fire),
        ]);
        let e = t.edges(|_| false);
        assert_eq!(e, vec![InputIntent::release(IntentKind::Fire)]);
    }

    #[test]
    fn every_intent_has_keys() {
        for kind in INTENT_KINDS {
            assert!(!keys_for(kind).is_empty());
        }
        assert!(keys_for(IntentKind::Fire).contains(&KeyCode::Char(' ')));
    }

    #[test]
    fn held_keys_map_to_intents() {
        let mut input = InputState::new();
        input.last_active.insert(KeyCode::Char('d'), Instant::now());
        assert!(input.intent_held(IntentKind::Right));
        assert!(!input.intent_held(IntentKind::Left));
    }
}
