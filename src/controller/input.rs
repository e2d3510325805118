/// Platform-agnostic input state and the providers that produce it
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use glam::Vec2;
use tracing::{debug, info};

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    LeftShift,
    Equal,
    Minus,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    I,
    J,
    K,
    L,
    E,
    F,
    Q,
    R,
    Escape,
    Enter,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// One sample of keyboard and mouse state.
///
/// `Default` is the no-op snapshot: nothing pressed, no motion, nothing captured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub keys: HashSet<Key>,
    pub mouse_buttons: HashSet<MouseButton>,
    pub mouse_position: Vec2,
    /// Motion since the previous sample
    pub mouse_delta: Vec2,
    pub mouse_wheel: f32,
    /// The UI overlay wants keyboard input for itself
    pub want_capture_keyboard: bool,
    pub want_capture_mouse: bool,
}

impl InputSnapshot {
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.keys.extend(keys);
        self
    }

    pub fn with_mouse_buttons(mut self, buttons: impl IntoIterator<Item = MouseButton>) -> Self {
        self.mouse_buttons.extend(buttons);
        self
    }

    pub fn with_mouse_delta(mut self, delta: Vec2) -> Self {
        self.mouse_delta = delta;
        self
    }

    pub fn with_mouse_wheel(mut self, wheel: f32) -> Self {
        self.mouse_wheel = wheel;
        self
    }
}

/// Source of platform input, polled once per input tick.
pub trait InputProvider: Send + 'static {
    /// Pulls fresh state from the platform.
    fn update(&mut self) -> Result<(), InputError>;

    /// Latest state. Must hand back a no-op snapshot rather than fail when the platform is gone.
    fn snapshot(&self) -> InputSnapshot;
}

/// Provider for headless runs: nothing is ever pressed.
#[derive(Debug, Default)]
pub struct NullInputProvider;

impl InputProvider for NullInputProvider {
    fn update(&mut self) -> Result<(), InputError> {
        Ok(())
    }

    fn snapshot(&self) -> InputSnapshot {
        InputSnapshot::default()
    }
}

/// Provider fed by a frontend thread through [`InputFeed`] handles.
///
/// Once every feed is dropped it keeps sampling no-op snapshots, so held input
/// is released rather than frozen.
pub struct SharedInputProvider {
    shared: Weak<Mutex<InputSnapshot>>,
    current: InputSnapshot,
    detached: bool,
}

/// Writing half of a [`SharedInputProvider`].
///
/// Motion and wheel deltas accumulate until the provider samples them.
#[derive(Clone)]
pub struct InputFeed {
    shared: Arc<Mutex<InputSnapshot>>,
}

impl SharedInputProvider {
    pub fn new() -> (Self, InputFeed) {
        let shared = Arc::new(Mutex::new(InputSnapshot::default()));
        let provider = Self { shared: Arc::downgrade(&shared), current: InputSnapshot::default(), detached: false };
        (provider, InputFeed { shared })
    }
}

impl InputProvider for SharedInputProvider {
    fn update(&mut self) -> Result<(), InputError> {
        let Some(shared) = self.shared.upgrade() else {
            if !self.detached {
                info!("input frontend detached, sampling idle input from now on");
                self.detached = true;
            }
            self.current = InputSnapshot::default();
            return Ok(());
        };
        let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
        self.current = state.clone();
        state.mouse_delta = Vec2::ZERO;
        state.mouse_wheel = 0.0;
        Ok(())
    }

    fn snapshot(&self) -> InputSnapshot {
        self.current.clone()
    }
}

impl InputFeed {
    fn with_state(&self, f: impl FnOnce(&mut InputSnapshot)) {
        let mut state = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    pub fn key(&self, key: Key, down: bool) {
        self.with_state(|s| {
            if down {
                s.keys.insert(key);
            } else {
                s.keys.remove(&key);
            }
        });
    }

    pub fn mouse_button(&self, button: MouseButton, down: bool) {
        self.with_state(|s| {
            if down {
                s.mouse_buttons.insert(button);
            } else {
                s.mouse_buttons.remove(&button);
            }
        });
    }

    pub fn mouse_moved(&self, position: Vec2, delta: Vec2) {
        self.with_state(|s| {
            s.mouse_position = position;
            s.mouse_delta += delta;
        });
    }

    pub fn wheel(&self, delta: f32) {
        self.with_state(|s| s.mouse_wheel += delta);
    }

    pub fn capture(&self, keyboard: bool, mouse: bool) {
        self.with_state(|s| {
            s.want_capture_keyboard = keyboard;
            s.want_capture_mouse = mouse;
        });
    }

    /// Releases everything, e.g. when the window loses focus.
    pub fn clear(&self) {
        self.with_state(|s| {
            s.keys.clear();
            s.mouse_buttons.clear();
        });
    }
}

/// Replays a fixed sequence of snapshots, one per update.
pub struct ScriptedInputProvider {
    frames: VecDeque<InputSnapshot>,
    current: InputSnapshot,
    strict: bool,
}

impl ScriptedInputProvider {
    /// Once the script runs out the provider keeps returning no-op snapshots.
    pub fn new() -> Self {
        Self { frames: VecDeque::new(), current: InputSnapshot::default(), strict: false }
    }

    /// Once the script runs out every update fails.
    pub fn strict() -> Self {
        Self { strict: true, ..Self::new() }
    }

    pub fn push(mut self, frame: InputSnapshot) -> Self {
        self.frames.push_back(frame);
        self
    }

    /// Repeats `frame` for `count` updates.
    pub fn hold(mut self, frame: InputSnapshot, count: usize) -> Self {
        self.frames.extend(std::iter::repeat(frame).take(count));
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Default for ScriptedInputProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InputProvider for ScriptedInputProvider {
    fn update(&mut self) -> Result<(), InputError> {
        match self.frames.pop_front() {
            Some(frame) => {
                self.current = frame;
                Ok(())
            }
            None if self.strict => {
                self.current = InputSnapshot::default();
                Err(InputError::Unavailable("input script exhausted".into()))
            }
            None => {
                if self.current != InputSnapshot::default() {
                    debug!("input script finished");
                }
                self.current = InputSnapshot::default();
                Ok(())
            }
        }
    }

    fn snapshot(&self) -> InputSnapshot {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_provider_consumes_deltas() {
        let (mut provider, feed) = SharedInputProvider::new();
        feed.key(Key::W, true);
        feed.mouse_moved(Vec2::new(10.0, 10.0), Vec2::new(2.0, 1.0));
        feed.mouse_moved(Vec2::new(12.0, 11.0), Vec2::new(2.0, 1.0));
        feed.wheel(1.5);

        provider.update().unwrap();
        let snap = provider.snapshot();
        assert!(snap.is_key_pressed(Key::W));
        assert_eq!(snap.mouse_delta, Vec2::new(4.0, 2.0));
        assert_eq!(snap.mouse_wheel, 1.5);

        provider.update().unwrap();
        let snap = provider.snapshot();
        assert!(snap.is_key_pressed(Key::W));
        assert_eq!(snap.mouse_delta, Vec2::ZERO);
        assert_eq!(snap.mouse_wheel, 0.0);
    }

    #[test]
    fn detached_provider_returns_noop_snapshot() {
        let (mut provider, feed) = SharedInputProvider::new();
        feed.key(Key::Space, true);
        provider.update().unwrap();
        drop(feed);

        for _ in 0..3 {
            assert_eq!(provider.update(), Ok(()));
            assert_eq!(provider.snapshot(), InputSnapshot::default());
        }
        assert!(provider.detached);
    }

    #[test]
    fn scripted_provider_replays_then_idles() {
        let walk = InputSnapshot::default().with_keys([Key::W]);
        let mut lenient = ScriptedInputProvider::new().hold(walk.clone(), 2);
        for _ in 0..2 {
            lenient.update().unwrap();
            assert_eq!(lenient.snapshot(), walk);
        }
        lenient.update().unwrap();
        assert_eq!(lenient.snapshot(), InputSnapshot::default());

        let mut strict = ScriptedInputProvider::strict().push(walk);
        strict.update().unwrap();
        assert!(strict.update().is_err());
    }
}
