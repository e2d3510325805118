//! Input contexts: stateful samplers that turn a raw [`InputSnapshot`] into a
//! domain signal (a movement vector, a look delta, a UI action).
//!
//! The set of contexts is closed. Each variant owns its last output and
//! decides, through its [`DispatchPolicy`], when the router should forward it.

use glam::{Vec2, Vec3};

use super::input::{InputSnapshot, Key, MouseButton};

/// When the router forwards a context to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// When the active flag flips, or the sampled value changes while active
    Edge,
    /// Every tick while active, plus the tick it goes inactive
    Level,
}

impl DispatchPolicy {
    /// Both policies end a burst of input with exactly one inactive event, whose output is zero.
    pub fn should_emit(self, was_active: bool, is_active: bool, changed: bool) -> bool {
        match self {
            DispatchPolicy::Edge => was_active != is_active || (is_active && changed),
            DispatchPolicy::Level => was_active || is_active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Movement,
    CameraLook,
    UiInteraction,
    GameActions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputContext {
    Movement(MovementInput),
    CameraLook(LookInput),
    UiInteraction(UiInput),
    GameActions(ActionInput),
}

impl InputContext {
    pub fn movement() -> Self {
        InputContext::Movement(MovementInput::default())
    }

    pub fn camera_look() -> Self {
        InputContext::CameraLook(LookInput::default())
    }

    pub fn ui_interaction() -> Self {
        InputContext::UiInteraction(UiInput::default())
    }

    pub fn game_actions() -> Self {
        InputContext::GameActions(ActionInput::default())
    }

    pub fn kind(&self) -> ContextKind {
        match self {
            InputContext::Movement(_) => ContextKind::Movement,
            InputContext::CameraLook(_) => ContextKind::CameraLook,
            InputContext::UiInteraction(_) => ContextKind::UiInteraction,
            InputContext::GameActions(_) => ContextKind::GameActions,
        }
    }

    pub fn policy(&self) -> DispatchPolicy {
        match self {
            InputContext::CameraLook(_) => DispatchPolicy::Level,
            _ => DispatchPolicy::Edge,
        }
    }

    /// Samples `snapshot` into this context's output and reports whether it carries input.
    ///
    /// Captured devices read as idle, so a context always falls back to zero output.
    pub fn process(
        &mut self,
        delta_time: f32,
        snapshot: &InputSnapshot,
        capture_keyboard: bool,
        capture_mouse: bool,
    ) -> bool {
        match self {
            InputContext::Movement(ctx) => ctx.process(snapshot, capture_keyboard),
            InputContext::CameraLook(ctx) => ctx.process(delta_time, snapshot, capture_keyboard, capture_mouse),
            InputContext::UiInteraction(ctx) => ctx.process(snapshot, capture_keyboard, capture_mouse),
            InputContext::GameActions(ctx) => ctx.process(snapshot, capture_keyboard),
        }
    }
}

/// WASD movement in the owner's local frame: x = strafe right, z = forward, y = jump.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementInput {
    pub direction: Vec3,
}

impl MovementInput {
    fn process(&mut self, snapshot: &InputSnapshot, capture_keyboard: bool) -> bool {
        self.direction = Vec3::ZERO;
        if capture_keyboard {
            return false;
        }

        let axis = |positive: Key, negative: Key| {
            snapshot.is_key_pressed(positive) as i32 as f32 - snapshot.is_key_pressed(negative) as i32 as f32
        };
        // diagonals are no faster than straight lines
        let planar = Vec2::new(axis(Key::D, Key::A), axis(Key::W, Key::S)).normalize_or_zero();
        let jump = if snapshot.is_key_pressed(Key::Space) { 1.0 } else { 0.0 };

        self.direction = Vec3::new(planar.x, jump, planar.y);
        self.direction != Vec3::ZERO
    }
}

/// Camera look: right-drag or arrow keys rotate, wheel or +/- zoom.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LookInput {
    /// Pitch, yaw in raw input units, scaled by the camera's sensitivity
    pub rotation_delta: Vec2,
    pub zoom_delta: f32,
}

impl LookInput {
    /// Input units per second for a held arrow key
    pub const KEY_RATE: f32 = 400.0;

    fn process(
        &mut self,
        delta_time: f32,
        snapshot: &InputSnapshot,
        capture_keyboard: bool,
        capture_mouse: bool,
    ) -> bool {
        self.rotation_delta = Vec2::ZERO;
        self.zoom_delta = 0.0;

        if !capture_mouse {
            if snapshot.is_mouse_pressed(MouseButton::Right) {
                // screen y grows downwards
                self.rotation_delta += Vec2::new(-snapshot.mouse_delta.y, snapshot.mouse_delta.x);
            }
            self.zoom_delta += snapshot.mouse_wheel;
        }

        if !capture_keyboard {
            let held = |a: Key, b: Key| snapshot.is_key_pressed(a) || snapshot.is_key_pressed(b);
            let step = Self::KEY_RATE * delta_time.max(0.0);
            if held(Key::ArrowUp, Key::I) {
                self.rotation_delta.x += step;
            }
            if held(Key::ArrowDown, Key::K) {
                self.rotation_delta.x -= step;
            }
            if held(Key::ArrowRight, Key::L) {
                self.rotation_delta.y += step;
            }
            if held(Key::ArrowLeft, Key::J) {
                self.rotation_delta.y -= step;
            }
            if snapshot.is_key_pressed(Key::Equal) {
                self.zoom_delta += 1.0;
            }
            if snapshot.is_key_pressed(Key::Minus) {
                self.zoom_delta -= 1.0;
            }
        }

        self.rotation_delta != Vec2::ZERO || self.zoom_delta != 0.0
    }
}

/// Pointer clicks and menu keys for the UI overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UiInput {
    pub mouse_position: Vec2,
    pub clicked: bool,
    pub key: Option<Key>,
}

impl UiInput {
    fn process(&mut self, snapshot: &InputSnapshot, capture_keyboard: bool, capture_mouse: bool) -> bool {
        self.mouse_position = snapshot.mouse_position;
        self.clicked = !capture_mouse && snapshot.is_mouse_pressed(MouseButton::Left);
        self.key = if capture_keyboard {
            None
        } else {
            [Key::Escape, Key::Enter, Key::Tab]
                .into_iter()
                .find(|&key| snapshot.is_key_pressed(key))
        };
        self.clicked || self.key.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    Interact,
    Reload,
    Use,
    Drop,
}

impl GameAction {
    const BINDINGS: [(Key, GameAction); 4] = [
        (Key::F, GameAction::Interact),
        (Key::R, GameAction::Reload),
        (Key::E, GameAction::Use),
        (Key::Q, GameAction::Drop),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameAction::Interact => "interact",
            GameAction::Reload => "reload",
            GameAction::Use => "use",
            GameAction::Drop => "drop",
        }
    }
}

/// Discrete game actions. When several keys are held the first binding wins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActionInput {
    pub action: Option<GameAction>,
}

impl ActionInput {
    fn process(&mut self, snapshot: &InputSnapshot, capture_keyboard: bool) -> bool {
        self.action = if capture_keyboard {
            None
        } else {
            GameAction::BINDINGS
                .iter()
                .find(|(key, _)| snapshot.is_key_pressed(*key))
                .map(|&(_, action)| action)
        };
        self.action.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const DT: f32 = 1.0 / 1000.0;

    /// Drives a context through `frames` the way the router does and collects what would be sent.
    fn dispatch(mut ctx: InputContext, frames: &[InputSnapshot]) -> Vec<(InputContext, bool)> {
        let mut was_active = false;
        let mut sent = Vec::new();
        for frame in frames {
            let before = ctx.clone();
            let is_active = ctx.process(DT, frame, frame.want_capture_keyboard, frame.want_capture_mouse);
            if ctx.policy().should_emit(was_active, is_active, ctx != before) {
                sent.push((ctx.clone(), is_active));
            }
            was_active = is_active;
        }
        sent
    }

    #[test]
    fn policies_over_every_activity_sequence() {
        // every true/false sequence up to length 6
        for len in 1..=6u32 {
            for bits in 0..(1u32 << len) {
                let seq: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();

                let mut was = false;
                let (mut edge, mut level) = (Vec::new(), Vec::new());
                for &is in &seq {
                    // constant output while active
                    if DispatchPolicy::Edge.should_emit(was, is, false) {
                        edge.push(is);
                    }
                    if DispatchPolicy::Level.should_emit(was, is, false) {
                        level.push(is);
                    }
                    was = is;
                }

                let flips = seq
                    .iter()
                    .scan(false, |prev, &is| {
                        let flipped = *prev != is;
                        *prev = is;
                        Some(flipped)
                    })
                    .filter(|&f| f)
                    .count();
                let active_ticks = seq.iter().filter(|&&a| a).count();
                let falling = seq.windows(2).filter(|w| w[0] && !w[1]).count();

                assert_eq!(edge.len(), flips, "edge {seq:?}");
                assert_eq!(level.len(), active_ticks + falling, "level {seq:?}");

                // edge events alternate, starting with an activation
                assert!(edge.iter().enumerate().all(|(i, &a)| a == (i % 2 == 0)), "edge {seq:?}");

                // once input has stopped, the last thing either policy sent is an inactive event
                if seq.last() == Some(&false) && active_ticks > 0 {
                    assert_eq!(edge.last(), Some(&false));
                    assert_eq!(level.last(), Some(&false));
                }
            }
        }
    }

    #[test]
    fn active_then_idle_emits_one_of_each_for_movement() {
        let walk = InputSnapshot::default().with_keys([Key::W]);
        let idle = InputSnapshot::default();
        let sent = dispatch(InputContext::movement(), &[walk, idle.clone(), idle]);

        assert_eq!(sent.len(), 2);
        assert!(sent[0].1);
        assert!(!sent[1].1);
        assert_eq!(sent[1].0, InputContext::movement());
    }

    #[test]
    fn held_movement_reports_direction_changes() {
        let forward = InputSnapshot::default().with_keys([Key::W]);
        let diagonal = InputSnapshot::default().with_keys([Key::W, Key::D]);
        let sent = dispatch(
            InputContext::movement(),
            &[forward.clone(), forward, diagonal.clone(), diagonal, InputSnapshot::default()],
        );

        let active: Vec<bool> = sent.iter().map(|(_, active)| *active).collect();
        assert_eq!(active, vec![true, true, false]);
    }

    #[test]
    fn active_then_idle_emits_trailing_zero_for_look() {
        let drag = InputSnapshot::default()
            .with_mouse_buttons([MouseButton::Right])
            .with_mouse_delta(Vec2::new(3.0, -2.0));
        let idle = InputSnapshot::default();
        let sent = dispatch(
            InputContext::camera_look(),
            &[drag.clone(), drag, idle.clone(), idle.clone(), idle],
        );

        assert_eq!(sent.len(), 3);
        assert!(sent[0].1 && sent[1].1);
        match &sent[0].0 {
            InputContext::CameraLook(look) => assert_eq!(look.rotation_delta, Vec2::new(2.0, 3.0)),
            other => panic!("unexpected context {other:?}"),
        }
        assert!(!sent[2].1);
        assert_eq!(sent[2].0, InputContext::camera_look());
    }

    #[test]
    fn movement_is_normalized_and_keeps_jump_separate() {
        let mut ctx = MovementInput::default();
        let snap = InputSnapshot::default().with_keys([Key::W, Key::D, Key::Space]);
        assert!(ctx.process(&snap, false));
        assert_abs_diff_eq!(ctx.direction.x, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_abs_diff_eq!(ctx.direction.z, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_eq!(ctx.direction.y, 1.0);

        // opposite keys cancel out
        let snap = InputSnapshot::default().with_keys([Key::A, Key::D]);
        assert!(!ctx.process(&snap, false));
    }

    #[test]
    fn captured_devices_read_as_idle() {
        let snap = InputSnapshot::default()
            .with_keys([Key::W, Key::F, Key::Equal])
            .with_mouse_buttons([MouseButton::Right, MouseButton::Left])
            .with_mouse_delta(Vec2::ONE);

        let mut movement = InputContext::movement();
        assert!(!movement.process(DT, &snap, true, false));
        assert_eq!(movement, InputContext::movement());

        let mut actions = InputContext::game_actions();
        assert!(!actions.process(DT, &snap, true, false));

        let mut look = InputContext::camera_look();
        assert!(!look.process(DT, &snap, true, true));
        // keyboard zoom survives a captured mouse
        assert!(look.process(DT, &snap, false, true));

        let mut ui = InputContext::ui_interaction();
        assert!(!ui.process(DT, &snap, true, true));
        assert!(ui.process(DT, &snap, true, false));
    }

    #[test]
    fn first_bound_action_wins() {
        let mut ctx = ActionInput::default();
        let snap = InputSnapshot::default().with_keys([Key::Q, Key::R]);
        assert!(ctx.process(&snap, false));
        assert_eq!(ctx.action, Some(GameAction::Reload));
        assert_eq!(GameAction::Reload.as_str(), "reload");
    }
}
