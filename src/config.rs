use std::env;
use std::str::FromStr;
use std::time::Duration;

use glam::Vec3;
use tracing::warn;

use crate::error::ConfigError;

/// Rates of the two periodic signals.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Simulation tick frequency in Hz
    pub sim_hz: u32,
    /// Input sampling frequency in Hz
    pub input_hz: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { sim_hz: 256, input_hz: 1000 }
    }
}

/// Tunables of the integration step.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Vertical acceleration in units/s²
    pub gravity: f32,
    /// Scales velocity into displacement
    pub movement_speed: f32,
    /// Scales angular velocity into rotation
    pub rotation_speed: f32,
    /// Fraction of vertical speed kept after a floor impact
    pub bounce: f32,
    /// Per-tick multiplier on horizontal velocity
    pub damping: f32,
    /// Speeds below this snap to zero
    pub rest_threshold: f32,
    /// Tolerance for the grounded test
    pub ground_epsilon: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -1.96,
            movement_speed: 1.0,
            rotation_speed: 1.0,
            bounce: 0.3,
            damping: 0.95,
            rest_threshold: 0.01,
            ground_epsilon: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Radians per unit of look input
    pub sensitivity: f32,
    pub pitch_limit_deg: f32,
    pub zoom_speed: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Eye offset from the followed entity
    pub follow_offset: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            pitch_limit_deg: 89.0,
            zoom_speed: 0.1,
            zoom_min: 0.1,
            zoom_max: 10.0,
            follow_offset: Vec3::new(0.0, 1.6, 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub walk_speed: f32,
    pub jump_force: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { walk_speed: 3.0, jump_force: 2.5 }
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub frame_hz: u32,
    /// Upper bound on a single snapshot request
    pub snapshot_timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { frame_hz: 60, snapshot_timeout: Duration::from_millis(10) }
    }
}

/// Layout of the demo scene.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Cubes per side of the grid
    pub grid: u32,
    pub spacing: f32,
    pub drop_height: f32,
    /// Spawn the controllable player and its camera
    pub with_player: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self { grid: 10, spacing: 2.0, drop_height: 5.0, with_player: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    pub scheduler: SchedulerConfig,
    pub physics: PhysicsConfig,
    pub camera: CameraConfig,
    pub player: PlayerConfig,
    pub render: RenderConfig,
    pub sandbox: SandboxConfig,
}

impl SimConfig {
    /// Defaults overlaid with any `OTTO_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("OTTO_SIM_HZ", &mut config.scheduler.sim_hz);
        override_from_env("OTTO_INPUT_HZ", &mut config.scheduler.input_hz);
        override_from_env("OTTO_GRAVITY", &mut config.physics.gravity);
        override_from_env("OTTO_BOUNCE", &mut config.physics.bounce);
        override_from_env("OTTO_DAMPING", &mut config.physics.damping);
        override_from_env("OTTO_FRAME_HZ", &mut config.render.frame_hz);
        override_from_env("OTTO_GRID", &mut config.sandbox.grid);

        let mut timeout_ms = config.render.snapshot_timeout.as_millis() as u64;
        override_from_env("OTTO_SNAPSHOT_TIMEOUT_MS", &mut timeout_ms);
        config.render.snapshot_timeout = Duration::from_millis(timeout_ms);
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.sim_hz == 0 {
            return Err(ConfigError::ZeroRate("scheduler.sim_hz"));
        }
        if self.scheduler.input_hz == 0 {
            return Err(ConfigError::ZeroRate("scheduler.input_hz"));
        }
        if self.render.frame_hz == 0 {
            return Err(ConfigError::ZeroRate("render.frame_hz"));
        }
        if self.render.snapshot_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        for (field, value) in [
            ("camera.zoom_min", self.camera.zoom_min),
            ("physics.movement_speed", self.physics.movement_speed),
            ("physics.rest_threshold", self.physics.rest_threshold),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }
}

fn override_from_env<T: FromStr>(key: &str, slot: &mut T) {
    let Ok(raw) = env::var(key) else { return };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = %raw, "ignoring unparsable config override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.sim_hz, 256);
        assert_eq!(config.scheduler.input_hz, 1000);
        assert_eq!(config.render.snapshot_timeout, Duration::from_millis(10));
    }

    #[test]
    fn rejects_zero_rates_and_timeouts() {
        let mut config = SimConfig::default();
        config.scheduler.input_hz = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroRate("scheduler.input_hz")));

        let mut config = SimConfig::default();
        config.render.snapshot_timeout = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn env_override_keeps_default_on_garbage() {
        let mut rate = 256u32;
        env::set_var("OTTO_TEST_RATE_GARBAGE", "fast");
        override_from_env("OTTO_TEST_RATE_GARBAGE", &mut rate);
        assert_eq!(rate, 256);

        env::set_var("OTTO_TEST_RATE_OK", " 120 ");
        override_from_env("OTTO_TEST_RATE_OK", &mut rate);
        assert_eq!(rate, 120);
    }
}
