use std::fmt;

use glam::Vec3;

use crate::error::RegistrationError;
use crate::model::EntityHandle;

/// Entity type tag. Drives the per-kind rules of the integration step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum EntityKind {
    Player,
    Floor,
    #[default]
    Cube,
    Other(String),
}

impl EntityKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Floor => "floor",
            EntityKind::Cube => "cube",
            EntityKind::Other(tag) => tag,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, EntityKind::Player)
    }
}

impl From<&str> for EntityKind {
    fn from(tag: &str) -> Self {
        match tag {
            "player" => EntityKind::Player,
            "floor" => EntityKind::Floor,
            "cube" => EntityKind::Cube,
            other => EntityKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinematic state of one entity, owned by the physics registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub scale: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
    pub angular_velocity: Vec3,
    /// Empty means the entity is not drawn
    pub model_name: String,
    pub kind: EntityKind,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            model_name: String::new(),
            kind: EntityKind::default(),
        }
    }
}

impl RigidBody {
    pub fn new(kind: EntityKind, position: Vec3) -> Self {
        Self { kind, position, ..Default::default() }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn is_rendered(&self) -> bool {
        !self.model_name.is_empty()
    }

    /// Height of the lowest point above the floor plane.
    pub fn bottom(&self) -> f32 {
        self.position.y - self.scale.y / 2.0
    }

    /// Boundary check applied before a body is accepted anywhere.
    pub fn validate(&self, handle: EntityHandle) -> Result<(), RegistrationError> {
        // NaN fails the comparison too
        let positive = self.scale.x > 0.0 && self.scale.y > 0.0 && self.scale.z > 0.0;
        if positive {
            Ok(())
        } else {
            Err(RegistrationError::NonPositiveScale { handle, scale: self.scale })
        }
    }
}
