use std::time::Duration;

use glam::Vec3;
use thiserror::Error;

use crate::model::EntityHandle;

/// Rejected registration. The only error kind surfaced past a component boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("entity {0} is already registered")]
    DuplicateHandle(EntityHandle),
    #[error("entity {handle} has non-positive scale {scale}")]
    NonPositiveScale { handle: EntityHandle, scale: Vec3 },
    #[error("entity {0} refers to a slot that has been reused")]
    StaleHandle(EntityHandle),
    #[error("entity {0} lies too far past the registry's last slot")]
    IndexOutOfRange(EntityHandle),
    #[error("physics registry did not confirm entity {0}")]
    Unconfirmed(EntityHandle),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("render cache did not answer within {0:?}")]
    Timeout(Duration),
    #[error("render cache is no longer running")]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("input provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to spawn actor thread `{name}`: {source}")]
    Thread {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroRate(&'static str),
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("snapshot timeout must be non-zero")]
    ZeroTimeout,
}

/// Anything that can stop the sandbox from coming up.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}
