// Re-export all public modules so they can be used from main.rs
pub mod actor;
pub mod config;
pub mod error;
pub mod logging;
pub mod scene;
pub mod utils;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

pub use config::SimConfig;
pub use error::{ConfigError, InputError, RegistrationError, SandboxError, SnapshotError, SpawnError};
pub use scene::Sandbox;
