// MODEL: Entity data, owned by whichever component holds it
pub mod camera;
pub mod handle;
pub mod rigid_body;

pub use camera::Camera;
pub use handle::{Arena, EntityHandle, HandleAllocator};
pub use rigid_body::{EntityKind, RigidBody};
