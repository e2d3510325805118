// CONTROLLER: Running components, input sampling and the update loops
pub mod camera_controller;
pub mod frame_loop;
pub mod input;
pub mod input_context;
pub mod input_router;
pub mod physics;
pub mod player;
pub mod scheduler;

pub use camera_controller::{CameraAddress, CameraController, CameraEvent, CameraMessage};
pub use frame_loop::{FrameLoop, FrameOutcome, FrameStats};
pub use input::{InputFeed, InputProvider, InputSnapshot, Key, MouseButton, NullInputProvider, ScriptedInputProvider, SharedInputProvider};
pub use input_context::{ContextKind, DispatchPolicy, GameAction, InputContext};
pub use input_router::{InputEvent, InputRouter, RouterAddress, RouterMessage};
pub use physics::{BodyEvent, PhysicsActor, PhysicsAddress, PhysicsMessage, PhysicsWorld};
pub use player::{Player, PlayerLinks, PlayerMessage};
pub use scheduler::{Scheduler, Tick};
