// VIEW: Render-state cache and the headless render frontend
pub mod render;
pub mod render_cache;

pub use render::{CameraUniform, DrawBatch, DrawSink, FramePlan, InstanceRaw, RenderFrontend, StatsSink};
pub use render_cache::{RenderCache, RenderCacheAddress, RenderMessage, Snapshot};
