use std::collections::BTreeMap;

use glam::{EulerRot, Mat4, Quat};
use tracing::trace;

use super::render_cache::Snapshot;
use crate::model::{Camera, RigidBody};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera, aspect: f32) -> Self {
        Self { view_proj: camera.view_proj(aspect).to_cols_array_2d() }
    }
}

/// Per-instance model matrix, laid out for a vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    pub fn from_body(body: &RigidBody) -> Self {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            body.rotation.x.to_radians(),
            body.rotation.y.to_radians(),
            body.rotation.z.to_radians(),
        );
        let model = Mat4::from_scale_rotation_translation(body.scale, rotation, body.position);
        Self { model: model.to_cols_array_2d() }
    }
}

/// All instances sharing one model.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub model: String,
    pub instances: Vec<InstanceRaw>,
}

impl DrawBatch {
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Everything needed to draw one frame, in model order.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub batches: Vec<DrawBatch>,
    pub camera: CameraUniform,
}

impl FramePlan {
    pub fn instance_count(&self) -> usize {
        self.batches.iter().map(|b| b.instances.len()).sum()
    }
}

/// Turns cache snapshots into batched draw data.
#[derive(Debug, Clone)]
pub struct RenderFrontend {
    aspect: f32,
}

impl RenderFrontend {
    pub fn new(width: u32, height: u32) -> Self {
        let mut frontend = Self { aspect: 1.0 };
        frontend.resize(width, height);
        frontend
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn prepare(&self, snapshot: &Snapshot) -> FramePlan {
        let mut groups: BTreeMap<&str, Vec<InstanceRaw>> = BTreeMap::new();
        for body in snapshot.bodies().filter(|body| body.is_rendered()) {
            groups.entry(body.model_name.as_str()).or_default().push(InstanceRaw::from_body(body));
        }
        let batches: Vec<DrawBatch> = groups
            .into_iter()
            .map(|(model, instances)| DrawBatch { model: model.to_string(), instances })
            .collect();
        trace!(batches = batches.len(), entities = snapshot.entities.len(), "frame prepared");

        FramePlan { batches, camera: CameraUniform::from_camera(&snapshot.camera, self.aspect) }
    }
}

/// Whatever ends up consuming a prepared frame (a GPU backend, a recorder, a counter).
pub trait DrawSink {
    fn submit(&mut self, plan: &FramePlan);
}

/// Headless sink that only counts what it was asked to draw.
#[derive(Debug, Default, Clone)]
pub struct StatsSink {
    pub frames: u64,
    pub batches: u64,
    pub instances: u64,
    pub last_instances: usize,
}

impl DrawSink for StatsSink {
    fn submit(&mut self, plan: &FramePlan) {
        self.frames += 1;
        self.batches += plan.batches.len() as u64;
        self.last_instances = plan.instance_count();
        self.instances += self.last_instances as u64;
    }
}
