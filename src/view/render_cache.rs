use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use tracing::{debug, trace};

use crate::actor::{Actor, Address, Context};
use crate::error::SnapshotError;
use crate::model::{Camera, EntityHandle, RigidBody};

/// Point-in-time copy of everything the cache knows, sorted by handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entities: Vec<(EntityHandle, RigidBody)>,
    pub camera: Camera,
}

impl Snapshot {
    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> {
        self.entities.iter().map(|(_, body)| body)
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&RigidBody> {
        self.entities
            .binary_search_by_key(&handle, |(h, _)| *h)
            .ok()
            .map(|index| &self.entities[index].1)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

pub enum RenderMessage {
    Register(EntityHandle, RigidBody),
    UpdateTransform(EntityHandle, RigidBody),
    /// Everything the physics registry integrated during one tick
    UpsertBatch(Vec<(EntityHandle, RigidBody)>),
    Remove(EntityHandle),
    UpdateCamera(Camera),
    Snapshot(Sender<Snapshot>),
}

/// Passive last-write-wins store between the simulation and the render consumer.
#[derive(Default)]
pub struct RenderCache {
    entities: HashMap<EntityHandle, RigidBody>,
    camera: Camera,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Snapshot {
        let mut entities: Vec<_> = self.entities.iter().map(|(h, b)| (*h, b.clone())).collect();
        entities.sort_unstable_by_key(|(h, _)| *h);
        Snapshot { entities, camera: self.camera }
    }
}

impl Actor for RenderCache {
    type Message = RenderMessage;

    fn name(&self) -> &'static str {
        "render-cache"
    }

    fn handle(&mut self, msg: RenderMessage, _ctx: &Context<RenderMessage>) {
        match msg {
            RenderMessage::Register(handle, body) => {
                debug!(%handle, model = %body.model_name, "entity registered for rendering");
                self.entities.insert(handle, body);
            }
            RenderMessage::UpdateTransform(handle, body) => {
                self.entities.insert(handle, body);
            }
            RenderMessage::UpsertBatch(batch) => {
                trace!(len = batch.len(), "transform batch");
                self.entities.extend(batch);
            }
            RenderMessage::Remove(handle) => {
                if self.entities.remove(&handle).is_some() {
                    debug!(%handle, "entity removed from render cache");
                }
            }
            RenderMessage::UpdateCamera(camera) => self.camera = camera,
            RenderMessage::Snapshot(reply) => {
                // the requester may have given up already
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn stopped(&mut self) {
        debug!(entities = self.entities.len(), "render cache shutting down");
    }
}

/// Client-side view of the render cache.
#[derive(Clone, Debug)]
pub struct RenderCacheAddress(pub Address<RenderMessage>);

impl RenderCacheAddress {
    pub fn register(&self, handle: EntityHandle, body: RigidBody) {
        self.0.send(RenderMessage::Register(handle, body));
    }

    pub fn update_transform(&self, handle: EntityHandle, body: RigidBody) {
        self.0.send(RenderMessage::UpdateTransform(handle, body));
    }

    pub fn remove(&self, handle: EntityHandle) {
        self.0.send(RenderMessage::Remove(handle));
    }

    pub fn update_camera(&self, camera: Camera) {
        self.0.send(RenderMessage::UpdateCamera(camera));
    }

    /// Asks for a snapshot and waits at most `timeout` for it.
    pub fn request_snapshot(&self, timeout: Duration) -> Result<Snapshot, SnapshotError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        if !self.0.send(RenderMessage::Snapshot(tx)) {
            return Err(SnapshotError::Disconnected);
        }
        rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => SnapshotError::Timeout(timeout),
            RecvTimeoutError::Disconnected => SnapshotError::Disconnected,
        })
    }
}
