use crossbeam_channel::Sender;
use glam::Vec3;
use tracing::{debug, trace, warn};

use crate::actor::{Actor, Address, Context, Recipient};
use crate::config::PhysicsConfig;
use crate::controller::scheduler::Tick;
use crate::error::RegistrationError;
use crate::model::{Arena, EntityHandle, RigidBody};
use crate::utils;
use crate::view::RenderMessage;

/// What the registry reports back to an entity's owner after each tick.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyEvent {
    Transform {
        handle: EntityHandle,
        position: Vec3,
        rotation: Vec3,
        velocity: Vec3,
    },
    /// Only emitted for players
    GroundState { handle: EntityHandle, on_ground: bool },
}

pub enum PhysicsMessage {
    Register {
        handle: EntityHandle,
        body: RigidBody,
        owner: Option<Recipient<BodyEvent>>,
        ack: Option<Sender<Result<(), RegistrationError>>>,
    },
    /// Full overwrite of both velocities
    UpdateVelocity {
        handle: EntityHandle,
        velocity: Vec3,
        angular_velocity: Vec3,
    },
    Unregister(EntityHandle),
    Tick(Tick),
    Count(Sender<usize>),
    Inspect(EntityHandle, Sender<Option<RigidBody>>),
}

impl From<Tick> for PhysicsMessage {
    fn from(tick: Tick) -> Self {
        PhysicsMessage::Tick(tick)
    }
}

/// Result of advancing one body by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Whether the floor clamp fired this tick
    pub clamped: bool,
    pub on_ground: bool,
}

/// Advances a single body by `delta_time`.
///
/// Touches nothing but `body`, so the result never depends on the order in
/// which bodies are visited.
pub fn integrate(body: &mut RigidBody, delta_time: f32, config: &PhysicsConfig) -> StepReport {
    let dt = delta_time.max(0.0);

    // Gravity
    body.velocity.y += config.gravity * dt;

    // Position
    body.position += body.velocity * config.movement_speed * dt;

    // Floor collision
    let half_height = body.scale.y / 2.0;
    let clamped = body.bottom() < 0.0;
    if clamped {
        body.position.y = half_height;
        if body.velocity.y < 0.0 {
            body.velocity.y = if body.kind.is_player() {
                0.0
            } else {
                -body.velocity.y * config.bounce
            };
        }
    }

    // Rotation
    body.rotation += body.angular_velocity * config.rotation_speed * dt;

    // Damping: horizontal only, the vertical component belongs to gravity and the floor
    if utils::horizontal_length(body.velocity) < config.rest_threshold {
        body.velocity.x = 0.0;
        body.velocity.z = 0.0;
    } else {
        body.velocity.x *= config.damping;
        body.velocity.z *= config.damping;
    }
    if body.angular_velocity.length() < config.rest_threshold {
        body.angular_velocity = Vec3::ZERO;
    }

    let on_ground = body.bottom() <= config.ground_epsilon && body.velocity.y <= config.ground_epsilon;
    StepReport { clamped, on_ground }
}

struct Entry {
    body: RigidBody,
    owner: Option<Recipient<BodyEvent>>,
}

/// Authoritative kinematic state per entity handle.
pub struct PhysicsWorld {
    entries: Arena<Entry>,
    config: PhysicsConfig,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self { entries: Arena::new(), config }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Inserts a body. Duplicate handles and non-positive scales are rejected and leave the registry untouched.
    pub fn register(
        &mut self,
        handle: EntityHandle,
        body: RigidBody,
        owner: Option<Recipient<BodyEvent>>,
    ) -> Result<(), RegistrationError> {
        body.validate(handle)?;
        self.entries.insert(handle, Entry { body, owner })
    }

    /// Overwrites both velocities. Returns false for unknown or stale handles.
    pub fn update_velocity(&mut self, handle: EntityHandle, velocity: Vec3, angular_velocity: Vec3) -> bool {
        match self.entries.get_mut(handle) {
            Some(entry) => {
                entry.body.velocity = velocity;
                entry.body.angular_velocity = angular_velocity;
                true
            }
            None => false,
        }
    }

    pub fn unregister(&mut self, handle: EntityHandle) -> Option<RigidBody> {
        self.entries.remove(handle).map(|entry| entry.body)
    }

    pub fn body(&self, handle: EntityHandle) -> Option<&RigidBody> {
        self.entries.get(handle).map(|entry| &entry.body)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (EntityHandle, &RigidBody)> {
        self.entries.iter().map(|(handle, entry)| (handle, &entry.body))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Integrates every body and notifies owners. Returns the updated bodies for the render cache.
    pub fn step(&mut self, delta_time: f32) -> Vec<(EntityHandle, RigidBody)> {
        let mut updated = Vec::with_capacity(self.entries.len());
        for (handle, entry) in self.entries.iter_mut() {
            let report = integrate(&mut entry.body, delta_time, &self.config);
            if let Some(owner) = &entry.owner {
                let body = &entry.body;
                owner.send(BodyEvent::Transform {
                    handle,
                    position: body.position,
                    rotation: body.rotation,
                    velocity: body.velocity,
                });
                if body.kind.is_player() {
                    owner.send(BodyEvent::GroundState { handle, on_ground: report.on_ground });
                }
            }
            updated.push((handle, entry.body.clone()));
        }
        updated
    }
}

/// Mailbox wrapper around [`PhysicsWorld`].
pub struct PhysicsActor {
    world: PhysicsWorld,
    render: Option<Address<RenderMessage>>,
    ticks: u64,
}

impl PhysicsActor {
    pub fn new(config: PhysicsConfig, render: Option<Address<RenderMessage>>) -> Self {
        Self { world: PhysicsWorld::new(config), render, ticks: 0 }
    }
}

impl Actor for PhysicsActor {
    type Message = PhysicsMessage;

    fn name(&self) -> &'static str {
        "physics"
    }

    fn handle(&mut self, msg: PhysicsMessage, _ctx: &Context<PhysicsMessage>) {
        match msg {
            PhysicsMessage::Register { handle, body, owner, ack } => {
                let kind = body.kind.clone();
                let result = self.world.register(handle, body, owner);
                match &result {
                    Ok(()) => debug!(%handle, %kind, "rigid body registered"),
                    Err(err) => warn!(%handle, "rejected registration: {err}"),
                }
                if let Some(ack) = ack {
                    let _ = ack.send(result);
                }
            }
            PhysicsMessage::UpdateVelocity { handle, velocity, angular_velocity } => {
                if !self.world.update_velocity(handle, velocity, angular_velocity) {
                    // owner may not be registered yet, or is terminating
                    trace!(%handle, "velocity update for unknown entity");
                }
            }
            PhysicsMessage::Unregister(handle) => {
                if self.world.unregister(handle).is_some() {
                    debug!(%handle, "rigid body removed");
                    // sent from here so it lands after every batch that still held this body
                    if let Some(render) = &self.render {
                        render.send(RenderMessage::Remove(handle));
                    }
                }
            }
            PhysicsMessage::Tick(tick) => {
                let updated = self.world.step(tick.delta_time);
                self.ticks += 1;
                if let Some(render) = &self.render {
                    if !updated.is_empty() {
                        render.send(RenderMessage::UpsertBatch(updated));
                    }
                }
            }
            PhysicsMessage::Count(reply) => {
                let _ = reply.send(self.world.len());
            }
            PhysicsMessage::Inspect(handle, reply) => {
                let _ = reply.send(self.world.body(handle).cloned());
            }
        }
    }

    fn stopped(&mut self) {
        debug!(ticks = self.ticks, bodies = self.world.len(), "physics shutting down");
    }
}

/// Client-side view of the physics actor.
#[derive(Clone, Debug)]
pub struct PhysicsAddress(pub Address<PhysicsMessage>);

impl PhysicsAddress {
    /// Validates the body at the boundary, then queues the registration.
    pub fn register(
        &self,
        handle: EntityHandle,
        body: RigidBody,
        owner: Option<Recipient<BodyEvent>>,
    ) -> Result<(), RegistrationError> {
        body.validate(handle)?;
        self.0.send(PhysicsMessage::Register { handle, body, owner, ack: None });
        Ok(())
    }

    /// Like [`register`](Self::register) but waits for the registry's verdict, including duplicate detection.
    pub fn register_confirmed(
        &self,
        handle: EntityHandle,
        body: RigidBody,
        owner: Option<Recipient<BodyEvent>>,
        timeout: std::time::Duration,
    ) -> Result<(), RegistrationError> {
        body.validate(handle)?;
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.0.send(PhysicsMessage::Register { handle, body, owner, ack: Some(tx) });
        match rx.recv_timeout(timeout) {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(%handle, "registration not confirmed: {err}");
                Err(RegistrationError::Unconfirmed(handle))
            }
        }
    }

    pub fn update_velocity(&self, handle: EntityHandle, velocity: Vec3, angular_velocity: Vec3) {
        self.0.send(PhysicsMessage::UpdateVelocity { handle, velocity, angular_velocity });
    }

    pub fn unregister(&self, handle: EntityHandle) {
        self.0.send(PhysicsMessage::Unregister(handle));
    }

    pub fn count(&self, timeout: std::time::Duration) -> Option<usize> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.0.send(PhysicsMessage::Count(tx));
        rx.recv_timeout(timeout).ok()
    }

    pub fn inspect(&self, handle: EntityHandle, timeout: std::time::Duration) -> Option<RigidBody> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.0.send(PhysicsMessage::Inspect(handle, tx));
        rx.recv_timeout(timeout).ok().flatten()
    }
}
