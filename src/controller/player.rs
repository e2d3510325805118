use glam::{Vec2, Vec3};
use tracing::{debug, error, info, warn};

use super::camera_controller::{CameraAddress, CameraController, CameraEvent};
use super::input_context::InputContext;
use super::input_router::{InputEvent, RouterAddress};
use super::physics::{BodyEvent, PhysicsAddress};
use crate::actor::{self, Actor, ActorHandle, Context};
use crate::config::{CameraConfig, PlayerConfig};
use crate::model::{Camera, EntityHandle, EntityKind, HandleAllocator, RigidBody};
use crate::utils;
use crate::view::RenderCacheAddress;

/// Yaw error (degrees) below which the body counts as facing the camera direction
const FACING_TOLERANCE_DEG: f32 = 0.5;
/// Turn rate per degree of yaw error, in 1/s
const TURN_GAIN: f32 = 8.0;

pub enum PlayerMessage {
    Body(BodyEvent),
    Input(InputEvent),
    Camera(CameraEvent),
}

impl From<BodyEvent> for PlayerMessage {
    fn from(event: BodyEvent) -> Self {
        PlayerMessage::Body(event)
    }
}

impl From<InputEvent> for PlayerMessage {
    fn from(event: InputEvent) -> Self {
        PlayerMessage::Input(event)
    }
}

impl From<CameraEvent> for PlayerMessage {
    fn from(event: CameraEvent) -> Self {
        PlayerMessage::Camera(event)
    }
}

/// Collaborators a player talks to.
#[derive(Clone)]
pub struct PlayerLinks {
    pub physics: PhysicsAddress,
    pub render: RenderCacheAddress,
    pub router: RouterAddress,
    pub allocator: HandleAllocator,
}

struct OwnedCamera {
    handle: EntityHandle,
    address: CameraAddress,
    actor: ActorHandle,
}

/// The controllable entity: walks relative to its camera, jumps, and keeps the camera following it.
pub struct Player {
    handle: EntityHandle,
    spawn_position: Vec3,
    config: PlayerConfig,
    camera_config: CameraConfig,
    links: PlayerLinks,
    camera: Option<OwnedCamera>,

    /// Latest movement input in the local frame (x strafe, y jump, z forward)
    movement: Vec3,
    /// Camera (pitch, yaw) the movement frame follows
    facing: Vec2,
    /// Body yaw in degrees, as last reported by the registry
    body_yaw: f32,
    /// Yaw rate in the last velocity sent; the registry keeps it until overwritten
    turn_rate: f32,
    vertical_velocity: f32,
    on_ground: bool,
    can_jump: bool,
    jump_pending: bool,
}

impl Player {
    pub fn new(
        handle: EntityHandle,
        spawn_position: Vec3,
        config: PlayerConfig,
        camera_config: CameraConfig,
        links: PlayerLinks,
    ) -> Self {
        Self {
            handle,
            spawn_position,
            config,
            camera_config,
            links,
            camera: None,
            movement: Vec3::ZERO,
            facing: Vec2::ZERO,
            body_yaw: 0.0,
            turn_rate: 0.0,
            vertical_velocity: 0.0,
            on_ground: false,
            can_jump: true,
            jump_pending: false,
        }
    }

    fn body(&self) -> RigidBody {
        RigidBody::new(EntityKind::Player, self.spawn_position).with_model("cube")
    }

    fn spawn_camera(&mut self, ctx: &Context<PlayerMessage>) {
        let handle = self.links.allocator.allocate();
        let camera = Camera::new(self.spawn_position + self.camera_config.follow_offset);
        let controller =
            CameraController::new(handle, camera, self.camera_config.clone(), self.links.render.clone())
                .with_router(self.links.router.clone())
                .with_owner(ctx.address().recipient());
        match actor::spawn(controller) {
            Ok((address, actor)) => {
                self.camera = Some(OwnedCamera { handle, address: CameraAddress(address), actor });
            }
            Err(err) => {
                warn!(player = %self.handle, "running without a camera: {err}");
                self.links.allocator.release(handle);
            }
        }
    }

    /// Signed yaw error towards the camera, wrapped to [-180, 180).
    fn yaw_error(&self) -> f32 {
        let target = self.facing.y.to_degrees();
        (target - self.body_yaw + 180.0).rem_euclid(360.0) - 180.0
    }

    fn is_steering(&self) -> bool {
        let walking = self.movement.x != 0.0 || self.movement.z != 0.0;
        walking || self.yaw_error().abs() > FACING_TOLERANCE_DEG
    }

    fn try_jump(&mut self) {
        if self.movement.y > 0.0 && self.on_ground && self.can_jump {
            debug!(player = %self.handle, "jump");
            self.vertical_velocity = self.config.jump_force;
            self.can_jump = false;
            self.on_ground = false;
            self.jump_pending = true;
        }
    }

    /// Sends the full desired velocity. The registry overwrites, so vertical state travels along.
    fn push_velocity(&mut self) {
        let local = Vec3::new(self.movement.x, 0.0, self.movement.z);
        let horizontal = utils::camera_relative_horizontal(self.facing, local) * self.config.walk_speed;
        let velocity = Vec3::new(horizontal.x, self.vertical_velocity, horizontal.z);

        let error = self.yaw_error();
        let turn = if error.abs() > FACING_TOLERANCE_DEG { error * TURN_GAIN } else { 0.0 };
        self.turn_rate = turn;

        self.links.physics.update_velocity(self.handle, velocity, Vec3::new(0.0, turn, 0.0));
    }

    fn on_body(&mut self, event: BodyEvent) {
        match event {
            BodyEvent::Transform { position, rotation, velocity, .. } => {
                self.body_yaw = rotation.y;
                if let Some(camera) = &self.camera {
                    camera.address.follow(position);
                }

                // transforms integrated before the jump landed would cancel it
                if self.jump_pending {
                    if velocity.y > 0.0 {
                        self.jump_pending = false;
                    } else {
                        return;
                    }
                }
                self.vertical_velocity = velocity.y;
                // a body still spinning from the last update is stopped once it faces the camera
                if self.is_steering() || self.turn_rate != 0.0 {
                    self.push_velocity();
                }
            }
            BodyEvent::GroundState { on_ground, .. } => {
                if on_ground && !self.on_ground && !self.jump_pending {
                    self.can_jump = true;
                }
                if !self.jump_pending {
                    self.on_ground = on_ground;
                }
            }
        }
    }

    fn on_input(&mut self, event: InputEvent) {
        match event.context {
            InputContext::Movement(movement) => {
                self.movement = movement.direction;
                if self.movement.y <= 0.0 {
                    self.can_jump = true;
                }
                self.try_jump();
                self.push_velocity();
            }
            InputContext::GameActions(actions) => {
                if let Some(action) = actions.action {
                    info!(player = %self.handle, action = action.as_str(), "game action");
                }
            }
            InputContext::CameraLook(_) | InputContext::UiInteraction(_) => {}
        }
    }
}

impl Actor for Player {
    type Message = PlayerMessage;

    fn name(&self) -> &'static str {
        "player"
    }

    fn started(&mut self, ctx: &Context<PlayerMessage>) {
        let body = self.body();
        let owner = Some(ctx.address().recipient());
        if let Err(err) = self.links.physics.register(self.handle, body.clone(), owner) {
            error!(player = %self.handle, "cannot register player body: {err}");
            ctx.stop();
            return;
        }
        self.links.render.register(self.handle, body);
        self.links.router.register(
            self.handle,
            ctx.address().recipient(),
            vec![InputContext::movement(), InputContext::game_actions()],
        );
        self.spawn_camera(ctx);
        info!(player = %self.handle, position = ?self.spawn_position, "player spawned");
    }

    fn handle(&mut self, msg: PlayerMessage, _ctx: &Context<PlayerMessage>) {
        match msg {
            PlayerMessage::Body(event) => self.on_body(event),
            PlayerMessage::Input(event) => self.on_input(event),
            PlayerMessage::Camera(CameraEvent::Facing { rotation }) => {
                self.facing = rotation;
                self.push_velocity();
            }
        }
    }

    fn stopped(&mut self) {
        self.links.router.unregister_all(self.handle);
        self.links.physics.unregister(self.handle);
        if let Some(camera) = self.camera.take() {
            camera.address.0.stop();
            camera.actor.join();
            self.links.allocator.release(camera.handle);
        }
        self.links.allocator.release(self.handle);
    }
}
