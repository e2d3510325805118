use crossbeam_channel::Sender;
use glam::{Vec2, Vec3};
use tracing::debug;

use super::input_context::{InputContext, LookInput};
use super::input_router::{InputEvent, RouterAddress};
use crate::actor::{Actor, Address, Context, Recipient};
use crate::config::CameraConfig;
use crate::model::{Camera, EntityHandle};
use crate::view::RenderCacheAddress;

/// Sent to the entity the camera is bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraEvent {
    /// New (pitch, yaw) orientation after look input
    Facing { rotation: Vec2 },
}

pub enum CameraMessage {
    Input(InputEvent),
    /// Transform of the followed entity
    Follow { position: Vec3 },
    Current(Sender<Camera>),
}

impl From<InputEvent> for CameraMessage {
    fn from(event: InputEvent) -> Self {
        CameraMessage::Input(event)
    }
}

/// Turns look input into camera orientation and keeps the render cache's camera current.
pub struct CameraController {
    handle: EntityHandle,
    camera: Camera,
    config: CameraConfig,
    render: RenderCacheAddress,
    router: Option<RouterAddress>,
    owner: Option<Recipient<CameraEvent>>,
}

impl CameraController {
    pub fn new(handle: EntityHandle, camera: Camera, config: CameraConfig, render: RenderCacheAddress) -> Self {
        Self { handle, camera, config, render, router: None, owner: None }
    }

    /// Registers a look context with `router` once started.
    pub fn with_router(mut self, router: RouterAddress) -> Self {
        self.router = Some(router);
        self
    }

    /// Binds the camera to an entity that wants to track its orientation.
    pub fn with_owner(mut self, owner: Recipient<CameraEvent>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Applies one look sample. Returns whether the camera changed.
    pub fn apply_look(&mut self, look: &LookInput) -> bool {
        if look.rotation_delta == Vec2::ZERO && look.zoom_delta == 0.0 {
            return false;
        }
        let pitch_limit = self.config.pitch_limit_deg.to_radians();
        let rotation = self.camera.rotation + look.rotation_delta * self.config.sensitivity;
        self.camera.rotation = Vec2::new(rotation.x.clamp(-pitch_limit, pitch_limit), rotation.y);

        self.camera.zoom = (self.camera.zoom + look.zoom_delta * self.config.zoom_speed)
            .clamp(self.config.zoom_min, self.config.zoom_max);
        true
    }

    pub fn follow(&mut self, position: Vec3) {
        self.camera.position = position + self.config.follow_offset;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }
}

impl Actor for CameraController {
    type Message = CameraMessage;

    fn name(&self) -> &'static str {
        "camera"
    }

    fn started(&mut self, ctx: &Context<CameraMessage>) {
        if let Some(router) = &self.router {
            router.register(self.handle, ctx.address().recipient(), vec![InputContext::camera_look()]);
        }
        self.render.update_camera(self.camera);
        debug!(handle = %self.handle, position = ?self.camera.position, "camera ready");
    }

    fn handle(&mut self, msg: CameraMessage, _ctx: &Context<CameraMessage>) {
        match msg {
            CameraMessage::Input(InputEvent { context: InputContext::CameraLook(look), .. }) => {
                if self.apply_look(&look) {
                    self.render.update_camera(self.camera);
                    if let Some(owner) = &self.owner {
                        owner.send(CameraEvent::Facing { rotation: self.camera.rotation });
                    }
                }
            }
            CameraMessage::Input(_) => {}
            CameraMessage::Follow { position } => {
                self.follow(position);
                self.render.update_camera(self.camera);
            }
            CameraMessage::Current(reply) => {
                let _ = reply.send(self.camera);
            }
        }
    }

    fn stopped(&mut self) {
        if let Some(router) = &self.router {
            router.unregister_all(self.handle);
        }
    }
}

/// Client-side view of a camera controller.
#[derive(Clone, Debug)]
pub struct CameraAddress(pub Address<CameraMessage>);

impl CameraAddress {
    pub fn follow(&self, position: Vec3) {
        self.0.send(CameraMessage::Follow { position });
    }

    pub fn current(&self, timeout: std::time::Duration) -> Option<Camera> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.0.send(CameraMessage::Current(tx));
        rx.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor;
    use crate::view::RenderCache;
    use approx::assert_abs_diff_eq;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn controller(render: RenderCacheAddress) -> CameraController {
        CameraController::new(EntityHandle::new(0, 0), Camera::new(Vec3::ZERO), CameraConfig::default(), render)
    }

    fn look(rotation_delta: Vec2, zoom_delta: f32) -> LookInput {
        LookInput { rotation_delta, zoom_delta }
    }

    #[test]
    fn pitch_is_clamped_and_yaw_is_free() {
        let (addr, handle) = actor::spawn(RenderCache::new()).unwrap();
        let mut cam = controller(RenderCacheAddress(addr.clone()));

        assert!(cam.apply_look(&look(Vec2::new(100_000.0, 5_000.0), 0.0)));
        assert_abs_diff_eq!(cam.camera().rotation.x, 89f32.to_radians(), epsilon = 1e-6);
        assert_abs_diff_eq!(cam.camera().rotation.y, 10.0, epsilon = 1e-4);

        cam.apply_look(&look(Vec2::new(-300_000.0, 0.0), 0.0));
        assert_abs_diff_eq!(cam.camera().rotation.x, -89f32.to_radians(), epsilon = 1e-6);

        assert!(!cam.apply_look(&LookInput::default()));

        addr.stop();
        handle.join();
    }

    #[test]
    fn zoom_stays_in_range() {
        let (addr, handle) = actor::spawn(RenderCache::new()).unwrap();
        let mut cam = controller(RenderCacheAddress(addr.clone()));
        for _ in 0..1000 {
            cam.apply_look(&look(Vec2::ZERO, 1.0));
        }
        assert_eq!(cam.camera().zoom, 10.0);
        for _ in 0..1000 {
            cam.apply_look(&look(Vec2::ZERO, -1.0));
        }
        assert_abs_diff_eq!(cam.camera().zoom, 0.1);

        addr.stop();
        handle.join();
    }

    #[test]
    fn follow_and_look_reach_cache_and_owner() {
        let (cache_addr, cache_handle) = actor::spawn(RenderCache::new()).unwrap();
        let cache = RenderCacheAddress(cache_addr);
        let (owner_tx, owner_rx) = crossbeam_channel::unbounded();
        let (addr, handle) = actor::spawn(
            controller(cache.clone()).with_owner(Recipient::from_sender("player", owner_tx)),
        )
        .unwrap();
        let camera = CameraAddress(addr);

        camera.follow(Vec3::new(1.0, 0.5, 2.0));
        camera.0.send(CameraMessage::Input(InputEvent {
            handle: EntityHandle::new(0, 0),
            context: InputContext::CameraLook(look(Vec2::new(0.0, 500.0), 0.0)),
            active: true,
        }));

        let current = camera.current(TIMEOUT).unwrap();
        assert_abs_diff_eq!(current.position, Vec3::new(1.0, 2.1, 2.0), epsilon = 1e-6);
        assert_abs_diff_eq!(current.rotation.y, 1.0, epsilon = 1e-6);
        assert_eq!(owner_rx.try_recv(), Ok(CameraEvent::Facing { rotation: current.rotation }));

        // the camera answered after publishing, so the cache already has it
        assert_eq!(cache.request_snapshot(TIMEOUT).unwrap().camera, current);

        camera.0.stop();
        handle.join();
        cache.0.stop();
        cache_handle.join();
    }
}
