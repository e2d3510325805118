use std::time::Duration;

use glam::Vec3;
use tracing::{debug, info};

use crate::actor::{self, Actor, ActorHandle, Address};
use crate::config::SimConfig;
use crate::controller::input::InputProvider;
use crate::controller::input_router::{InputRouter, RouterAddress};
use crate::controller::physics::{PhysicsActor, PhysicsAddress};
use crate::controller::player::{Player, PlayerLinks, PlayerMessage};
use crate::controller::scheduler::Scheduler;
use crate::error::{RegistrationError, SandboxError, SnapshotError, SpawnError};
use crate::model::{EntityHandle, EntityKind, HandleAllocator, RigidBody};
use crate::view::{RenderCache, RenderCacheAddress, Snapshot};

/// How long a prop registration may wait for the registry's verdict
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(1);

struct RunningActor {
    stop: Box<dyn Fn() + Send>,
    handle: ActorHandle,
}

/// Actors started so far. Stops and joins them in reverse start order, also on early return.
#[derive(Default)]
struct Crew(Vec<RunningActor>);

impl Crew {
    fn launch<A: Actor>(&mut self, actor: A) -> Result<Address<A::Message>, SpawnError> {
        let (address, handle) = actor::spawn(actor)?;
        let stopper = address.clone();
        self.0.push(RunningActor { stop: Box::new(move || stopper.stop()), handle });
        Ok(address)
    }

    fn shutdown(&mut self) {
        while let Some(running) = self.0.pop() {
            debug!(actor = running.handle.name(), "stopping");
            (running.stop)();
            running.handle.join();
        }
    }
}

impl Drop for Crew {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Grid positions centered on the origin, nearest to the center first.
fn grid_positions(grid: u32, spacing: f32, height: f32) -> Vec<Vec3> {
    let offset = grid.saturating_sub(1) as f32 * spacing / 2.0;
    let mut positions: Vec<Vec3> = (0..grid)
        .flat_map(|i| (0..grid).map(move |j| (i, j)))
        .map(|(i, j)| Vec3::new(i as f32 * spacing - offset, height, j as f32 * spacing - offset))
        .collect();
    positions.sort_by(|a, b| a.length_squared().total_cmp(&b.length_squared()));
    positions
}

/// The running simulation: shared components, the player, the floor and a field of falling cubes.
pub struct Sandbox {
    // dropped first, so no tick reaches a stopping component
    scheduler: Option<Scheduler>,
    crew: Crew,
    config: SimConfig,
    allocator: HandleAllocator,
    physics: PhysicsAddress,
    render: RenderCacheAddress,
    router: RouterAddress,
    player: Option<(EntityHandle, Address<PlayerMessage>)>,
    floor: EntityHandle,
    props: Vec<EntityHandle>,
}

impl Sandbox {
    pub fn start(config: SimConfig, provider: impl InputProvider) -> Result<Self, SandboxError> {
        config.validate()?;

        let mut crew = Crew::default();
        let render = RenderCacheAddress(crew.launch(RenderCache::new())?);
        let physics = PhysicsAddress(crew.launch(PhysicsActor::new(config.physics.clone(), Some(render.0.clone())))?);
        let router = RouterAddress(crew.launch(InputRouter::new(provider))?);
        let allocator = HandleAllocator::new();

        // the floor never moves, so only the render cache knows about it
        let floor = allocator.allocate();
        let floor_body = RigidBody::new(EntityKind::Floor, Vec3::ZERO)
            .with_scale(Vec3::new(1000.0, 1.0, 1000.0))
            .with_model("plane");
        floor_body.validate(floor)?;
        render.register(floor, floor_body);

        let mut sandbox = Self {
            scheduler: None,
            crew,
            config,
            allocator,
            physics,
            render,
            router,
            player: None,
            floor,
            props: Vec::new(),
        };

        if sandbox.config.sandbox.with_player {
            sandbox.spawn_player()?;
        }

        let layout = &sandbox.config.sandbox;
        for position in grid_positions(layout.grid, layout.spacing, layout.drop_height) {
            sandbox.spawn_prop(RigidBody::new(EntityKind::Cube, position).with_model("cube"))?;
        }

        let scheduler = Scheduler::start(
            &sandbox.config.scheduler,
            vec![sandbox.physics.0.recipient()],
            vec![sandbox.router.0.recipient()],
        )?;
        sandbox.scheduler = Some(scheduler);

        info!(props = sandbox.props.len(), player = sandbox.player.is_some(), "sandbox running");
        Ok(sandbox)
    }

    fn spawn_player(&mut self) -> Result<(), SpawnError> {
        let handle = self.allocator.allocate();
        // just outside the cube field, looking into it
        let edge = self.config.sandbox.grid as f32 * self.config.sandbox.spacing / 2.0;
        let position = Vec3::new(0.0, 0.5, -(edge + 3.0));
        let links = PlayerLinks {
            physics: self.physics.clone(),
            render: self.render.clone(),
            router: self.router.clone(),
            allocator: self.allocator.clone(),
        };
        let player = Player::new(handle, position, self.config.player.clone(), self.config.camera.clone(), links);
        let address = self.crew.launch(player)?;
        self.player = Some((handle, address));
        Ok(())
    }

    /// Adds a passive body that the physics registry owns from now on.
    /// Returns once the registry has accepted or rejected it.
    pub fn spawn_prop(&mut self, body: RigidBody) -> Result<EntityHandle, RegistrationError> {
        let handle = self.allocator.allocate();
        if let Err(err) = self.physics.register_confirmed(handle, body.clone(), None, REGISTRATION_TIMEOUT) {
            if matches!(err, RegistrationError::Unconfirmed(_)) {
                // a slow registry may still accept it later
                self.physics.unregister(handle);
            }
            self.allocator.release(handle);
            return Err(err);
        }
        self.render.register(handle, body);
        self.props.push(handle);
        Ok(handle)
    }

    /// Removes a prop. Returns false if `handle` is not a live prop of this sandbox.
    pub fn despawn_prop(&mut self, handle: EntityHandle) -> bool {
        let Some(index) = self.props.iter().position(|&h| h == handle) else {
            return false;
        };
        self.props.swap_remove(index);
        // the registry also clears the render cache entry
        self.physics.unregister(handle);
        self.allocator.release(handle);
        true
    }

    pub fn snapshot(&self) -> Result<Snapshot, SnapshotError> {
        self.render.request_snapshot(self.config.render.snapshot_timeout)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsAddress {
        &self.physics
    }

    pub fn render(&self) -> &RenderCacheAddress {
        &self.render
    }

    pub fn router(&self) -> &RouterAddress {
        &self.router
    }

    pub fn player(&self) -> Option<EntityHandle> {
        self.player.as_ref().map(|(handle, _)| *handle)
    }

    pub fn floor(&self) -> EntityHandle {
        self.floor
    }

    pub fn props(&self) -> &[EntityHandle] {
        &self.props
    }

    pub fn live_handles(&self) -> usize {
        self.allocator.live()
    }

    /// Waits until the registry holds `count` bodies, or gives up after `timeout`.
    pub fn wait_for_bodies(&self, count: usize, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.physics.count(timeout) == Some(count) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
        self.crew.shutdown();
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        self.stop();
    }
}
