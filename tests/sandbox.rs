use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;
use otto::{
    config::SimConfig,
    controller::{FrameLoop, InputSnapshot, Key, NullInputProvider, ScriptedInputProvider},
    logging,
    model::{EntityKind, RigidBody},
    view::{RenderFrontend, Snapshot, StatsSink},
    Sandbox, SandboxError,
};

const PATIENCE: Duration = Duration::from_secs(10);

fn config(grid: u32, with_player: bool) -> SimConfig {
    let mut config = SimConfig::default();
    config.sandbox.grid = grid;
    config.sandbox.with_player = with_player;
    // generous for loaded test machines
    config.render.snapshot_timeout = Duration::from_millis(500);
    config
}

/// Polls snapshots until `done` holds or patience runs out.
fn eventually(sandbox: &Sandbox, mut done: impl FnMut(&Snapshot) -> bool) -> Snapshot {
    let deadline = Instant::now() + PATIENCE;
    loop {
        let snapshot = sandbox.snapshot().expect("snapshot");
        if done(&snapshot) || Instant::now() > deadline {
            return snapshot;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

fn cubes(snapshot: &Snapshot) -> Vec<&RigidBody> {
    snapshot.bodies().filter(|b| b.kind == EntityKind::Cube).collect()
}

#[test]
fn empty_sandbox_has_only_the_floor_and_a_zero_camera() {
    logging::init_for_tests();
    let sandbox = Sandbox::start(config(0, false), NullInputProvider).unwrap();

    let snapshot = sandbox.snapshot().unwrap();
    assert_eq!(snapshot.entities.len(), 1);
    assert_eq!(snapshot.entities[0].0, sandbox.floor());
    assert_eq!(snapshot.camera, Default::default());

    sandbox.shutdown();
}

#[test]
fn falling_cubes_come_to_rest_on_the_floor() {
    logging::init_for_tests();
    let mut cfg = config(2, false);
    cfg.physics.gravity = -40.0;
    let sandbox = Sandbox::start(cfg, NullInputProvider).unwrap();
    assert!(sandbox.wait_for_bodies(4, PATIENCE));

    let snapshot = eventually(&sandbox, |s| {
        let cubes = cubes(s);
        cubes.len() == 4 && cubes.iter().all(|b| (b.position.y - 0.5).abs() < 1e-4)
    });
    let cubes = cubes(&snapshot);
    assert_eq!(cubes.len(), 4);
    for cube in cubes {
        assert!((cube.position.y - 0.5).abs() < 1e-4, "cube at {:?}", cube.position);
        assert!(cube.bottom() >= -1e-6);
        // no horizontal drift from a vertical fall
        assert_eq!(cube.velocity.x, 0.0);
        assert_eq!(cube.velocity.z, 0.0);
    }

    sandbox.shutdown();
}

#[test]
fn despawned_props_disappear_everywhere() {
    logging::init_for_tests();
    let mut sandbox = Sandbox::start(config(0, false), NullInputProvider).unwrap();
    let a = sandbox
        .spawn_prop(RigidBody::new(EntityKind::Cube, Vec3::new(0.0, 3.0, 0.0)).with_model("cube"))
        .unwrap();
    let b = sandbox
        .spawn_prop(RigidBody::new(EntityKind::Other("crate".into()), Vec3::new(4.0, 3.0, 0.0)).with_model("crate"))
        .unwrap();
    assert!(sandbox.wait_for_bodies(2, PATIENCE));

    assert!(sandbox.despawn_prop(a));
    assert!(!sandbox.despawn_prop(a));
    assert!(sandbox.wait_for_bodies(1, PATIENCE));

    let snapshot = eventually(&sandbox, |s| s.get(a).is_none());
    assert!(snapshot.get(a).is_none());
    assert!(snapshot.get(b).is_some());
    // floor and the remaining prop
    assert_eq!(sandbox.live_handles(), 2);

    // a recycled slot gets a fresh generation
    let c = sandbox.spawn_prop(RigidBody::new(EntityKind::Cube, Vec3::ONE).with_model("cube")).unwrap();
    assert_eq!(c.index, a.index);
    assert_ne!(c, a);

    sandbox.shutdown();
}

#[test]
fn malformed_props_are_rejected() {
    logging::init_for_tests();
    let mut sandbox = Sandbox::start(config(0, false), NullInputProvider).unwrap();
    let flat = RigidBody::new(EntityKind::Cube, Vec3::ZERO).with_scale(Vec3::new(1.0, 0.0, 1.0));
    assert!(sandbox.spawn_prop(flat).is_err());
    assert!(sandbox.props().is_empty());
    assert_eq!(sandbox.live_handles(), 1);

    sandbox.shutdown();
}

#[test]
fn invalid_config_never_starts() {
    let mut cfg = config(0, false);
    cfg.scheduler.sim_hz = 0;
    assert!(matches!(Sandbox::start(cfg, NullInputProvider), Err(SandboxError::Config(_))));
}

#[test]
fn held_forward_key_walks_the_player_and_its_camera() {
    logging::init_for_tests();
    let cfg = config(0, true);
    let walk = InputSnapshot::default().with_keys([Key::W]);
    let provider = ScriptedInputProvider::new().hold(walk, 60 * cfg.scheduler.input_hz as usize);
    let sandbox = Sandbox::start(cfg, provider).unwrap();
    let player = sandbox.player().unwrap();

    let start_z = eventually(&sandbox, |s| s.get(player).is_some()).get(player).unwrap().position.z;

    // the camera looks down +z, so forward input moves the player along +z
    let snapshot = eventually(&sandbox, |s| {
        s.get(player).map_or(false, |b| b.position.z > start_z + 1.0) && s.camera.position.z > start_z + 1.0
    });
    let body = snapshot.get(player).unwrap();
    assert!(body.position.z > start_z + 1.0, "player stuck at {:?}", body.position);
    assert!(body.position.x.abs() < 1e-3);
    assert!((body.position.y - 0.5).abs() < 1e-3);
    assert!(snapshot.camera.position.z > start_z + 1.0);

    sandbox.shutdown();
}

#[test]
fn frame_loop_renders_the_sandbox() {
    logging::init_for_tests();
    let cfg = config(3, true);
    let timeout = cfg.render.snapshot_timeout;
    let sandbox = Sandbox::start(cfg, NullInputProvider).unwrap();
    assert!(sandbox.wait_for_bodies(10, PATIENCE));

    let mut frames = FrameLoop::new(sandbox.render().clone(), RenderFrontend::new(640, 480), StatsSink::default(), timeout);
    let stats = frames.run_for(Duration::from_millis(300), 60);
    assert!(stats.rendered > 0);
    // floor, player and nine cubes
    assert_eq!(frames.sink().last_instances, 11);

    sandbox.shutdown();
}
