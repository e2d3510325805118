use std::env;
use std::time::Duration;

use anyhow::Context as _;
use glam::Vec2;
use tracing::info;

// Import from the library crate
use otto::{
    config::SimConfig,
    controller::{FrameLoop, InputSnapshot, Key, MouseButton, ScriptedInputProvider},
    logging,
    view::{RenderFrontend, StatsSink},
    Sandbox,
};

/// Walks into the cube field, looks around, jumps, then idles.
fn demo_script(input_hz: u32) -> ScriptedInputProvider {
    let second = input_hz as usize;
    let walk = InputSnapshot::default().with_keys([Key::W]);
    let turn = InputSnapshot::default()
        .with_keys([Key::W])
        .with_mouse_buttons([MouseButton::Right])
        .with_mouse_delta(Vec2::new(1.0, 0.0));
    let jump = InputSnapshot::default().with_keys([Key::W, Key::Space]);

    ScriptedInputProvider::new()
        .hold(InputSnapshot::default(), second / 2)
        .hold(walk.clone(), second)
        .hold(turn, second)
        .hold(jump, second / 10)
        .hold(walk, second)
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let config = SimConfig::from_env();
    let run_seconds: u64 = match env::var("OTTO_RUN_SECONDS") {
        Ok(raw) => raw.trim().parse().context("OTTO_RUN_SECONDS must be a whole number of seconds")?,
        Err(_) => 5,
    };

    let provider = demo_script(config.scheduler.input_hz);
    let sandbox = Sandbox::start(config.clone(), provider).context("failed to start the sandbox")?;

    let mut frames = FrameLoop::new(
        sandbox.render().clone(),
        RenderFrontend::new(1280, 720),
        StatsSink::default(),
        config.render.snapshot_timeout,
    );
    let stats = frames.run_for(Duration::from_secs(run_seconds), config.render.frame_hz);
    let sink = frames.sink();
    info!(
        rendered = stats.rendered,
        skipped = stats.skipped,
        batches = sink.batches,
        instances_last_frame = sink.last_instances,
        "run complete"
    );

    if let Some(player) = sandbox.player() {
        if let Some(body) = sandbox.physics().inspect(player, config.render.snapshot_timeout * 10) {
            info!(%player, position = ?body.position, "final player position");
        }
    }

    sandbox.shutdown();
    Ok(())
}
