use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::SnapshotError;
use crate::view::{DrawSink, RenderCacheAddress, RenderFrontend};

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Rendered { batches: usize, instances: usize },
    /// The cache did not answer in time; the next frame simply tries again
    Skipped(SnapshotError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub rendered: u64,
    pub skipped: u64,
}

/// Render consumer: one bounded snapshot request per displayed frame.
pub struct FrameLoop<S: DrawSink> {
    cache: RenderCacheAddress,
    frontend: RenderFrontend,
    sink: S,
    timeout: Duration,
    stats: FrameStats,
}

impl<S: DrawSink> FrameLoop<S> {
    pub fn new(cache: RenderCacheAddress, frontend: RenderFrontend, sink: S, timeout: Duration) -> Self {
        Self { cache, frontend, sink, timeout, stats: FrameStats::default() }
    }

    pub fn frame(&mut self) -> FrameOutcome {
        match self.cache.request_snapshot(self.timeout) {
            Ok(snapshot) => {
                let plan = self.frontend.prepare(&snapshot);
                self.sink.submit(&plan);
                self.stats.rendered += 1;
                FrameOutcome::Rendered { batches: plan.batches.len(), instances: plan.instance_count() }
            }
            Err(err) => {
                self.stats.skipped += 1;
                // a timeout per frame is routine under load, a dead cache is not
                match &err {
                    SnapshotError::Timeout(_) => debug!("skipping frame: {err}"),
                    SnapshotError::Disconnected => warn!("skipping frame: {err}"),
                }
                FrameOutcome::Skipped(err)
            }
        }
    }

    /// Renders at `frame_hz` until `duration` has elapsed.
    pub fn run_for(&mut self, duration: Duration, frame_hz: u32) -> FrameStats {
        let period = Duration::from_secs_f64(1.0 / f64::from(frame_hz.max(1)));
        let ticker = crossbeam_channel::tick(period);
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            if ticker.recv_deadline(deadline).is_err() {
                break;
            }
            self.frame();
        }
        info!(rendered = self.stats.rendered, skipped = self.stats.skipped, "frame loop finished");
        self.stats
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
