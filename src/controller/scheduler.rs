use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use tracing::{debug, error, info};

use crate::actor::Recipient;
use crate::config::SchedulerConfig;
use crate::error::SpawnError;

/// One advance of simulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Seconds since the previous firing of the same signal
    pub delta_time: f32,
}

/// Owns the simulation and input-sampling signals and fans each out to its subscribers.
pub struct Scheduler {
    stop: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(
        config: &SchedulerConfig,
        sim_subscribers: Vec<Recipient<Tick>>,
        input_subscribers: Vec<Recipient<Tick>>,
    ) -> Result<Self, SpawnError> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let mut scheduler = Self { stop: Some(stop_tx), threads: Vec::with_capacity(2) };

        // dropping `scheduler` on error stops whichever signal already started
        let sim = spawn_signal("sim-tick", config.sim_hz, sim_subscribers, stop_rx.clone())?;
        scheduler.threads.push(sim);
        let input = spawn_signal("input-tick", config.input_hz, input_subscribers, stop_rx)?;
        scheduler.threads.push(input);

        info!(sim_hz = config.sim_hz, input_hz = config.input_hz, "scheduler started");
        Ok(scheduler)
    }

    /// Cancels both signals and waits for their threads.
    pub fn shutdown(&mut self) {
        // disconnecting the stop channel wakes every signal loop
        if self.stop.take().is_none() {
            return;
        }
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                error!("scheduler thread panicked");
            }
        }
        info!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_signal(
    name: &'static str,
    hz: u32,
    mut subscribers: Vec<Recipient<Tick>>,
    stop: Receiver<()>,
) -> Result<JoinHandle<()>, SpawnError> {
    let period = Duration::from_secs_f64(1.0 / f64::from(hz.max(1)));
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let ticker = crossbeam_channel::tick(period);
            let mut last = Instant::now();
            let mut fired: u64 = 0;
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let now = Instant::now();
                        let tick = Tick { delta_time: now.duration_since(last).as_secs_f32() };
                        last = now;
                        fired += 1;
                        subscribers.retain(|subscriber| {
                            let alive = subscriber.send(tick);
                            if !alive {
                                debug!(signal = name, subscriber = subscriber.name(), "unsubscribing stopped recipient");
                            }
                            alive
                        });
                    }
                    recv(stop) -> _ => break,
                }
            }
            debug!(signal = name, fired, "signal stopped");
        })
        .map_err(|source| SpawnError::Thread { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_carry_wall_clock_deltas() {
        let (sim_tx, sim_rx) = crossbeam_channel::unbounded();
        let (input_tx, input_rx) = crossbeam_channel::unbounded();
        let config = SchedulerConfig { sim_hz: 100, input_hz: 500 };
        let mut scheduler = Scheduler::start(
            &config,
            vec![Recipient::from_sender("sim", sim_tx)],
            vec![Recipient::from_sender("input", input_tx)],
        )
        .unwrap();

        thread::sleep(Duration::from_millis(300));
        scheduler.shutdown();

        let sim: Vec<Tick> = sim_rx.try_iter().collect();
        let input: Vec<Tick> = input_rx.try_iter().collect();
        assert!(sim.len() >= 5, "only {} sim ticks", sim.len());
        assert!(input.len() > sim.len());

        // the deltas add up to (at most) the time the signal ran
        let total: f32 = sim.iter().map(|t| t.delta_time).sum();
        assert!(total > 0.0 && total <= 0.35, "total {total}");
        assert!(sim.iter().all(|t| t.delta_time >= 0.0));
    }

    #[test]
    fn shutdown_stops_all_signals() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let config = SchedulerConfig { sim_hz: 1000, input_hz: 1000 };
        let mut scheduler =
            Scheduler::start(&config, vec![Recipient::from_sender("sim", tx.clone())], vec![Recipient::from_sender("input", tx)])
                .unwrap();
        thread::sleep(Duration::from_millis(20));
        scheduler.shutdown();
        rx.try_iter().count();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(rx.try_iter().count(), 0);
        // second shutdown is a no-op
        scheduler.shutdown();
    }
}
