use std::time::{Duration, Instant};

/// Tick loop configuration.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Length of one tick in milliseconds.
    pub tick_ms: u64,
    /// Maximum ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_ms: 600,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// What a pulse pushed towards the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub packets: usize,
    pub bytes: usize,
}

impl std::ops::AddAssign for FlushStats {
    fn add_assign(&mut self, rhs: Self) {
        self.packets += rhs.packets;
        self.bytes += rhs.bytes;
    }
}

/// The simulation driven by a [`TickLoop`].
///
/// Each tick runs the phases in order: inbound events, pre-pulse, pulse,
/// post-pulse. Nothing else touches the target between ticks.
pub trait TickTarget {
    /// Applies queued network events. Returns how many were handled.
    fn process_inbound(&mut self, tick: u64) -> usize;

    fn pre_pulse(&mut self, tick: u64);

    /// Advances visibility and drains every outbound queue.
    fn pulse(&mut self, tick: u64) -> FlushStats;

    fn post_pulse(&mut self, tick: u64);

    fn population(&self) -> usize;
}

/// Fixed-interval driver for a [`TickTarget`].
pub struct TickLoop<T: TickTarget> {
    pub target: T,
    pub config: TickConfig,
    pub current_tick: u64,
}

impl<T: TickTarget> TickLoop<T> {
    pub fn new(config: TickConfig, target: T) -> Self {
        Self {
            target,
            config,
            current_tick: 0,
        }
    }

    /// Execute a single tick: inbound → pre-pulse → pulse → post-pulse → metrics.
    pub fn step(&mut self) -> observability::TickMetrics {
        let start = Instant::now();
        let tick = self.current_tick;

        let inbound_events = self.target.process_inbound(tick);
        self.target.pre_pulse(tick);
        let flushed = self.target.pulse(tick);
        self.target.post_pulse(tick);

        self.current_tick += 1;
        let duration = start.elapsed();

        observability::TickMetrics {
            tick_number: self.current_tick,
            duration_us: duration.as_micros(),
            budget_us: self.config.tick_duration().as_micros(),
            population: self.target.population(),
            inbound_events,
            packets_flushed: flushed.packets,
            bytes_flushed: flushed.bytes,
        }
    }

    /// Run for the configured number of ticks (or until `max_ticks`).
    pub fn run(&mut self) -> Vec<observability::TickMetrics> {
        let mut all_metrics = Vec::new();
        self.run_until(|| false, |metrics| all_metrics.push(metrics.clone()));
        all_metrics
    }

    /// Run until `stop` returns true or `max_ticks` is reached, handing each
    /// tick's metrics to `on_tick`.
    pub fn run_until(
        &mut self,
        mut stop: impl FnMut() -> bool,
        mut on_tick: impl FnMut(&observability::TickMetrics),
    ) {
        let tick_duration = self.config.tick_duration();

        loop {
            if self.config.max_ticks > 0 && self.current_tick >= self.config.max_ticks {
                break;
            }
            if stop() {
                tracing::info!(tick = self.current_tick, "tick loop stopping");
                break;
            }

            let tick_start = Instant::now();
            let metrics = self.step();
            metrics.log();
            on_tick(&metrics);

            // Sleep until next tick
            let elapsed = tick_start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            }
        }
    }
}
