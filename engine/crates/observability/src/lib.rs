use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub tick_number: u64,
    pub duration_us: u128,
    /// Tick interval the duration is measured against.
    pub budget_us: u128,
    pub population: usize,
    pub inbound_events: usize,
    pub packets_flushed: usize,
    pub bytes_flushed: usize,
}

impl TickMetrics {
    pub fn over_budget(&self) -> bool {
        self.budget_us > 0 && self.duration_us > self.budget_us
    }

    pub fn log(&self) {
        if self.over_budget() {
            tracing::warn!(
                tick = self.tick_number,
                duration_us = self.duration_us,
                population = self.population,
                inbound = self.inbound_events,
                packets = self.packets_flushed,
                bytes = self.bytes_flushed,
                "tick exceeded budget ({}us > {}us)",
                self.duration_us,
                self.budget_us
            );
        } else {
            tracing::info!(
                tick = self.tick_number,
                duration_us = self.duration_us,
                population = self.population,
                inbound = self.inbound_events,
                packets = self.packets_flushed,
                bytes = self.bytes_flushed,
                "tick completed"
            );
        }
    }
}
