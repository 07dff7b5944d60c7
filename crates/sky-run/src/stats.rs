use std::time::{Duration, Instant};

use sky_source::SourceId;

/// Counters accumulated while a run generates primaries.
///
/// An *event* is one accepted emission cycle; a cycle that cascades through
/// successor links still counts as a single event, while every primary it
/// emits is tallied in the per-source generation counters.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    started: Instant,
    generated: Vec<u64>,
    total_generated: u64,
    events: u64,
    triggers: u64,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            generated: Vec::new(),
            total_generated: 0,
            events: 0,
            triggers: 0,
        }
    }
}

impl RunStatistics {
    /// Fresh counters; wall-clock measurement starts now.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one generated primary for `source`.
    pub fn record(&mut self, source: SourceId) {
        let idx = source.index();
        if idx >= self.generated.len() {
            self.generated.resize(idx + 1, 0);
        }
        self.generated[idx] += 1;
        self.total_generated += 1;
    }

    /// Record one accepted emission cycle.
    pub fn record_event(&mut self) {
        self.events += 1;
    }

    /// Record one externally reported trigger.
    pub fn record_trigger(&mut self) {
        self.triggers += 1;
    }

    /// Primaries generated by one source.
    pub fn generated(&self, source: SourceId) -> u64 {
        self.generated.get(source.index()).copied().unwrap_or(0)
    }

    /// Primaries generated in total, successors included.
    pub const fn total_generated(&self) -> u64 {
        self.total_generated
    }

    /// Accepted emission cycles.
    pub const fn events(&self) -> u64 {
        self.events
    }

    /// Triggers reported so far.
    pub const fn triggers(&self) -> u64 {
        self.triggers
    }

    /// Wall-clock time since the counters were created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
