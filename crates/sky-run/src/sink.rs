use sky_core::SimTime;
use sky_source::Primary;

/// Consumer of generated primaries, implemented by the transport engine.
///
/// The sink sees primaries in strictly non-decreasing time order; within a
/// successor cascade all primaries share one instant and arrive in link
/// order.
pub trait ParticleSink {
    /// Take ownership of one generated primary.
    fn accept(&mut self, instant: SimTime, source: &str, primary: &Primary);
}

/// A sink that keeps everything it sees, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Accepted primaries in arrival order.
    pub records: Vec<(SimTime, String, Primary)>,
}

impl RecordingSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParticleSink for RecordingSink {
    fn accept(&mut self, instant: SimTime, source: &str, primary: &Primary) {
        self.records.push((instant, source.to_string(), primary.clone()));
    }
}
