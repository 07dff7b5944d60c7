use std::collections::{BTreeSet, HashSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use sky_core::{GeometryProvider, PhysicsProvider, SimTime};
use sky_orient::OrientationTrack;
use sky_source::{
    EventListEntry, Primary, SamplingLimits, Source, SourceError, SourceId,
};
use tracing::{debug, info, warn};

use crate::catalog::SourceCatalog;
use crate::config::RunConfig;
use crate::error::{RunError, RunResult};
use crate::sink::ParticleSink;
use crate::stats::RunStatistics;

/// When a run stops. Exactly one condition per run; clean early stops
/// (exhausted sources, end of a bounded sky track, interrupts) convert the
/// run to `ByEvents` at the count reached so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopCondition {
    /// Stop once simulated time reaches this many seconds.
    ByTime(f64),
    /// Stop once this many primaries were generated.
    ByEvents(u64),
    /// Stop once this many triggers were reported by the caller.
    ByTriggers(u64),
}

/// Result of one scheduling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle emitted this many primaries (the scheduled source plus
    /// its successor cascade).
    Emitted(usize),
    /// The scheduled emission produced no particle (a consumed skip); the
    /// run continues.
    Idle,
    /// A stop condition is met; no further primaries will be produced.
    Stopped,
}

/// One simulation run: a set of sources, a pair of orientation tracks, and
/// the time-ordered schedule that drives them.
///
/// Single-threaded and cooperative: the caller pulls one scheduling cycle
/// at a time with [`Run::generate_primaries`] and owns the loop. The
/// schedule is keyed by `(next emission, id)` and mutated strictly by
/// erase-then-reinsert of the one source whose turn it was.
#[derive(Debug)]
pub struct Run {
    name: String,
    stop: StopCondition,
    time: SimTime,
    catalog: SourceCatalog,
    schedule: BTreeSet<(SimTime, SourceId)>,
    sky: OrientationTrack,
    detector: OrientationTrack,
    stats: RunStatistics,
    rng: StdRng,
    limits: SamplingLimits,
    interrupted: bool,
    initialized: bool,
}

impl Run {
    /// A new run with no sources and fixed local orientations.
    pub fn new(name: impl Into<String>, stop: StopCondition, config: &RunConfig) -> Self {
        Self {
            name: name.into(),
            stop,
            time: SimTime::ZERO,
            catalog: SourceCatalog::new(),
            schedule: BTreeSet::new(),
            sky: OrientationTrack::fixed_local(),
            detector: OrientationTrack::fixed_local(),
            stats: RunStatistics::new(),
            rng: StdRng::seed_from_u64(config.seed),
            limits: config.limits(),
            interrupted: false,
            initialized: false,
        }
    }

    /// Set the sky orientation track.
    #[must_use]
    pub fn with_sky_track(mut self, track: OrientationTrack) -> Self {
        self.sky = track;
        self
    }

    /// Set the detector orientation track.
    #[must_use]
    pub fn with_detector_track(mut self, track: OrientationTrack) -> Self {
        self.detector = track;
        self
    }

    /// Register a source. Only allowed before initialization.
    pub fn add_source(&mut self, source: Source) -> RunResult<SourceId> {
        if self.initialized {
            return Err(RunError::AlreadyInitialized(self.name.clone()));
        }
        self.catalog.insert(&self.name, source)
    }

    /// Run name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current simulated time.
    pub const fn time(&self) -> SimTime {
        self.time
    }

    /// The active stop condition (may have been converted by a clean stop).
    pub const fn stop_condition(&self) -> StopCondition {
        self.stop
    }

    /// Counters accumulated so far.
    pub const fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// The sky orientation track.
    pub const fn sky_track(&self) -> &OrientationTrack {
        &self.sky
    }

    /// The detector orientation track.
    pub const fn detector_track(&self) -> &OrientationTrack {
        &self.detector
    }

    /// The registered sources.
    pub const fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    /// Report one detector trigger. Drives `StopCondition::ByTriggers`.
    pub fn report_trigger(&mut self) {
        self.stats.record_trigger();
    }

    /// Request a clean stop. Polled once per scheduling cycle; a successor
    /// cascade in flight is never truncated.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Resolve collaborator-dependent state and build the initial
    /// schedule. Any failure leaves the run unstarted.
    pub fn initialize(
        &mut self,
        physics: &dyn PhysicsProvider,
        geometry: &dyn GeometryProvider,
    ) -> RunResult<()> {
        if self.initialized {
            return Err(RunError::AlreadyInitialized(self.name.clone()));
        }

        for (index, source) in self.catalog.iter_mut().enumerate() {
            source.finalize(SourceId::new(index as u32), physics, geometry)?;
        }
        let successor_targets = self.resolve_successors()?;

        // A bounded track that starts late pins the run start; emissions
        // before the attitude is known would be untransformable.
        for start in [self.sky.start_time(), self.detector.start_time()]
            .into_iter()
            .flatten()
        {
            self.time = self.time.max(start);
        }

        let now = self.time;
        let mut schedule = BTreeSet::new();
        for index in 0..self.catalog.len() {
            let id = SourceId::new(index as u32);
            if successor_targets.contains(&id) {
                continue;
            }
            let next = self
                .catalog
                .get_mut(id)
                .calculate_next_emission(now, &mut self.rng, &self.limits)?;
            schedule.insert((next, id));
        }
        self.schedule = schedule;
        self.initialized = true;
        info!(
            run = %self.name,
            sources = self.catalog.len(),
            start = %self.time,
            "run initialized"
        );
        Ok(())
    }

    /// Check every successor link and detect cycles, which would cascade
    /// forever. Returns the set of sources that are successor targets;
    /// those are driven by their predecessors, not by the schedule.
    fn resolve_successors(&self) -> RunResult<HashSet<SourceId>> {
        let mut targets = HashSet::new();
        for source in self.catalog.iter() {
            let mut visited = HashSet::from([source.id()]);
            let mut current = source;
            while let Some(link) = current.successor() {
                let succ_id = self.catalog.id_of(&link.name).ok_or_else(|| {
                    RunError::UnknownSuccessor {
                        run: self.name.clone(),
                        source_name: current.name().to_string(),
                        successor: link.name.clone(),
                    }
                })?;
                targets.insert(succ_id);
                if !visited.insert(succ_id) {
                    return Err(RunError::SuccessorCycle {
                        run: self.name.clone(),
                        source_name: source.name().to_string(),
                    });
                }
                current = self.catalog.get(succ_id);
            }
        }
        Ok(targets)
    }

    /// Execute one scheduling cycle: pop the earliest source, emit it and
    /// its successor cascade, and reschedule exactly that source.
    ///
    /// Run-time "nothing to emit" situations are [`CycleOutcome::Idle`] or
    /// [`CycleOutcome::Stopped`], never errors.
    pub fn generate_primaries(
        &mut self,
        geometry: &dyn GeometryProvider,
        sink: &mut dyn ParticleSink,
    ) -> RunResult<CycleOutcome> {
        if !self.initialized {
            return Err(RunError::NotInitialized(self.name.clone()));
        }
        if self.interrupted {
            return Ok(self.clean_stop("interrupted"));
        }

        let Some((next, id)) = self.schedule.pop_first() else {
            return Ok(self.clean_stop("no scheduled source"));
        };

        if !next.is_finite() {
            self.schedule.insert((next, id));
            return Ok(self.clean_stop("all sources exhausted"));
        }
        if self
            .sky
            .stop_time()
            .is_some_and(|stop| next > stop)
        {
            self.schedule.insert((next, id));
            return Ok(self.clean_stop("end of sky orientation track"));
        }

        self.time = next;
        if self.stop_reached() {
            self.schedule.insert((next, id));
            info!(run = %self.name, time = %self.time, "stop condition reached");
            return Ok(CycleOutcome::Stopped);
        }

        let outcome = self.emit_cascade(id, geometry, sink)?;
        if matches!(outcome, CycleOutcome::Emitted(_)) {
            self.stats.record_event();
        }

        // Erase-then-reinsert: only the popped source's key changes; every
        // other source keeps its scheduled time.
        let now = self.time;
        let rescheduled = {
            let source = self.catalog.get_mut(id);
            match source.calculate_next_emission(now, &mut self.rng, &self.limits) {
                Ok(t) => t,
                Err(SourceError::SamplingExhausted { what, attempts, .. }) => {
                    warn!(
                        source = source.name(),
                        what, attempts, "sampling exhausted; deactivating"
                    );
                    source.deactivate();
                    SimTime::FAR_FUTURE
                }
                Err(err) => return Err(err.into()),
            }
        };
        self.schedule.insert((rescheduled, id));
        Ok(outcome)
    }

    /// Emit the scheduled source and walk its successor chain atomically:
    /// every link emits at the same instant, in link order.
    fn emit_cascade(
        &mut self,
        id: SourceId,
        geometry: &dyn GeometryProvider,
        sink: &mut dyn ParticleSink,
    ) -> RunResult<CycleOutcome> {
        let now = self.time;
        let first = {
            let source = self.catalog.get_mut(id);
            match source.generate(now, &mut self.rng, geometry, &self.limits) {
                Ok(first) => first,
                Err(SourceError::SamplingExhausted { what, attempts, .. }) => {
                    warn!(
                        source = source.name(),
                        what, attempts, "sampling exhausted; deactivating"
                    );
                    source.deactivate();
                    None
                }
                Err(err) => return Err(err.into()),
            }
        };
        let Some(first) = first else {
            return Ok(CycleOutcome::Idle);
        };

        let mut emitted = 0_usize;
        let mut current_id = id;
        let mut current: Primary = first;
        loop {
            sink.accept(current.time, self.catalog.get(current_id).name(), &current);
            self.stats.record(current_id);
            emitted += 1;

            let Some(link) = self.catalog.get(current_id).successor().cloned() else {
                break;
            };
            // Checked at initialization; links cannot dangle afterwards.
            let succ_id = self.catalog.id_of(&link.name).ok_or_else(|| {
                RunError::UnknownSuccessor {
                    run: self.name.clone(),
                    source_name: self.catalog.get(current_id).name().to_string(),
                    successor: link.name.clone(),
                }
            })?;
            let next = {
                let successor = self.catalog.get_mut(succ_id);
                successor.generate_successor(
                    &current,
                    &link,
                    &mut self.rng,
                    geometry,
                    &self.limits,
                )?
            };
            match next {
                Some(primary) => {
                    current_id = succ_id;
                    current = primary;
                }
                None => break,
            }
        }
        debug!(run = %self.name, time = %now, emitted, "cycle emitted");
        Ok(CycleOutcome::Emitted(emitted))
    }

    /// Append a delayed decay observed during transport to the per-volume
    /// build-up queue (created on first use as `<volume>.delayed`), and
    /// mark one pending skip on the matching activation source so the
    /// decay is not counted twice.
    pub fn register_delayed_decay(&mut self, entry: EventListEntry) -> RunResult<()> {
        if !self.initialized {
            return Err(RunError::NotInitialized(self.name.clone()));
        }
        let queue_name = format!("{}.delayed", entry.volume);
        let queue_id = match self.catalog.id_of(&queue_name) {
            Some(id) => id,
            None => {
                let id = SourceId::new(self.catalog.len() as u32);
                let source = Source::delayed_queue(queue_name.clone(), id, entry.kind);
                self.catalog.insert(&self.name, source)?;
                debug!(run = %self.name, queue = %queue_name, "created build-up queue");
                id
            }
        };

        let skip_target = self
            .catalog
            .iter()
            .find(|s| {
                s.beam().is_activation()
                    && s.beam().volume_name() == Some(entry.volume.as_str())
                    && s.kind() == Some(entry.kind)
            })
            .map(Source::id);

        let old_key = (self.catalog.get(queue_id).next_emission(), queue_id);
        self.schedule.remove(&old_key);
        self.catalog.get_mut(queue_id).push_event(entry);
        let next = self
            .catalog
            .get_mut(queue_id)
            .calculate_next_emission(self.time, &mut self.rng, &self.limits)?;
        self.schedule.insert((next, queue_id));

        match skip_target {
            Some(id) => self.catalog.get_mut(id).add_skip(),
            None => warn!(
                run = %self.name,
                queue = %queue_name,
                "delayed decay without a matching activation source"
            ),
        }
        Ok(())
    }

    fn stop_reached(&self) -> bool {
        match self.stop {
            StopCondition::ByTime(secs) => self.time.as_secs() >= secs,
            StopCondition::ByEvents(n) => self.stats.events() >= n,
            StopCondition::ByTriggers(n) => self.stats.triggers() >= n,
        }
    }

    /// Convert to `ByEvents` at the reached count and stop cleanly.
    fn clean_stop(&mut self, reason: &str) -> CycleOutcome {
        info!(
            run = %self.name,
            time = %self.time,
            events = self.stats.events(),
            reason,
            "run stopped"
        );
        self.stop = StopCondition::ByEvents(self.stats.events());
        CycleOutcome::Stopped
    }
}
