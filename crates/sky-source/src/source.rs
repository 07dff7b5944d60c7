use glam::DVec3;
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};
use sky_core::{
    GeometryProvider, ParticleKind, ParticleSpec, PhysicsProvider, SimTime,
};
use tracing::debug;

use crate::beam::BeamModel;
use crate::error::{SourceError, SourceResult};
use crate::event_list::{EventList, EventListEntry};
use crate::polarization::Polarization;
use crate::spectral::SpectralModel;

/// Natural log of 2, relating half-life and decay constant.
const LN_2: f64 = std::f64::consts::LN_2;

/// Stable identity of a source within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(u32);

impl SourceId {
    /// Wrap a raw index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw index, usable against the run's source table.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bounds on the bounded sampling loops of a source.
#[derive(Debug, Clone, Copy)]
pub struct SamplingLimits {
    /// Attempts granted to energy acceptance-rejection loops.
    pub max_energy_attempts: usize,
    /// Candidate steps granted to light-curve thinning.
    pub max_thinning_steps: usize,
    /// Attempts granted to geometric rejection loops (tube placement,
    /// truncated gaussian cones).
    pub max_beam_attempts: usize,
}

impl Default for SamplingLimits {
    fn default() -> Self {
        Self {
            max_energy_attempts: 1_000_000,
            max_thinning_steps: 10_000,
            max_beam_attempts: 1_000_000,
        }
    }
}

/// The timing family of a source: when emissions happen.
#[derive(Debug, Clone)]
pub enum TimingModel {
    /// Homogeneous Poisson process at the source's rate.
    Stationary,
    /// Inhomogeneous Poisson process modulated by a light curve.
    LightCurveDriven(sky_core::LightCurve),
    /// A fixed number of radioactive decays of the source's isotope.
    IsotopeCount {
        /// Decays left to emit.
        remaining: u64,
    },
    /// Emissions read verbatim from a predetermined queue.
    EventListDriven(EventList),
}

/// Link from a source to the one re-scheduled after each of its emissions.
#[derive(Debug, Clone)]
pub struct SuccessorLink {
    /// Name of the successor source.
    pub name: String,
    /// Whether the successor emits from the predecessor's vertex.
    pub inherit_position: bool,
    /// Whether the successor's direction is the reversed predecessor
    /// direction (back-to-back emission).
    pub invert_direction: bool,
}

/// One particle handed to transport.
#[derive(Debug, Clone)]
pub struct Primary {
    /// Absolute emission time.
    pub time: SimTime,
    /// The emitting source.
    pub source: SourceId,
    /// Resolved particle kind.
    pub kind: ParticleKind,
    /// Start position in cm.
    pub position: DVec3,
    /// Unit momentum direction.
    pub direction: DVec3,
    /// Unit polarization vector.
    pub polarization: DVec3,
    /// Kinetic energy in keV.
    pub energy_kev: f64,
}

/// One particle emitter with a particle kind, spectrum, beam, polarization
/// and timing family.
///
/// A source is configured with the builder-style `with_*` methods, frozen by
/// [`Source::finalize`] once the run's collaborators are known, and then
/// driven by [`Source::calculate_next_emission`] and [`Source::generate`].
#[derive(Debug, Clone)]
pub struct Source {
    id: SourceId,
    name: String,
    particle: ParticleSpec,
    kind: Option<ParticleKind>,
    half_life: Option<f64>,
    spectral: SpectralModel,
    beam: BeamModel,
    polarization: Polarization,
    timing: TimingModel,
    /// Configured intensity; per cm^2 for far-field beams.
    flux: f64,
    /// Absolute emission rate in 1/s, fixed at finalization.
    rate: f64,
    successor: Option<SuccessorLink>,
    pending_skips: u64,
    next_emission: SimTime,
    active: bool,
    finalized: bool,
}

impl Source {
    /// A new gamma point source at the origin with unit flux. Every aspect
    /// can be replaced before finalization.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SourceId::new(0),
            name: name.into(),
            particle: ParticleSpec::named("gamma"),
            kind: None,
            half_life: None,
            spectral: SpectralModel::Mono { energy_kev: 511.0 },
            beam: BeamModel::Point {
                position: DVec3::ZERO,
            },
            polarization: Polarization::Unpolarized,
            timing: TimingModel::Stationary,
            flux: 1.0,
            rate: 0.0,
            successor: None,
            pending_skips: 0,
            next_emission: SimTime::ZERO,
            active: true,
            finalized: false,
        }
    }

    /// An empty event-list source for delayed decays registered during
    /// transport. Already resolved and finalized: every queued entry
    /// carries its own kind and vertex, so no collaborator is consulted.
    pub fn delayed_queue(name: impl Into<String>, id: SourceId, kind: ParticleKind) -> Self {
        let mut source = Self::new(name);
        source.id = id;
        source.kind = Some(kind);
        source.timing = TimingModel::EventListDriven(EventList::new());
        source.flux = 0.0;
        source.finalized = true;
        source
    }

    /// Set the emitted particle.
    #[must_use]
    pub fn with_particle(mut self, particle: ParticleSpec) -> Self {
        self.particle = particle;
        self
    }

    /// Set the spectral family.
    #[must_use]
    pub fn with_spectrum(mut self, spectral: SpectralModel) -> Self {
        self.spectral = spectral;
        self
    }

    /// Set the beam family.
    #[must_use]
    pub fn with_beam(mut self, beam: BeamModel) -> Self {
        self.beam = beam;
        self
    }

    /// Set the polarization behavior.
    #[must_use]
    pub fn with_polarization(mut self, polarization: Polarization) -> Self {
        self.polarization = polarization;
        self
    }

    /// Set the intensity: particles/s for near-field beams, particles
    /// per cm^2/s for far-field beams.
    #[must_use]
    pub fn with_flux(mut self, flux: f64) -> Self {
        self.flux = flux;
        self
    }

    /// Modulate the emission rate with a light curve.
    #[must_use]
    pub fn with_light_curve(mut self, curve: sky_core::LightCurve) -> Self {
        self.timing = TimingModel::LightCurveDriven(curve);
        self
    }

    /// Emit exactly `count` radioactive decays instead of a steady rate.
    #[must_use]
    pub fn with_isotope_count(mut self, count: u64) -> Self {
        self.timing = TimingModel::IsotopeCount { remaining: count };
        self
    }

    /// Replay a predetermined emission queue.
    #[must_use]
    pub fn with_event_list(mut self, list: EventList) -> Self {
        self.timing = TimingModel::EventListDriven(list);
        self
    }

    /// Chain another source to fire after each emission of this one.
    #[must_use]
    pub fn with_successor(mut self, link: SuccessorLink) -> Self {
        self.successor = Some(link);
        self
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source identity within the run.
    pub const fn id(&self) -> SourceId {
        self.id
    }

    /// Resolved particle kind; available after finalization.
    pub const fn kind(&self) -> Option<ParticleKind> {
        self.kind
    }

    /// Absolute emission rate in 1/s, fixed at finalization.
    pub const fn rate(&self) -> f64 {
        self.rate
    }

    /// The beam family.
    pub const fn beam(&self) -> &BeamModel {
        &self.beam
    }

    /// The successor link, if any.
    pub const fn successor(&self) -> Option<&SuccessorLink> {
        self.successor.as_ref()
    }

    /// Whether the source can still emit.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Permanently stop the source.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.next_emission = SimTime::FAR_FUTURE;
    }

    /// The currently scheduled emission time.
    pub const fn next_emission(&self) -> SimTime {
        self.next_emission
    }

    /// Queue a skip: the next scheduled emission is consumed without
    /// producing a particle. Used when a delayed decay is detected during
    /// transport and handed to the build-up queue instead.
    pub fn add_skip(&mut self) {
        self.pending_skips += 1;
    }

    /// Insert a delayed decay into this source's event queue, reviving an
    /// exhausted queue. Only meaningful for event-list-driven sources.
    pub fn push_event(&mut self, entry: EventListEntry) {
        if let TimingModel::EventListDriven(list) = &mut self.timing {
            list.insert(entry);
            self.active = true;
        }
    }

    /// Resolve collaborator-dependent state and validate the full
    /// configuration. Must be called exactly once before sampling.
    pub fn finalize(
        &mut self,
        id: SourceId,
        physics: &dyn PhysicsProvider,
        geometry: &dyn GeometryProvider,
    ) -> SourceResult<()> {
        self.id = id;
        let kind = physics.resolve(&self.particle)?;
        self.kind = Some(kind);
        self.half_life = physics.half_life(kind);

        self.spectral.validate(&self.name)?;
        self.beam.validate(&self.name, geometry)?;

        // The joint energy-beam table couples the two families; each half
        // alone leaves either the energy or the direction unspecified.
        let table_beam = matches!(self.beam, BeamModel::FarFieldTable(_));
        let joint_spectrum = matches!(self.spectral, SpectralModel::JointWithBeam);
        if table_beam != joint_spectrum {
            return Err(SourceError::DegenerateBeam {
                name: self.name.clone(),
                reason: "energy-beam table beams require the joint spectral setting".into(),
            });
        }

        if let TimingModel::IsotopeCount { .. } = self.timing {
            if self.half_life.is_none() {
                return Err(SourceError::NoHalfLife {
                    name: self.name.clone(),
                    kind: kind.to_string(),
                });
            }
        }

        let area = geometry.start_area();
        let mut scale = 1.0;
        if let Some((upgraded, flux_scale)) =
            self.beam.upgrade_restricted_point(&self.name, &area)?
        {
            debug!(
                source = %self.name,
                half_angle_fraction = flux_scale,
                "upgraded restricted point to cone"
            );
            self.beam = upgraded;
            scale = flux_scale;
        }

        self.rate = self.flux * scale * self.beam.area_factor(&area);
        let needs_rate = matches!(
            self.timing,
            TimingModel::Stationary | TimingModel::LightCurveDriven(_)
        );
        if needs_rate && self.rate <= 0.0 {
            return Err(SourceError::NonPositiveFlux(self.name.clone()));
        }
        self.finalized = true;
        Ok(())
    }

    /// Draw the next emission time after `now`, update the internal
    /// schedule and return it.
    ///
    /// Returns [`SimTime::FAR_FUTURE`] once a finite source (event list,
    /// isotope count, bounded light curve) is exhausted; the source
    /// deactivates itself in that case.
    pub fn calculate_next_emission(
        &mut self,
        now: SimTime,
        rng: &mut StdRng,
        limits: &SamplingLimits,
    ) -> SourceResult<SimTime> {
        if !self.finalized {
            return Err(SourceError::UnresolvedParticle(self.name.clone()));
        }
        if !self.active {
            self.next_emission = SimTime::FAR_FUTURE;
            return Ok(self.next_emission);
        }
        let next = match &mut self.timing {
            TimingModel::Stationary => {
                let exp = exponential(self.rate, &self.name)?;
                Some(now + exp.sample(rng))
            }
            TimingModel::LightCurveDriven(curve) => {
                // Thinning against the constant envelope rate * max_rate:
                // candidates arrive at the envelope rate and survive with
                // probability rate(t) / max_rate, which leaves exactly the
                // modulated inhomogeneous process.
                let envelope = self.rate * curve.max_rate();
                let exp = exponential(envelope, &self.name)?;
                let mut t = now.as_secs();
                if !curve.is_looping() && t < curve.start() {
                    t = curve.start();
                }
                let mut accepted = None;
                for _ in 0..limits.max_thinning_steps {
                    t += exp.sample(rng);
                    if !curve.is_looping() && t >= curve.end() {
                        break;
                    }
                    if rng.random::<f64>() * curve.max_rate() <= curve.rate(t) {
                        accepted = Some(SimTime::from_secs(t));
                        break;
                    }
                }
                match accepted {
                    Some(t) => Some(t),
                    None if !curve.is_looping() => None,
                    None => {
                        return Err(SourceError::SamplingExhausted {
                            name: self.name.clone(),
                            what: "light-curve thinning".into(),
                            attempts: limits.max_thinning_steps,
                        });
                    }
                }
            }
            TimingModel::IsotopeCount { remaining } => {
                if *remaining == 0 {
                    None
                } else {
                    // Half-life checked at finalization.
                    let half_life = self.half_life.unwrap_or(f64::INFINITY);
                    // Waiting time for the first of `remaining` decays,
                    // each with decay constant ln2 / half-life.
                    let u: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
                    let dt = -u.ln() / LN_2 * half_life / *remaining as f64;
                    Some(now + dt)
                }
            }
            TimingModel::EventListDriven(list) => list.next_time(),
        };
        self.next_emission = match next {
            Some(t) => t.max(now),
            None => {
                debug!(source = %self.name, "source exhausted");
                self.deactivate();
                SimTime::FAR_FUTURE
            }
        };
        Ok(self.next_emission)
    }

    /// Emit the particle scheduled at `now`.
    ///
    /// Returns `Ok(None)` when the scheduled emission is consumed by a
    /// pending skip; the caller still reschedules the source afterwards.
    pub fn generate(
        &mut self,
        now: SimTime,
        rng: &mut StdRng,
        geometry: &dyn GeometryProvider,
        limits: &SamplingLimits,
    ) -> SourceResult<Option<Primary>> {
        let kind = self
            .kind
            .ok_or_else(|| SourceError::UnresolvedParticle(self.name.clone()))?;

        if let TimingModel::IsotopeCount { remaining } = &mut self.timing {
            *remaining = remaining.saturating_sub(1);
        }
        let list_entry = match &mut self.timing {
            TimingModel::EventListDriven(list) => match list.pop() {
                Some(entry) => Some(entry),
                // A drained queue has nothing to emit; never substitute a
                // freshly sampled particle for a missing entry.
                None => {
                    debug!(source = %self.name, "event queue drained");
                    return Ok(None);
                }
            },
            _ => None,
        };

        if self.pending_skips > 0 {
            self.pending_skips -= 1;
            debug!(source = %self.name, left = self.pending_skips, "skipped emission");
            return Ok(None);
        }

        if let Some(entry) = list_entry {
            return Ok(Some(Primary {
                time: entry.time,
                source: self.id,
                kind: entry.kind,
                position: entry.position,
                direction: entry.direction,
                polarization: entry.polarization,
                energy_kev: entry.energy_kev,
            }));
        }

        let sample = self
            .beam
            .sample(rng, &self.name, geometry, limits.max_beam_attempts)?;
        let energy_kev = match sample.energy_kev {
            Some(e) => e,
            None => self
                .spectral
                .sample(rng, &self.name, limits.max_energy_attempts)?,
        };
        let polarization = self.polarization.sample(rng, sample.direction);
        Ok(Some(Primary {
            time: now,
            source: self.id,
            kind,
            position: sample.position,
            direction: sample.direction,
            polarization,
            energy_kev,
        }))
    }

    /// Emit a successor particle inheriting vertex state from `parent` as
    /// the successor link dictates.
    pub fn generate_successor(
        &mut self,
        parent: &Primary,
        link: &SuccessorLink,
        rng: &mut StdRng,
        geometry: &dyn GeometryProvider,
        limits: &SamplingLimits,
    ) -> SourceResult<Option<Primary>> {
        let Some(mut primary) = self.generate(parent.time, rng, geometry, limits)? else {
            return Ok(None);
        };
        if link.inherit_position {
            primary.position = parent.position;
        }
        if link.invert_direction {
            primary.direction = -parent.direction;
            primary.polarization = self.polarization.sample(rng, primary.direction);
        }
        Ok(Some(primary))
    }
}

fn exponential(rate: f64, name: &str) -> SourceResult<Exp<f64>> {
    Exp::new(rate).map_err(|_| SourceError::NonPositiveFlux(name.to_string()))
}
