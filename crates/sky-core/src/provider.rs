use glam::DVec3;
use rand::rngs::StdRng;

use crate::error::CoreResult;
use crate::particle::{ParticleKind, ParticleSpec};

/// The declared bounding start area surrounding the detector.
///
/// Far-field primaries start on this surface; its shape affects both the
/// sampled start point and the area factor that converts a per-area flux
/// into an absolute emission rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartArea {
    /// A sphere centered at `center` with radius `radius` (cm).
    Sphere {
        /// Center of the sphere.
        center: DVec3,
        /// Radius in cm.
        radius: f64,
    },
    /// An upright cylinder on the z axis through `center`.
    Tube {
        /// Center of the tube.
        center: DVec3,
        /// Radius in cm.
        radius: f64,
        /// Half-height in cm.
        half_height: f64,
    },
}

impl StartArea {
    /// Center of the area.
    pub const fn center(&self) -> DVec3 {
        match self {
            Self::Sphere { center, .. } | Self::Tube { center, .. } => *center,
        }
    }

    /// Radius of the smallest sphere enclosing the area.
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius, .. } => *radius,
            Self::Tube {
                radius,
                half_height,
                ..
            } => radius.hypot(*half_height),
        }
    }

    /// Projected area (cm^2) presented to a far-field beam arriving along
    /// `direction`. For a sphere this is direction-independent.
    pub fn projected_area(&self, direction: DVec3) -> f64 {
        match self {
            Self::Sphere { radius, .. } => std::f64::consts::PI * radius * radius,
            Self::Tube {
                radius,
                half_height,
                ..
            } => {
                let cos_z = direction.normalize().z.abs();
                let sin_z = (1.0 - cos_z * cos_z).max(0.0).sqrt();
                std::f64::consts::PI * radius * radius * cos_z
                    + 2.0 * radius * 2.0 * half_height * sin_z
            }
        }
    }
}

/// The physics collaborator, consumed at run initialization.
///
/// Resolves deferred particle specifications and supplies nuclear data.
/// Random sampling is deliberately not part of this trait: samplers are
/// generic over [`rand::Rng`] and the run owns one seeded generator.
pub trait PhysicsProvider {
    /// Resolve a configured particle specification to a concrete kind.
    fn resolve(&self, spec: &ParticleSpec) -> CoreResult<ParticleKind>;

    /// Half-life in seconds, for kinds that decay.
    fn half_life(&self, kind: ParticleKind) -> Option<f64>;
}

/// The geometry collaborator, consumed during sampling.
pub trait GeometryProvider {
    /// A uniformly distributed random point inside the named volume.
    fn random_point_in_volume(&self, volume: &str, rng: &mut StdRng) -> CoreResult<DVec3>;

    /// Whether a volume of this name exists.
    fn has_volume(&self, volume: &str) -> bool;

    /// The declared start area bounding the detector.
    fn start_area(&self) -> StartArea;
}
