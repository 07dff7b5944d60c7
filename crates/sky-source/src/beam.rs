use glam::DVec3;
use rand::Rng;
use rand::rngs::StdRng;
use sky_core::{CoreError, GeometryProvider, StartArea, Table1D, math};

use crate::error::{SourceError, SourceResult};
use crate::table3::EnergyBeamTable;

/// Angular profile of a directed cone emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConeProfile {
    /// Uniform over the spherical cap.
    Flat,
    /// Gaussian in the opening angle with the given sigma (radians),
    /// truncated at the cone's half-angle.
    Gaussian {
        /// Angular sigma in radians.
        sigma: f64,
    },
}

/// A 2-D beam-spot intensity map in the plane perpendicular to a beam axis.
#[derive(Debug, Clone)]
pub struct ProfileMap {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    cdf: Vec<f64>,
    total: f64,
}

impl ProfileMap {
    /// Build a map from cell edges and per-cell weights (x-major order).
    pub fn new(
        name: impl Into<String>,
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
        weights: &[f64],
    ) -> SourceResult<Self> {
        let name = name.into();
        let nx = x_edges.len().saturating_sub(1);
        let ny = y_edges.len().saturating_sub(1);
        if nx == 0 || ny == 0 || weights.len() != nx * ny {
            return Err(CoreError::EmptyTable(name).into());
        }
        for (edges, label) in [(&x_edges, "x"), (&y_edges, "y")] {
            for (row, pair) in edges.windows(2).enumerate() {
                if pair[0] >= pair[1] {
                    return Err(CoreError::NonMonotonicTable {
                        name: format!("{name}:{label}"),
                        row: row + 1,
                    }
                    .into());
                }
            }
        }
        let mut cdf = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for i in 0..nx {
            let dx = x_edges[i + 1] - x_edges[i];
            for j in 0..ny {
                let w = weights[i * ny + j];
                if w < 0.0 {
                    return Err(CoreError::NegativeValue {
                        name,
                        row: i * ny + j,
                    }
                    .into());
                }
                total += w * dx * (y_edges[j + 1] - y_edges[j]);
                cdf.push(total);
            }
        }
        if total <= 0.0 {
            return Err(CoreError::ZeroIntegral(name).into());
        }
        Ok(Self {
            x_edges,
            y_edges,
            cdf,
            total,
        })
    }

    /// Draw an `(x, y)` offset distributed according to the map.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let target = rng.random::<f64>() * self.total;
        let cell = self
            .cdf
            .partition_point(|c| *c < target)
            .min(self.cdf.len() - 1);
        let ny = self.y_edges.len() - 1;
        let i = cell / ny;
        let j = cell % ny;
        (
            rng.random_range(self.x_edges[i]..self.x_edges[i + 1]),
            rng.random_range(self.y_edges[j]..self.y_edges[j + 1]),
        )
    }
}

/// One sampled start vertex.
///
/// `energy_kev` is `Some` only for the joint energy-beam table, where the
/// energy cannot be drawn independently of the direction.
#[derive(Debug, Clone, Copy)]
pub struct BeamSample {
    /// Start position in cm.
    pub position: DVec3,
    /// Unit propagation direction.
    pub direction: DVec3,
    /// Jointly sampled energy, for table beams.
    pub energy_kev: Option<f64>,
}

/// The beam family of a source: where particles start and where they go.
///
/// Far-field beams sample a propagation direction and place the start point
/// on the declared start area; near-field beams place explicit vertices in
/// the detector frame.
#[derive(Debug, Clone)]
pub enum BeamModel {
    /// Far field: a fixed arrival direction given as zenith/azimuth radians.
    FarFieldPoint {
        /// Zenith angle of the sky position, radians.
        theta: f64,
        /// Azimuth of the sky position, radians.
        phi: f64,
    },
    /// Far field: uniform over a bounded solid-angle patch.
    FarFieldArea {
        /// Lower zenith bound, radians.
        theta_min: f64,
        /// Upper zenith bound, radians.
        theta_max: f64,
        /// Lower azimuth bound, radians.
        phi_min: f64,
        /// Upper azimuth bound, radians.
        phi_max: f64,
    },
    /// Far field: zenith distribution from a file, azimuth uniform.
    FarFieldZenith(Table1D),
    /// Far field: joint energy-direction table.
    FarFieldTable(EnergyBeamTable),
    /// Near field: a point emitting isotropically.
    Point {
        /// Emission point in cm.
        position: DVec3,
    },
    /// Near field: a point whose emission is restricted to directions that
    /// can reach the start sphere. Upgraded to a [`BeamModel::Cone`] at run
    /// initialization (with a flux rescale); sampling it directly is a
    /// setup error.
    RestrictedPoint {
        /// Emission point in cm, outside the start sphere.
        position: DVec3,
    },
    /// Near field: a directed cone.
    Cone {
        /// Apex position in cm.
        position: DVec3,
        /// Cone axis (unit).
        direction: DVec3,
        /// Half-opening angle, radians.
        half_angle: f64,
        /// Angular profile within the cone.
        profile: ConeProfile,
    },
    /// Near field: uniform along a line segment, isotropic emission.
    Line {
        /// Segment start in cm.
        from: DVec3,
        /// Segment end in cm.
        to: DVec3,
    },
    /// Near field: uniform inside an axis-aligned box, isotropic emission.
    Cuboid {
        /// Minimum corner in cm.
        min: DVec3,
        /// Maximum corner in cm.
        max: DVec3,
    },
    /// Near field: uniform inside an ellipsoid, isotropic emission.
    Ellipsoid {
        /// Center in cm.
        center: DVec3,
        /// Semi-axes in cm.
        semi_axes: DVec3,
    },
    /// Near field: an annular disk with finite thickness emitting into a
    /// cone around its normal.
    Disk {
        /// Disk center in cm.
        center: DVec3,
        /// Disk normal (unit).
        normal: DVec3,
        /// Inner radius in cm.
        inner_radius: f64,
        /// Outer radius in cm.
        outer_radius: f64,
        /// Half-thickness along the normal in cm.
        half_height: f64,
        /// Smallest emission angle from the normal, radians.
        angle_min: f64,
        /// Largest emission angle from the normal, radians.
        angle_max: f64,
        /// Angular profile of the emission cone.
        profile: ConeProfile,
    },
    /// Near field: a pencil beam along `normal` with a 1-D radial
    /// spot profile.
    RadialProfile {
        /// Beam-spot center in cm.
        center: DVec3,
        /// Beam axis (unit).
        normal: DVec3,
        /// Radial intensity profile over the spot radius.
        profile: Table1D,
    },
    /// Near field: a pencil beam along `normal` with a 2-D spot map.
    MapProfile {
        /// Beam-spot center in cm.
        center: DVec3,
        /// Beam axis (unit).
        normal: DVec3,
        /// Spot intensity map in the plane perpendicular to the axis.
        map: ProfileMap,
    },
    /// Near field: a disk illuminated from a far-field direction; sampled
    /// surface points are re-projected onto the start sphere.
    IlluminatedDisk {
        /// Disk center in cm.
        center: DVec3,
        /// Disk normal (unit).
        normal: DVec3,
        /// Disk radius in cm.
        radius: f64,
        /// Zenith of the illuminating sky position, radians.
        theta: f64,
        /// Azimuth of the illuminating sky position, radians.
        phi: f64,
    },
    /// Near field: a square illuminated from a far-field direction,
    /// re-projected onto the start sphere.
    IlluminatedSquare {
        /// Square center in cm.
        center: DVec3,
        /// Square normal (unit).
        normal: DVec3,
        /// Half of the square's edge length in cm.
        half_width: f64,
        /// Zenith of the illuminating sky position, radians.
        theta: f64,
        /// Azimuth of the illuminating sky position, radians.
        phi: f64,
    },
    /// Near field: uniform inside a named geometry volume, isotropic.
    Volume {
        /// Name of the geometry volume.
        volume: String,
    },
    /// Near field: activation emission inside a named volume; position like
    /// [`BeamModel::Volume`], timing by isotope count, and the target of
    /// delayed-decay skip bookkeeping.
    Activation {
        /// Name of the geometry volume.
        volume: String,
    },
}

impl BeamModel {
    /// True for beams whose particles arrive from infinity.
    pub const fn is_far_field(&self) -> bool {
        matches!(
            self,
            Self::FarFieldPoint { .. }
                | Self::FarFieldArea { .. }
                | Self::FarFieldZenith(_)
                | Self::FarFieldTable(_)
        )
    }

    /// The geometry volume this beam emits from, if any.
    pub fn volume_name(&self) -> Option<&str> {
        match self {
            Self::Volume { volume } | Self::Activation { volume } => Some(volume),
            _ => None,
        }
    }

    /// True for activation beams (delayed-decay skip targets).
    pub const fn is_activation(&self) -> bool {
        matches!(self, Self::Activation { .. })
    }

    /// Validate the configuration at setup time.
    pub fn validate(&self, name: &str, geometry: &dyn GeometryProvider) -> SourceResult<()> {
        let degenerate = |reason: &str| SourceError::DegenerateBeam {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        match self {
            Self::FarFieldPoint { .. }
            | Self::FarFieldZenith(_)
            | Self::FarFieldTable(_)
            | Self::Point { .. }
            | Self::RestrictedPoint { .. } => {}
            Self::FarFieldArea {
                theta_min,
                theta_max,
                phi_min,
                phi_max,
            } => {
                if theta_min >= theta_max || phi_min >= phi_max {
                    return Err(degenerate("empty solid-angle patch"));
                }
            }
            Self::Cone { half_angle, .. } => {
                if *half_angle <= 0.0 || *half_angle > std::f64::consts::PI {
                    return Err(degenerate("cone half-angle outside (0, pi]"));
                }
            }
            Self::Line { from, to } => {
                if (*to - *from).length_squared() < f64::EPSILON {
                    return Err(degenerate("zero-length line"));
                }
            }
            Self::Cuboid { min, max } => {
                if min.x >= max.x || min.y >= max.y || min.z >= max.z {
                    return Err(degenerate("box with non-positive extent"));
                }
            }
            Self::Ellipsoid { semi_axes, .. } => {
                if semi_axes.min_element() <= 0.0 {
                    return Err(degenerate("ellipsoid with non-positive semi-axis"));
                }
            }
            Self::Disk {
                inner_radius,
                outer_radius,
                angle_min,
                angle_max,
                ..
            } => {
                if *inner_radius < 0.0 || *outer_radius <= *inner_radius {
                    return Err(degenerate("disk with empty radial range"));
                }
                if *angle_min < 0.0 || *angle_max <= *angle_min {
                    return Err(degenerate("disk with empty angular range"));
                }
            }
            Self::RadialProfile { .. } | Self::MapProfile { .. } => {}
            Self::IlluminatedDisk { radius, .. } => {
                if *radius <= 0.0 {
                    return Err(degenerate("illuminated disk with non-positive radius"));
                }
            }
            Self::IlluminatedSquare { half_width, .. } => {
                if *half_width <= 0.0 {
                    return Err(degenerate("illuminated square with non-positive width"));
                }
            }
            Self::Volume { volume } | Self::Activation { volume } => {
                if !geometry.has_volume(volume) {
                    return Err(CoreError::UnknownVolume(volume.clone()).into());
                }
            }
        }
        Ok(())
    }

    /// Start-area factor (cm^2) converting a far-field per-area flux into
    /// an absolute rate. Near-field beams have no area factor (1.0).
    pub fn area_factor(&self, area: &StartArea) -> f64 {
        match self {
            Self::FarFieldPoint { theta, phi } => {
                area.projected_area(-math::direction_from_angles(*theta, *phi))
            }
            Self::FarFieldArea {
                theta_min,
                theta_max,
                ..
            } => mean_projected_area(area, *theta_min, *theta_max),
            Self::FarFieldZenith(table) => {
                mean_projected_area(area, table.x_min(), table.x_max())
            }
            Self::FarFieldTable(_) => mean_projected_area(area, 0.0, std::f64::consts::PI),
            _ => 1.0,
        }
    }

    /// Draw a start vertex.
    ///
    /// Fallible only through bounded rejection loops and the geometry
    /// collaborator; "no data" situations do not exist at the beam level.
    pub fn sample(
        &self,
        rng: &mut StdRng,
        name: &str,
        geometry: &dyn GeometryProvider,
        max_attempts: usize,
    ) -> SourceResult<BeamSample> {
        let area = geometry.start_area();
        match self {
            Self::FarFieldPoint { theta, phi } => {
                let dir = -math::direction_from_angles(*theta, *phi);
                let position = place_on_start_area(rng, name, &area, dir, max_attempts)?;
                Ok(vertex(position, dir))
            }
            Self::FarFieldArea {
                theta_min,
                theta_max,
                phi_min,
                phi_max,
            } => {
                // Inverse-cosine sampling keeps the patch uniform on the
                // sphere; sampling theta directly would crowd the pole.
                let cos_theta = rng.random_range(theta_max.cos()..=theta_min.cos());
                let phi = rng.random_range(*phi_min..*phi_max);
                let dir = -math::direction_from_angles(cos_theta.acos(), phi);
                let position = place_on_start_area(rng, name, &area, dir, max_attempts)?;
                Ok(vertex(position, dir))
            }
            Self::FarFieldZenith(table) => {
                let theta = sample_zenith(rng, name, table, max_attempts)?;
                let phi = rng.random_range(0.0..std::f64::consts::TAU);
                let dir = -math::direction_from_angles(theta, phi);
                let position = place_on_start_area(rng, name, &area, dir, max_attempts)?;
                Ok(vertex(position, dir))
            }
            Self::FarFieldTable(table) => {
                let (energy, dir) = table.sample(rng);
                let position = place_on_start_area(rng, name, &area, dir, max_attempts)?;
                Ok(BeamSample {
                    position,
                    direction: dir,
                    energy_kev: Some(energy),
                })
            }
            Self::Point { position } => Ok(vertex(*position, math::isotropic_direction(rng))),
            Self::RestrictedPoint { .. } => Err(SourceError::DegenerateBeam {
                name: name.to_string(),
                reason: "restricted point was not upgraded at initialization".into(),
            }),
            Self::Cone {
                position,
                direction,
                half_angle,
                profile,
            } => {
                let dir = sample_cone(rng, name, *direction, *half_angle, *profile, max_attempts)?;
                Ok(vertex(*position, dir))
            }
            Self::Line { from, to } => {
                let position = from.lerp(*to, rng.random::<f64>());
                Ok(vertex(position, math::isotropic_direction(rng)))
            }
            Self::Cuboid { min, max } => {
                let position = DVec3::new(
                    rng.random_range(min.x..max.x),
                    rng.random_range(min.y..max.y),
                    rng.random_range(min.z..max.z),
                );
                Ok(vertex(position, math::isotropic_direction(rng)))
            }
            Self::Ellipsoid { center, semi_axes } => {
                // Uniform in the unit ball, scaled per-axis.
                let unit = math::isotropic_direction(rng) * rng.random::<f64>().cbrt();
                Ok(vertex(*center + unit * *semi_axes, math::isotropic_direction(rng)))
            }
            Self::Disk {
                center,
                normal,
                inner_radius,
                outer_radius,
                half_height,
                angle_min,
                angle_max,
                profile,
            } => {
                let r = (rng
                    .random_range(inner_radius * inner_radius..outer_radius * outer_radius))
                .sqrt();
                let phi = rng.random_range(0.0..std::f64::consts::TAU);
                let z = rng.random_range(-half_height..=*half_height);
                let frame = math::rotate_z_to(*normal);
                let position = *center + frame * DVec3::new(r * phi.cos(), r * phi.sin(), z);
                let dir = sample_annular_cone(
                    rng,
                    name,
                    *normal,
                    *angle_min,
                    *angle_max,
                    *profile,
                    max_attempts,
                )?;
                Ok(vertex(position, dir))
            }
            Self::RadialProfile {
                center,
                normal,
                profile,
            } => {
                let r = profile.sample(rng);
                let phi = rng.random_range(0.0..std::f64::consts::TAU);
                let frame = math::rotate_z_to(*normal);
                let position = *center + frame * DVec3::new(r * phi.cos(), r * phi.sin(), 0.0);
                Ok(vertex(position, normal.normalize()))
            }
            Self::MapProfile {
                center,
                normal,
                map,
            } => {
                let (x, y) = map.sample(rng);
                let frame = math::rotate_z_to(*normal);
                let position = *center + frame * DVec3::new(x, y, 0.0);
                Ok(vertex(position, normal.normalize()))
            }
            Self::IlluminatedDisk {
                center,
                normal,
                radius,
                theta,
                phi,
            } => {
                let surface = *center + math::point_on_disk(rng, *normal, *radius);
                illuminated_vertex(name, &area, surface, *theta, *phi)
            }
            Self::IlluminatedSquare {
                center,
                normal,
                half_width,
                theta,
                phi,
            } => {
                let u = math::any_orthogonal(*normal);
                let v = normal.normalize().cross(u);
                let surface = *center
                    + u * rng.random_range(-half_width..=*half_width)
                    + v * rng.random_range(-half_width..=*half_width);
                illuminated_vertex(name, &area, surface, *theta, *phi)
            }
            Self::Volume { volume } | Self::Activation { volume } => {
                let position = geometry.random_point_in_volume(volume, rng)?;
                Ok(vertex(position, math::isotropic_direction(rng)))
            }
        }
    }

    /// Upgrade a restricted point outside the start sphere to a cone beam
    /// toward the sphere center (Scenario: half-angle `asin(r/d)`).
    ///
    /// Returns the replacement beam and the factor by which the configured
    /// flux must be rescaled (the covered solid-angle fraction).
    pub fn upgrade_restricted_point(
        &self,
        name: &str,
        area: &StartArea,
    ) -> SourceResult<Option<(Self, f64)>> {
        let Self::RestrictedPoint { position } = self else {
            return Ok(None);
        };
        let to_center = area.center() - *position;
        let distance = to_center.length();
        let radius = area.bounding_radius();
        if distance <= radius {
            return Err(SourceError::RestrictedPointInsideStartArea {
                name: name.to_string(),
                distance,
                radius,
            });
        }
        let half_angle = (radius / distance).asin();
        let flux_scale = (1.0 - half_angle.cos()) / 2.0;
        Ok(Some((
            Self::Cone {
                position: *position,
                direction: to_center / distance,
                half_angle,
                profile: ConeProfile::Flat,
            },
            flux_scale,
        )))
    }
}

const fn vertex(position: DVec3, direction: DVec3) -> BeamSample {
    BeamSample {
        position,
        direction,
        energy_kev: None,
    }
}

/// Mean projected start area over a zenith range, assuming an isotropic
/// azimuth. Cheap numeric average; exact for spheres since their projection
/// is direction-independent.
fn mean_projected_area(area: &StartArea, theta_min: f64, theta_max: f64) -> f64 {
    const STEPS: usize = 64;
    let mut sum = 0.0;
    let mut weight = 0.0;
    for i in 0..STEPS {
        let theta = theta_min
            + (theta_max - theta_min) * ((i as f64 + 0.5) / STEPS as f64);
        let w = theta.sin();
        sum += w * area.projected_area(-math::direction_from_angles(theta, 0.0));
        weight += w;
    }
    if weight > 0.0 { sum / weight } else { 0.0 }
}

/// Place a far-field start point on the start area for propagation
/// direction `dir`.
fn place_on_start_area(
    rng: &mut StdRng,
    name: &str,
    area: &StartArea,
    dir: DVec3,
    max_attempts: usize,
) -> SourceResult<DVec3> {
    match *area {
        StartArea::Sphere { center, radius } => {
            let offset = math::point_on_disk(rng, dir, radius);
            let back = (radius * radius - offset.length_squared()).max(0.0).sqrt();
            Ok(center + offset - dir * back)
        }
        StartArea::Tube {
            center,
            radius,
            half_height,
        } => {
            let bounding = radius.hypot(half_height);
            for _ in 0..max_attempts {
                let offset = math::point_on_disk(rng, dir, bounding);
                let origin = center + offset - dir * (2.0 * bounding);
                if let Some(hit) =
                    ray_cylinder_intersection(origin, dir, center, radius, half_height)
                {
                    return Ok(hit);
                }
            }
            Err(SourceError::SamplingExhausted {
                name: name.to_string(),
                what: "start-tube placement".into(),
                attempts: max_attempts,
            })
        }
    }
}

/// First intersection of the ray `origin + t*dir` (t > 0) with an upright
/// finite cylinder, checking both the side wall and the end caps.
fn ray_cylinder_intersection(
    origin: DVec3,
    dir: DVec3,
    center: DVec3,
    radius: f64,
    half_height: f64,
) -> Option<DVec3> {
    let o = origin - center;
    let mut best: Option<f64> = None;
    let mut consider = |t: f64| {
        if t > 0.0 && best.is_none_or(|b| t < b) {
            best = Some(t);
        }
    };

    // Side wall.
    let a = dir.x * dir.x + dir.y * dir.y;
    if a > f64::EPSILON {
        let b = o.x * dir.x + o.y * dir.y;
        let c = o.x * o.x + o.y * o.y - radius * radius;
        let disc = b * b - a * c;
        if disc >= 0.0 {
            let sqrt_disc = disc.sqrt();
            for t in [(-b - sqrt_disc) / a, (-b + sqrt_disc) / a] {
                if (o.z + t * dir.z).abs() <= half_height {
                    consider(t);
                }
            }
        }
    }

    // End caps.
    if dir.z.abs() > f64::EPSILON {
        for cap_z in [half_height, -half_height] {
            let t = (cap_z - o.z) / dir.z;
            let hit = o + dir * t;
            if hit.x * hit.x + hit.y * hit.y <= radius * radius {
                consider(t);
            }
        }
    }

    best.map(|t| origin + dir * t)
}

/// Zenith draw for a file-driven far-field beam: the tabulated profile
/// weighted by the sin(theta) solid-angle factor.
fn sample_zenith(
    rng: &mut StdRng,
    name: &str,
    table: &Table1D,
    max_attempts: usize,
) -> SourceResult<f64> {
    for _ in 0..max_attempts {
        let theta = table.sample(rng);
        if rng.random::<f64>() <= theta.sin().abs() {
            return Ok(theta);
        }
    }
    Err(SourceError::SamplingExhausted {
        name: name.to_string(),
        what: "zenith profile".into(),
        attempts: max_attempts,
    })
}

/// Direction within a cone around `axis`, flat or Gaussian-profiled.
fn sample_cone(
    rng: &mut StdRng,
    name: &str,
    axis: DVec3,
    half_angle: f64,
    profile: ConeProfile,
    max_attempts: usize,
) -> SourceResult<DVec3> {
    sample_annular_cone(rng, name, axis, 0.0, half_angle, profile, max_attempts)
}

/// Direction with an opening angle in `[angle_min, angle_max]` around
/// `axis`.
fn sample_annular_cone(
    rng: &mut StdRng,
    name: &str,
    axis: DVec3,
    angle_min: f64,
    angle_max: f64,
    profile: ConeProfile,
    max_attempts: usize,
) -> SourceResult<DVec3> {
    let theta = match profile {
        ConeProfile::Flat => {
            let cos_theta = rng.random_range(angle_max.cos()..=angle_min.cos());
            cos_theta.acos()
        }
        ConeProfile::Gaussian { sigma } => {
            let mut accepted = None;
            for _ in 0..max_attempts {
                let candidate: f64 = rng.sample::<f64, _>(
                    rand_distr::Normal::new(0.0, sigma).map_err(|_| {
                        SourceError::DegenerateBeam {
                            name: name.to_string(),
                            reason: "non-positive gaussian cone sigma".into(),
                        }
                    })?,
                );
                let candidate = candidate.abs();
                if candidate >= angle_min && candidate <= angle_max {
                    accepted = Some(candidate);
                    break;
                }
            }
            accepted.ok_or_else(|| SourceError::SamplingExhausted {
                name: name.to_string(),
                what: "gaussian cone angle".into(),
                attempts: max_attempts,
            })?
        }
    };
    let phi = rng.random_range(0.0..std::f64::consts::TAU);
    let local = math::direction_from_angles(theta, phi);
    Ok(math::rotate_z_to(axis) * local)
}

/// Re-project an illuminated surface point onto the start sphere against
/// the incoming direction, emitting inward along it.
fn illuminated_vertex(
    name: &str,
    area: &StartArea,
    surface: DVec3,
    theta: f64,
    phi: f64,
) -> SourceResult<BeamSample> {
    let dir = -math::direction_from_angles(theta, phi);
    let radius = area.bounding_radius();
    let origin = surface - dir * (2.0 * radius);
    math::ray_sphere_intersection(origin, dir, area.center(), radius)
        .map(|position| vertex(position, dir))
        .ok_or_else(|| SourceError::DegenerateBeam {
            name: name.to_string(),
            reason: "illuminated surface lies outside the start sphere".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use sky_core::CoreResult;

    const ATTEMPTS: usize = 10_000;

    struct TestGeometry {
        area: StartArea,
    }

    impl TestGeometry {
        fn sphere(radius: f64) -> Self {
            Self {
                area: StartArea::Sphere {
                    center: DVec3::ZERO,
                    radius,
                },
            }
        }
    }

    impl GeometryProvider for TestGeometry {
        fn random_point_in_volume(&self, volume: &str, rng: &mut StdRng) -> CoreResult<DVec3> {
            if volume == "crystal" {
                Ok(DVec3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    0.0,
                ))
            } else {
                Err(CoreError::UnknownVolume(volume.to_string()))
            }
        }

        fn has_volume(&self, volume: &str) -> bool {
            volume == "crystal"
        }

        fn start_area(&self) -> StartArea {
            self.area
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(31)
    }

    #[test]
    fn far_field_point_starts_on_sphere_upstream() {
        let geo = TestGeometry::sphere(10.0);
        let beam = BeamModel::FarFieldPoint {
            theta: 0.0,
            phi: 0.0,
        };
        let mut rng = rng();
        for _ in 0..200 {
            let s = beam.sample(&mut rng, "ff", &geo, ATTEMPTS).unwrap();
            // Sky position at zenith: propagation is -z, start on the
            // upper hemisphere of the sphere.
            assert!((s.direction - -DVec3::Z).length() < 1e-12);
            assert!((s.position.length() - 10.0).abs() < 1e-9);
            assert!(s.position.z >= 0.0);
        }
    }

    #[test]
    fn far_field_area_cosine_sampling() {
        let geo = TestGeometry::sphere(5.0);
        let beam = BeamModel::FarFieldArea {
            theta_min: 0.0,
            theta_max: std::f64::consts::FRAC_PI_2,
            phi_min: 0.0,
            phi_max: std::f64::consts::TAU,
        };
        let mut rng = rng();
        let n = 50_000;
        let mean_cos: f64 = (0..n)
            .map(|_| {
                let s = beam.sample(&mut rng, "ff", &geo, ATTEMPTS).unwrap();
                -s.direction.z
            })
            .sum::<f64>()
            / f64::from(n);
        // cos(theta) uniform on [0, 1] has mean 1/2.
        assert!((mean_cos - 0.5).abs() < 0.01, "mean cos {mean_cos}");
    }

    #[test]
    fn tube_start_points_on_surface() {
        let geo = TestGeometry {
            area: StartArea::Tube {
                center: DVec3::ZERO,
                radius: 2.0,
                half_height: 5.0,
            },
        };
        let beam = BeamModel::FarFieldPoint {
            theta: 1.0,
            phi: 0.3,
        };
        let mut rng = rng();
        for _ in 0..500 {
            let s = beam.sample(&mut rng, "ff", &geo, ATTEMPTS).unwrap();
            let radial = s.position.truncate().length();
            let on_wall = (radial - 2.0).abs() < 1e-9 && s.position.z.abs() <= 5.0 + 1e-9;
            let on_cap = (s.position.z.abs() - 5.0).abs() < 1e-9 && radial <= 2.0 + 1e-9;
            assert!(on_wall || on_cap, "start point {} off the tube", s.position);
        }
    }

    #[test]
    fn restricted_point_upgrade_matches_geometry() {
        let area = StartArea::Sphere {
            center: DVec3::ZERO,
            radius: 3.0,
        };
        let beam = BeamModel::RestrictedPoint {
            position: DVec3::new(0.0, 0.0, 6.0),
        };
        let (upgraded, scale) = beam
            .upgrade_restricted_point("rp", &area)
            .unwrap()
            .unwrap();
        let BeamModel::Cone {
            direction,
            half_angle,
            ..
        } = upgraded
        else {
            panic!("expected cone upgrade");
        };
        let expected = (3.0f64 / 6.0).asin();
        assert!((half_angle - expected).abs() < 1e-12);
        assert!((direction - -DVec3::Z).length() < 1e-12);
        assert!((scale - (1.0 - expected.cos()) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn restricted_point_inside_sphere_is_fatal() {
        let area = StartArea::Sphere {
            center: DVec3::ZERO,
            radius: 3.0,
        };
        let beam = BeamModel::RestrictedPoint {
            position: DVec3::new(1.0, 0.0, 0.0),
        };
        assert!(matches!(
            beam.upgrade_restricted_point("rp", &area),
            Err(SourceError::RestrictedPointInsideStartArea { .. })
        ));
    }

    #[test]
    fn line_positions_on_segment() {
        let geo = TestGeometry::sphere(10.0);
        let beam = BeamModel::Line {
            from: DVec3::new(-1.0, 0.0, 0.0),
            to: DVec3::new(1.0, 0.0, 0.0),
        };
        let mut rng = rng();
        for _ in 0..200 {
            let s = beam.sample(&mut rng, "line", &geo, ATTEMPTS).unwrap();
            assert!(s.position.y.abs() < 1e-12 && s.position.z.abs() < 1e-12);
            assert!(s.position.x.abs() <= 1.0);
        }
    }

    #[test]
    fn ellipsoid_positions_inside() {
        let geo = TestGeometry::sphere(10.0);
        let beam = BeamModel::Ellipsoid {
            center: DVec3::ZERO,
            semi_axes: DVec3::new(1.0, 2.0, 3.0),
        };
        let mut rng = rng();
        for _ in 0..500 {
            let p = beam.sample(&mut rng, "ell", &geo, ATTEMPTS).unwrap().position;
            let q = p / DVec3::new(1.0, 2.0, 3.0);
            assert!(q.length() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn disk_cone_angles_bounded() {
        let geo = TestGeometry::sphere(10.0);
        let beam = BeamModel::Disk {
            center: DVec3::ZERO,
            normal: DVec3::Z,
            inner_radius: 0.5,
            outer_radius: 1.5,
            half_height: 0.1,
            angle_min: 0.2,
            angle_max: 0.6,
            profile: ConeProfile::Flat,
        };
        let mut rng = rng();
        for _ in 0..500 {
            let s = beam.sample(&mut rng, "disk", &geo, ATTEMPTS).unwrap();
            let r = s.position.truncate().length();
            assert!((0.5..=1.5).contains(&r));
            assert!(s.position.z.abs() <= 0.1);
            let angle = s.direction.dot(DVec3::Z).acos();
            assert!((0.2 - 1e-9..=0.6 + 1e-9).contains(&angle));
        }
    }

    #[test]
    fn map_profile_weights_cells() {
        let map = ProfileMap::new(
            "spot",
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0],
            &[1.0, 9.0],
        )
        .unwrap();
        let mut rng = rng();
        let n = 20_000;
        let right = (0..n).filter(|_| map.sample(&mut rng).0 >= 1.0).count();
        let frac = right as f64 / f64::from(n);
        assert!((frac - 0.9).abs() < 0.01, "right-cell fraction {frac}");
    }

    #[test]
    fn illuminated_disk_projects_to_sphere() {
        let geo = TestGeometry::sphere(10.0);
        let beam = BeamModel::IlluminatedDisk {
            center: DVec3::ZERO,
            normal: DVec3::Z,
            radius: 2.0,
            theta: 0.4,
            phi: 1.0,
        };
        let mut rng = rng();
        for _ in 0..200 {
            let s = beam.sample(&mut rng, "ill", &geo, ATTEMPTS).unwrap();
            assert!((s.position.length() - 10.0).abs() < 1e-9);
            let expected = -math::direction_from_angles(0.4, 1.0);
            assert!((s.direction - expected).length() < 1e-12);
        }
    }

    #[test]
    fn volume_beam_delegates_to_geometry() {
        let geo = TestGeometry::sphere(10.0);
        let beam = BeamModel::Volume {
            volume: "crystal".into(),
        };
        let mut rng = rng();
        let s = beam.sample(&mut rng, "vol", &geo, ATTEMPTS).unwrap();
        assert!(s.position.x.abs() <= 1.0 && s.position.y.abs() <= 1.0);
        assert!(
            beam.validate("vol", &geo).is_ok(),
            "known volume must validate"
        );
        let missing = BeamModel::Volume {
            volume: "ghost".into(),
        };
        assert!(missing.validate("vol", &geo).is_err());
    }

    #[test]
    fn validation_rejects_degenerate_shapes() {
        let geo = TestGeometry::sphere(10.0);
        let bad = [
            BeamModel::Cone {
                position: DVec3::ZERO,
                direction: DVec3::Z,
                half_angle: 0.0,
                profile: ConeProfile::Flat,
            },
            BeamModel::Line {
                from: DVec3::ZERO,
                to: DVec3::ZERO,
            },
            BeamModel::Cuboid {
                min: DVec3::ONE,
                max: DVec3::ZERO,
            },
            BeamModel::Disk {
                center: DVec3::ZERO,
                normal: DVec3::Z,
                inner_radius: 2.0,
                outer_radius: 1.0,
                half_height: 0.1,
                angle_min: 0.0,
                angle_max: 1.0,
                profile: ConeProfile::Flat,
            },
        ];
        for beam in bad {
            assert!(beam.validate("bad", &geo).is_err(), "{beam:?} must fail");
        }
    }

    #[test]
    fn sphere_area_factor_is_pi_r_squared() {
        let area = StartArea::Sphere {
            center: DVec3::ZERO,
            radius: 4.0,
        };
        let beam = BeamModel::FarFieldArea {
            theta_min: 0.0,
            theta_max: 1.0,
            phi_min: 0.0,
            phi_max: 1.0,
        };
        assert!((beam.area_factor(&area) - std::f64::consts::PI * 16.0).abs() < 1e-9);
    }
}
