use glam::DVec3;
use rand::Rng;
use sky_core::math;

/// How a source polarizes its emitted particles.
///
/// The sampled polarization vector is always unit length and orthogonal to
/// the momentum direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Polarization {
    /// No preferred polarization: a random transverse vector.
    Unpolarized,
    /// Partially polarized along a configured vector.
    Absolute {
        /// Preferred polarization direction (need not be unit or transverse;
        /// it is projected transverse to the momentum at sampling time).
        vector: DVec3,
        /// Degree of polarization in `[0, 1]`: the probability that a given
        /// particle carries the preferred vector rather than a random one.
        degree: f64,
    },
}

impl Polarization {
    /// Sample a polarization vector transverse to `direction`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, direction: DVec3) -> DVec3 {
        match self {
            Self::Unpolarized => random_transverse(rng, direction),
            Self::Absolute { vector, degree } => {
                if rng.random::<f64>() < *degree {
                    let transverse = *vector - direction * vector.dot(direction);
                    if transverse.length_squared() > f64::EPSILON {
                        return transverse.normalize();
                    }
                    // Preferred vector parallel to the momentum: fall back.
                }
                random_transverse(rng, direction)
            }
        }
    }
}

fn random_transverse<R: Rng + ?Sized>(rng: &mut R, direction: DVec3) -> DVec3 {
    let u = math::any_orthogonal(direction);
    let v = direction.normalize().cross(u);
    let phi = rng.random_range(0.0..std::f64::consts::TAU);
    u * phi.cos() + v * phi.sin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn unpolarized_is_unit_and_transverse() {
        let mut rng = StdRng::seed_from_u64(1);
        let dir = DVec3::new(0.3, -0.4, 0.87).normalize();
        for _ in 0..200 {
            let p = Polarization::Unpolarized.sample(&mut rng, dir);
            assert!((p.length() - 1.0).abs() < 1e-12);
            assert!(p.dot(dir).abs() < 1e-12);
        }
    }

    #[test]
    fn fully_polarized_follows_vector() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = Polarization::Absolute {
            vector: DVec3::X,
            degree: 1.0,
        };
        let p = model.sample(&mut rng, DVec3::Z);
        assert!((p - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn degenerate_preferred_vector_falls_back() {
        let mut rng = StdRng::seed_from_u64(3);
        let model = Polarization::Absolute {
            vector: DVec3::Z,
            degree: 1.0,
        };
        let p = model.sample(&mut rng, DVec3::Z);
        assert!((p.length() - 1.0).abs() < 1e-12);
        assert!(p.dot(DVec3::Z).abs() < 1e-12);
    }

    #[test]
    fn partial_polarization_mixes() {
        let mut rng = StdRng::seed_from_u64(4);
        let model = Polarization::Absolute {
            vector: DVec3::X,
            degree: 0.5,
        };
        let n = 10_000;
        let aligned = (0..n)
            .filter(|_| {
                let p = model.sample(&mut rng, DVec3::Z);
                (p - DVec3::X).length() < 1e-9
            })
            .count();
        // Half the draws should be the preferred vector (random transverse
        // draws hit exactly +x with probability zero).
        let frac = aligned as f64 / f64::from(n);
        assert!((frac - 0.5).abs() < 0.03, "aligned fraction {frac}");
    }
}
