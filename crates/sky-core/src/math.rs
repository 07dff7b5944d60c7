use glam::DVec3;
use rand::Rng;

/// Direction of a unit vector given polar angle `theta` and azimuth `phi`
/// (radians, physics convention: theta from +z).
pub fn direction_from_angles(theta: f64, phi: f64) -> DVec3 {
    let st = theta.sin();
    DVec3::new(st * phi.cos(), st * phi.sin(), theta.cos())
}

/// Sample an isotropic unit direction over the full sphere.
pub fn isotropic_direction<R: Rng + ?Sized>(rng: &mut R) -> DVec3 {
    let cos_theta = rng.random_range(-1.0..=1.0_f64);
    let phi = rng.random_range(0.0..std::f64::consts::TAU);
    direction_from_angles(cos_theta.acos(), phi)
}

/// Sample a unit direction uniformly within a cone of half-angle
/// `half_angle` around `axis`.
///
/// Uniform on the spherical cap: cos(theta) is drawn uniformly in
/// `[cos(half_angle), 1]`.
pub fn direction_in_cone<R: Rng + ?Sized>(rng: &mut R, axis: DVec3, half_angle: f64) -> DVec3 {
    let cos_theta = rng.random_range(half_angle.cos()..=1.0_f64);
    let phi = rng.random_range(0.0..std::f64::consts::TAU);
    let local = direction_from_angles(cos_theta.acos(), phi);
    rotate_z_to(axis) * local
}

/// Sample a point uniformly on a disk of radius `radius` in the plane
/// perpendicular to `normal`, centered at the origin.
pub fn point_on_disk<R: Rng + ?Sized>(rng: &mut R, normal: DVec3, radius: f64) -> DVec3 {
    let r = radius * rng.random::<f64>().sqrt();
    let phi = rng.random_range(0.0..std::f64::consts::TAU);
    let local = DVec3::new(r * phi.cos(), r * phi.sin(), 0.0);
    rotate_z_to(normal) * local
}

/// Any unit vector orthogonal to `v` (which must be non-zero).
pub fn any_orthogonal(v: DVec3) -> DVec3 {
    let n = v.normalize();
    // Pick the seed axis least aligned with v to avoid a degenerate cross.
    let seed = if n.z.abs() < 0.9 { DVec3::Z } else { DVec3::X };
    n.cross(seed).normalize()
}

/// Rotation matrix taking +z onto `target` (which must be non-zero).
pub fn rotate_z_to(target: DVec3) -> glam::DMat3 {
    let z = target.normalize();
    let x = any_orthogonal(z);
    let y = z.cross(x);
    glam::DMat3::from_cols(x, y, z)
}

/// First intersection of the ray `origin + t * dir` (t > 0) with the sphere
/// of radius `radius` centered at `center`, or `None` if the ray misses.
pub fn ray_sphere_intersection(
    origin: DVec3,
    dir: DVec3,
    center: DVec3,
    radius: f64,
) -> Option<DVec3> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t = if -b - sqrt_disc > 0.0 {
        -b - sqrt_disc
    } else if -b + sqrt_disc > 0.0 {
        -b + sqrt_disc
    } else {
        return None;
    };
    Some(origin + dir * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn direction_from_angles_is_unit() {
        let d = direction_from_angles(1.2, 4.5);
        assert!((d.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn isotropic_directions_average_to_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let sum: DVec3 = (0..n).map(|_| isotropic_direction(&mut rng)).sum();
        let mean = sum / f64::from(n);
        assert!(mean.length() < 0.02, "mean direction {mean} not near zero");
    }

    #[test]
    fn cone_samples_stay_inside_cone() {
        let mut rng = StdRng::seed_from_u64(11);
        let axis = DVec3::new(1.0, 2.0, -0.5).normalize();
        let half = 0.3;
        for _ in 0..1000 {
            let d = direction_in_cone(&mut rng, axis, half);
            assert!((d.length() - 1.0).abs() < 1e-9);
            assert!(d.dot(axis) >= half.cos() - 1e-9);
        }
    }

    #[test]
    fn disk_points_lie_in_plane() {
        let mut rng = StdRng::seed_from_u64(3);
        let normal = DVec3::new(0.0, 1.0, 1.0).normalize();
        for _ in 0..500 {
            let p = point_on_disk(&mut rng, normal, 2.0);
            assert!(p.dot(normal).abs() < 1e-9);
            assert!(p.length() <= 2.0 + 1e-9);
        }
    }

    #[test]
    fn any_orthogonal_is_orthogonal() {
        for v in [DVec3::X, DVec3::Y, DVec3::Z, DVec3::new(0.1, -3.0, 0.97)] {
            let o = any_orthogonal(v);
            assert!(v.normalize().dot(o).abs() < 1e-12);
            assert!((o.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn ray_hits_sphere_front_face() {
        let hit = ray_sphere_intersection(DVec3::new(-10.0, 0.0, 0.0), DVec3::X, DVec3::ZERO, 2.0)
            .unwrap();
        assert!((hit - DVec3::new(-2.0, 0.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn ray_misses_sphere() {
        let miss =
            ray_sphere_intersection(DVec3::new(-10.0, 5.0, 0.0), DVec3::X, DVec3::ZERO, 2.0);
        assert!(miss.is_none());
    }
}
