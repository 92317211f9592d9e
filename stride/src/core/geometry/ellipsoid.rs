use glam::DVec3;

use crate::error::{Result, UpdaterError};

/// Bisection stops once the surface equation residual is below this.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Upper bound on bisection steps. Enough to collapse any f64 bracket, so
/// hitting it means the residual never dropped under the tolerance.
pub const MAX_BISECTIONS: usize = 256;

/// Axis-aligned ellipsoid `((x-Px)/rx)^2 + ((y-Py)/ry)^2 + ((z-Pz)/rz)^2 = 1`.
///
/// Construction requires `rz > 0`, `rx >= rz` and `ry >= rz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    center: DVec3,
    radii: DVec3,
    tolerance: f64,
}

/// Result of a closest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Closest point on the surface (best estimate if not converged).
    pub point: DVec3,
    /// Bisection steps spent. Zero when a closed form applied.
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Root {
    s: f64,
    iterations: usize,
    converged: bool,
}

impl Root {
    const EXACT: Root = Root {
        s: 0.0,
        iterations: 0,
        converged: true,
    };
}

impl Ellipsoid {
    pub fn new(center: DVec3, rx: f64, ry: f64, rz: f64) -> Result<Self> {
        if !center.is_finite() {
            return Err(UpdaterError::Configuration(format!(
                "ellipsoid center must be finite, got {center}"
            )));
        }
        if ![rx, ry, rz].iter().all(|r| r.is_finite()) {
            return Err(UpdaterError::Configuration(format!(
                "ellipsoid radii must be finite, got ({rx}, {ry}, {rz})"
            )));
        }
        if rz <= 0.0 {
            return Err(UpdaterError::Configuration(format!(
                "ellipsoid requires rz > 0, got rz = {rz}"
            )));
        }
        if rx < rz || ry < rz {
            return Err(UpdaterError::Configuration(format!(
                "ellipsoid requires rx >= rz and ry >= rz, got ({rx}, {ry}, {rz})"
            )));
        }
        Ok(Self {
            center,
            radii: DVec3::new(rx, ry, rz),
            tolerance: DEFAULT_TOLERANCE,
        })
    }

    pub fn sphere(center: DVec3, r: f64) -> Result<Self> {
        Self::new(center, r, r, r)
    }

    /// Override the bisection residual tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs().max(f64::EPSILON);
        self
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radii(&self) -> DVec3 {
        self.radii
    }

    /// `((p-P)/r)^2` summed over the axes. Equal to 1 on the surface.
    pub fn level(&self, p: DVec3) -> f64 {
        ((p - self.center) / self.radii).length_squared()
    }

    /// Unit outward normal at `p`, taken from the gradient of the implicit
    /// function. Zero at the center.
    pub fn normal(&self, p: DVec3) -> DVec3 {
        ((p - self.center) / (self.radii * self.radii)).normalize_or_zero()
    }

    /// Closest point on the surface to `p`.
    ///
    /// The query is reflected into the first octant and the axes are ordered
    /// by decreasing radius. The closest point then follows from the root of
    /// the Lagrange-multiplier equation, found by bisection (Eberly,
    /// "Distance from a Point to an Ellipse, an Ellipsoid, or a
    /// Hyperellipsoid"). Degenerate positions on coordinate planes reduce to
    /// the 2D problem or a closed form.
    pub fn project(&self, p: DVec3) -> Projection {
        let local = p - self.center;
        let y = local.abs().to_array();
        let radii = self.radii.to_array();

        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| radii[b].total_cmp(&radii[a]));

        let e = order.map(|k| radii[k]);
        let ys = order.map(|k| y[k]);
        let (xs, root) = closest_in_octant(e, ys, self.tolerance);

        let mut x = [0.0; 3];
        for (slot, &k) in order.iter().enumerate() {
            x[k] = xs[slot];
        }
        let signs = local.signum();
        Projection {
            point: self.center + DVec3::from_array(x) * signs,
            iterations: root.iterations,
            converged: root.converged,
        }
    }
}

/// First-octant query with `e[0] >= e[1] >= e[2] > 0` and `y >= 0`.
///
/// The root is searched in `t = s + 1` rather than the multiplier `s`
/// itself: near the center `s` approaches -1 and `s + 1` would keep only a
/// few significant digits.
fn closest_in_octant(e: [f64; 3], y: [f64; 3], tol: f64) -> ([f64; 3], Root) {
    if y[2] > 0.0 {
        if y[1] > 0.0 {
            if y[0] > 0.0 {
                let z = [y[0] / e[0], y[1] / e[1], y[2] / e[2]];
                let g = z[0] * z[0] + z[1] * z[1] + z[2] * z[2] - 1.0;
                if g == 0.0 {
                    return (y, Root::EXACT);
                }
                let r0 = (e[0] / e[2]).powi(2);
                let r1 = (e[1] / e[2]).powi(2);
                let d0 = (e[0] * e[0] - e[2] * e[2]) / (e[2] * e[2]);
                let d1 = (e[1] * e[1] - e[2] * e[2]) / (e[2] * e[2]);
                let root = root_3d([r0, r1], [d0, d1], z, g, tol);
                let t = root.s;
                let x = [r0 * y[0] / (t + d0), r1 * y[1] / (t + d1), y[2] / t];
                return (snap_to_surface(&e, x), root);
            }
            let (x, root) = closest_in_quadrant([e[1], e[2]], [y[1], y[2]], tol);
            return ([0.0, x[0], x[1]], root);
        }
        if y[0] > 0.0 {
            let (x, root) = closest_in_quadrant([e[0], e[2]], [y[0], y[2]], tol);
            return ([x[0], 0.0, x[1]], root);
        }
        return ([0.0, 0.0, e[2]], Root::EXACT);
    }

    // On the plane of the two largest axes. Points close enough to the
    // center have their closest point off that plane.
    let denom = [e[0] * e[0] - e[2] * e[2], e[1] * e[1] - e[2] * e[2]];
    let numer = [e[0] * y[0], e[1] * y[1]];
    if numer[0] < denom[0] && numer[1] < denom[1] {
        let xde = [numer[0] / denom[0], numer[1] / denom[1]];
        let discr = 1.0 - xde[0] * xde[0] - xde[1] * xde[1];
        if discr > 0.0 {
            return (
                [e[0] * xde[0], e[1] * xde[1], e[2] * discr.sqrt()],
                Root::EXACT,
            );
        }
    }
    let (x, root) = closest_in_quadrant([e[0], e[1]], [y[0], y[1]], tol);
    ([x[0], x[1], 0.0], root)
}

/// First-quadrant ellipse query with `e[0] >= e[1] > 0` and `y >= 0`.
fn closest_in_quadrant(e: [f64; 2], y: [f64; 2], tol: f64) -> ([f64; 2], Root) {
    if y[1] > 0.0 {
        if y[0] > 0.0 {
            let z = [y[0] / e[0], y[1] / e[1]];
            let g = z[0] * z[0] + z[1] * z[1] - 1.0;
            if g == 0.0 {
                return (y, Root::EXACT);
            }
            let r0 = (e[0] / e[1]).powi(2);
            let d0 = (e[0] * e[0] - e[1] * e[1]) / (e[1] * e[1]);
            let root = root_2d(r0, d0, z, g, tol);
            let t = root.s;
            let x = [r0 * y[0] / (t + d0), y[1] / t];
            return (snap_to_surface(&e, x), root);
        }
        return ([0.0, e[1]], Root::EXACT);
    }

    let numer0 = e[0] * y[0];
    let denom0 = e[0] * e[0] - e[1] * e[1];
    if numer0 < denom0 {
        let xde0 = numer0 / denom0;
        ([e[0] * xde0, e[1] * (1.0 - xde0 * xde0).sqrt()], Root::EXACT)
    } else {
        ([e[0], 0.0], Root::EXACT)
    }
}

/// Root in `t` of `(n0/(t+d0))^2 + (z1/t)^2 = 1`, with `n0 = r0 z0`.
fn root_2d(r0: f64, d0: f64, z: [f64; 2], g: f64, tol: f64) -> Root {
    let n0 = r0 * z[0];
    let t0 = z[1];
    let t1 = if g < 0.0 {
        1.0
    } else {
        robust_length(&[n0, z[1]])
    };
    bisect(t0, t1, tol, |t| {
        (n0 / (t + d0)).powi(2) + (z[1] / t).powi(2) - 1.0
    })
}

/// Root in `t` of `(n0/(t+d0))^2 + (n1/(t+d1))^2 + (z2/t)^2 = 1`.
fn root_3d(r: [f64; 2], d: [f64; 2], z: [f64; 3], g: f64, tol: f64) -> Root {
    let n0 = r[0] * z[0];
    let n1 = r[1] * z[1];
    let t0 = z[2];
    let t1 = if g < 0.0 {
        1.0
    } else {
        robust_length(&[n0, n1, z[2]])
    };
    bisect(t0, t1, tol, |t| {
        (n0 / (t + d[0])).powi(2) + (n1 / (t + d[1])).powi(2) + (z[2] / t).powi(2) - 1.0
    })
}

/// Rescales `x` along its ray so it satisfies the surface equation to
/// rounding.
fn snap_to_surface<const N: usize>(e: &[f64; N], x: [f64; N]) -> [f64; N] {
    let level: f64 = x.iter().zip(e).map(|(xi, ei)| (xi / ei).powi(2)).sum();
    if !(level.is_finite() && level > 0.0) {
        return x;
    }
    let scale = level.sqrt().recip();
    x.map(|xi| xi * scale)
}

/// Bisection for the root of a decreasing `f` bracketed by `[s0, s1]`.
/// Converged only when the residual is within `tol`.
fn bisect(mut s0: f64, mut s1: f64, tol: f64, f: impl Fn(f64) -> f64) -> Root {
    let mut s = 0.5 * (s0 + s1);
    for i in 0..MAX_BISECTIONS {
        s = 0.5 * (s0 + s1);
        let g = f(s);
        if g.abs() <= tol {
            return Root {
                s,
                iterations: i + 1,
                converged: true,
            };
        }
        if s == s0 || s == s1 {
            return Root {
                s,
                iterations: i + 1,
                converged: false,
            };
        }
        if g > 0.0 {
            s0 = s;
        } else {
            s1 = s;
        }
    }
    Root {
        s,
        iterations: MAX_BISECTIONS,
        converged: false,
    }
}

/// Euclidean length without overflow for large components.
fn robust_length(v: &[f64]) -> f64 {
    let max = v.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if max == 0.0 {
        return 0.0;
    }
    max * v.iter().map(|x| (x / max).powi(2)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn on_surface(e: &Ellipsoid, p: DVec3) {
        assert_relative_eq!(e.level(p), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn rejects_bad_radii() {
        assert!(Ellipsoid::new(DVec3::ZERO, 3.0, 3.0, 0.0).is_err());
        assert!(Ellipsoid::new(DVec3::ZERO, 1.0, 3.0, 2.0).is_err());
        assert!(Ellipsoid::new(DVec3::ZERO, 3.0, 1.0, 2.0).is_err());
        assert!(Ellipsoid::new(DVec3::ZERO, 3.0, 3.0, -1.0).is_err());
        assert!(Ellipsoid::new(DVec3::ZERO, f64::NAN, 3.0, 1.0).is_err());
        assert!(Ellipsoid::new(DVec3::ZERO, 7.0, 5.0, 3.0).is_ok());
    }

    #[test]
    fn sphere_projects_radially() {
        let center = DVec3::new(-1.0, 5.0, 0.0);
        let sphere = Ellipsoid::sphere(center, 9.0).unwrap();
        let p = center + DVec3::new(3.0, 4.0, 12.0);
        let proj = sphere.project(p);
        assert!(proj.converged);
        let expected = center + DVec3::new(3.0, 4.0, 12.0) * (9.0 / 13.0);
        assert_relative_eq!(proj.point.x, expected.x, epsilon = 1e-8);
        assert_relative_eq!(proj.point.y, expected.y, epsilon = 1e-8);
        assert_relative_eq!(proj.point.z, expected.z, epsilon = 1e-8);
    }

    #[test]
    fn axis_points_land_on_the_axis() {
        let e = Ellipsoid::new(DVec3::ZERO, 7.0, 5.0, 3.0).unwrap();
        let proj = e.project(DVec3::new(0.0, 0.0, -10.0));
        assert_relative_eq!(proj.point.z, -3.0, epsilon = 1e-12);
        assert_eq!(proj.iterations, 0);

        let proj = e.project(DVec3::new(20.0, 0.0, 0.0));
        assert_relative_eq!(proj.point.x, 7.0, epsilon = 1e-12);
    }

    #[test]
    fn center_maps_to_nearest_pole() {
        let e = Ellipsoid::new(DVec3::ZERO, 7.0, 5.0, 3.0).unwrap();
        let proj = e.project(DVec3::ZERO);
        on_surface(&e, proj.point);
        assert_relative_eq!(proj.point.z.abs(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn ry_larger_than_rx_is_handled() {
        let e = Ellipsoid::new(DVec3::ZERO, 4.0, 6.0, 2.0).unwrap();
        for p in [
            DVec3::new(1.0, 2.0, 0.5),
            DVec3::new(-8.0, 3.0, 1.0),
            DVec3::new(0.3, -9.0, -4.0),
        ] {
            let proj = e.project(p);
            assert!(proj.converged);
            on_surface(&e, proj.point);
        }
    }

    #[test]
    fn offset_to_closest_point_is_normal() {
        let e = Ellipsoid::new(DVec3::new(1.0, -2.0, 0.5), 7.0, 5.0, 3.0).unwrap();
        for p in [
            DVec3::new(9.0, 4.0, 2.0),
            DVec3::new(2.0, -1.5, 0.7),
            DVec3::new(-4.0, -8.0, -3.0),
            DVec3::new(1.5, -2.0, 6.0),
        ] {
            let proj = e.project(p);
            on_surface(&e, proj.point);
            let offset = p - proj.point;
            let n = e.normal(proj.point);
            assert!(offset.cross(n).length() < 1e-6 * offset.length().max(1.0));
        }
    }

    #[test]
    fn in_plane_interior_point_leaves_the_plane() {
        let e = Ellipsoid::new(DVec3::ZERO, 7.0, 5.0, 3.0).unwrap();
        let proj = e.project(DVec3::new(1.0, 1.0, 0.0));
        on_surface(&e, proj.point);
        assert!(proj.point.z > 0.0);
    }

    #[test]
    fn points_next_to_the_center_converge_onto_the_surface() {
        let center = DVec3::new(-1.0, 5.0, 0.0);
        for e in [
            Ellipsoid::new(center, 7.0, 5.0, 3.0).unwrap(),
            Ellipsoid::sphere(center, 3.0).unwrap(),
        ] {
            for eps in [1e-6, 1e-8, 1e-9, 1e-12] {
                let proj = e.project(center + DVec3::splat(eps));
                assert!(proj.converged, "eps = {eps}");
                on_surface(&e, proj.point);
                assert!(proj.point.z > center.z);
            }
        }
    }

    #[test]
    fn near_center_of_an_ellipse_slice() {
        // y = 0 plane with x and z nonzero goes through the 2D solve.
        let e = Ellipsoid::new(DVec3::ZERO, 7.0, 5.0, 3.0).unwrap();
        let proj = e.project(DVec3::new(1e-9, 0.0, 1e-9));
        assert!(proj.converged);
        on_surface(&e, proj.point);
        assert_relative_eq!(proj.point.z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn looser_tolerance_spends_fewer_bisections() {
        let tight = Ellipsoid::new(DVec3::ZERO, 7.0, 5.0, 3.0).unwrap();
        let loose = tight.with_tolerance(1e-3);
        let p = DVec3::new(4.0, 3.0, 2.0);

        let a = tight.project(p);
        let b = loose.project(p);
        assert!(a.converged && b.converged);
        assert!(b.iterations < a.iterations);
        // The snap keeps even the coarse estimate on the surface.
        on_surface(&loose, b.point);
        assert!((a.point - b.point).length() < 5e-2);
    }

    #[test]
    fn bisection_reports_failure_when_budget_is_exhausted() {
        // Residual never reaches zero and the bracket cannot collapse onto 0.0
        // within the budget, so the last midpoint comes back unconverged.
        let root = bisect(0.0, 1.0, 0.0, |_| -1.0);
        assert!(!root.converged);
        assert_eq!(root.iterations, MAX_BISECTIONS);
        assert!(root.s > 0.0 && root.s < 1e-70);

        let found = bisect(0.0, 1.0, 1e-12, |s| 0.25 - s);
        assert!(found.converged);
        assert_relative_eq!(found.s, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn collapsed_bracket_with_large_residual_is_not_converged() {
        // A step function: the bracket collapses onto the jump, where the
        // residual never gets below the tolerance.
        let root = bisect(0.0, 1.0, 1e-12, |s| if s < 0.3 { 1.0 } else { -1.0 });
        assert!(!root.converged);
        assert!(root.iterations < MAX_BISECTIONS);
        assert_relative_eq!(root.s, 0.3, epsilon = 1e-12);
    }
}
