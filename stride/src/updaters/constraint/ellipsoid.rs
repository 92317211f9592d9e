use glam::DVec3;

use crate::config::{EllipsoidConfig, UpdaterConfig};
use crate::core::geometry::Ellipsoid;
use crate::core::group::ParticleGroup;
use crate::core::state::{ParticleData, SystemDefinition};
use crate::error::{Result, UpdaterError};
use crate::updaters::registry::{ParamUpdate, Schedule, Updater};
use crate::updaters::use_parallel;

/// Moves one particle onto the surface and strips the normal velocity.
/// Returns whether the closest-point search converged.
fn constrain_particle(ellipsoid: &Ellipsoid, pos: &mut DVec3, vel: &mut DVec3) -> bool {
    let proj = ellipsoid.project(*pos);
    *pos = proj.point;
    let n = ellipsoid.normal(proj.point);
    *vel -= n * vel.dot(n);
    proj.converged
}

/// Per-particle loop behind [`ConstrainToEllipsoid`], chosen once at
/// construction. Returns the number of particles whose projection did not
/// converge.
trait ProjectionKernel: Send + Sync {
    fn constrain(&self, ellipsoid: &Ellipsoid, members: &[usize], pdata: &mut ParticleData)
    -> usize;
}

struct SerialProjection;

impl ProjectionKernel for SerialProjection {
    fn constrain(
        &self,
        ellipsoid: &Ellipsoid,
        members: &[usize],
        pdata: &mut ParticleData,
    ) -> usize {
        let mut unconverged = 0;
        for &i in members {
            if !constrain_particle(ellipsoid, &mut pdata.pos[i], &mut pdata.vel[i]) {
                unconverged += 1;
            }
        }
        unconverged
    }
}

#[cfg(feature = "parallel")]
struct ParallelProjection;

#[cfg(feature = "parallel")]
impl ProjectionKernel for ParallelProjection {
    fn constrain(
        &self,
        ellipsoid: &Ellipsoid,
        members: &[usize],
        pdata: &mut ParticleData,
    ) -> usize {
        use rayon::prelude::*;

        let mut mask = vec![false; pdata.len()];
        for &i in members {
            mask[i] = true;
        }
        pdata
            .pos
            .par_iter_mut()
            .zip(pdata.vel.par_iter_mut())
            .enumerate()
            .filter(|(i, _)| mask[*i])
            .map(|(_, (pos, vel))| usize::from(!constrain_particle(ellipsoid, pos, vel)))
            .sum()
    }
}

fn projection_kernel(parallel: bool) -> Box<dyn ProjectionKernel> {
    #[cfg(feature = "parallel")]
    if parallel {
        return Box::new(ParallelProjection);
    }
    let _ = parallel;
    Box::new(SerialProjection)
}

/// Constrains a group of particles to the surface of an ellipsoid.
///
/// Every step each member is moved to the closest point on the surface and
/// the component of its velocity along the outward normal is removed.
///
/// Known limitations:
/// - The constraint force does not contribute to the virial, so pressure and
///   stress are wrong while it is active.
/// - Random thermal forces from a stochastic integrator act in full 3D even
///   though members live on a 2D surface. Results are only accurate in the
///   zero-temperature limit.
///
/// The projection needs every member visible on one process, so the
/// updater refuses systems split by a domain decomposition.
pub struct ConstrainToEllipsoid {
    ellipsoid: Ellipsoid,
    group: ParticleGroup,
    kernel: Box<dyn ProjectionKernel>,
}

impl ConstrainToEllipsoid {
    pub fn new(
        sysdef: &SystemDefinition,
        group: ParticleGroup,
        ellipsoid: Ellipsoid,
    ) -> Result<Self> {
        if sysdef.is_decomposed() {
            return Err(UpdaterError::UnsupportedConfiguration(
                "constraint_ellipsoid is not supported in multi-process simulations".into(),
            ));
        }
        Ok(Self {
            ellipsoid,
            group,
            kernel: projection_kernel(use_parallel(sysdef.execution)),
        })
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn group(&self) -> &ParticleGroup {
        &self.group
    }

    /// Replaces the surface from the next firing on.
    pub fn set_ellipsoid(&mut self, ellipsoid: Ellipsoid) {
        self.ellipsoid = ellipsoid;
    }
}

impl Updater for ConstrainToEllipsoid {
    fn kind(&self) -> &'static str {
        "constraint_ellipsoid"
    }

    fn schedule(&self) -> Schedule {
        Schedule::every_step()
    }

    fn apply(&mut self, timestep: u64, pdata: &mut ParticleData) -> Result<()> {
        let members = self.group.resolve(pdata)?;
        if members.is_empty() {
            return Ok(());
        }
        let unconverged = self.kernel.constrain(&self.ellipsoid, &members, pdata);
        if unconverged > 0 {
            tracing::debug!(
                target: "updaters",
                timestep,
                unconverged,
                "ellipsoid projection did not converge, kept best estimates"
            );
        }
        Ok(())
    }

    fn metadata(&self) -> UpdaterConfig {
        UpdaterConfig::ConstraintEllipsoid(EllipsoidConfig::from_parts(
            &self.group,
            &self.ellipsoid,
        ))
    }

    fn set_params(&mut self, update: ParamUpdate) -> Result<()> {
        match update {
            ParamUpdate::Ellipsoid(ellipsoid) => {
                self.set_ellipsoid(ellipsoid);
                Ok(())
            }
            other => Err(UpdaterError::Configuration(format!(
                "constraint_ellipsoid does not accept {other:?}"
            ))),
        }
    }
}
