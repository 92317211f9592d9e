use crate::config::UpdaterConfig;
use crate::core::state::{ParticleData, SystemDefinition};
use crate::error::{Result, UpdaterError};
use crate::updaters::registry::{Schedule, Updater};
use crate::updaters::use_parallel;

/// Per-particle loop behind [`Enforce2D`], chosen once at construction.
trait PlanarKernel: Send + Sync {
    fn flatten(&self, pdata: &mut ParticleData);
}

struct SerialPlanar;

impl PlanarKernel for SerialPlanar {
    fn flatten(&self, pdata: &mut ParticleData) {
        for (v, a) in pdata.vel.iter_mut().zip(pdata.accel.iter_mut()) {
            v.z = 0.0;
            a.z = 0.0;
        }
    }
}

#[cfg(feature = "parallel")]
struct ParallelPlanar;

#[cfg(feature = "parallel")]
impl PlanarKernel for ParallelPlanar {
    fn flatten(&self, pdata: &mut ParticleData) {
        use rayon::prelude::*;

        pdata
            .vel
            .par_iter_mut()
            .zip(pdata.accel.par_iter_mut())
            .for_each(|(v, a)| {
                v.z = 0.0;
                a.z = 0.0;
            });
    }
}

fn planar_kernel(parallel: bool) -> Box<dyn PlanarKernel> {
    #[cfg(feature = "parallel")]
    if parallel {
        return Box::new(ParallelPlanar);
    }
    let _ = parallel;
    Box::new(SerialPlanar)
}

/// Keeps a 2D system in the plane by zeroing the z component of every
/// velocity and acceleration, every step.
pub struct Enforce2D {
    kernel: Box<dyn PlanarKernel>,
}

impl Enforce2D {
    /// Fails with `Configuration` unless the system is two dimensional.
    pub fn new(sysdef: &SystemDefinition) -> Result<Self> {
        if sysdef.dimensions != 2 {
            return Err(UpdaterError::Configuration(format!(
                "enforce2d requires a 2D system, this one has {} dimensions",
                sysdef.dimensions
            )));
        }
        Ok(Self {
            kernel: planar_kernel(use_parallel(sysdef.execution)),
        })
    }
}

impl Updater for Enforce2D {
    fn kind(&self) -> &'static str {
        "enforce2d"
    }

    fn schedule(&self) -> Schedule {
        Schedule::every_step()
    }

    fn apply(&mut self, _timestep: u64, pdata: &mut ParticleData) -> Result<()> {
        self.kernel.flatten(pdata);
        Ok(())
    }

    fn metadata(&self) -> UpdaterConfig {
        UpdaterConfig::Enforce2D
    }
}
