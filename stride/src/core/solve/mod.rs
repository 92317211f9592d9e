use crate::core::state::ParticleData;

/// The time integrator driving the run.
///
/// Integration lives outside this crate; this is the seam it plugs into.
/// Accelerations are whatever the external force computation left in
/// `ParticleData::accel`.
pub trait Integrator {
    fn step(&mut self, pdata: &mut ParticleData, dt: f64);
}

/// Symplectic Euler with the accelerations held fixed over the step.
/// Enough to move particles around in demos and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymplecticEuler;

impl Integrator for SymplecticEuler {
    fn step(&mut self, pdata: &mut ParticleData, dt: f64) {
        for ((q, v), a) in pdata
            .pos
            .iter_mut()
            .zip(pdata.vel.iter_mut())
            .zip(&pdata.accel)
        {
            *v += *a * dt;
            *q += *v * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn kick_then_drift() {
        let mut pdata = ParticleData::new(1);
        pdata.vel[0] = DVec3::X;
        pdata.accel[0] = DVec3::Y;
        SymplecticEuler.step(&mut pdata, 0.5);
        assert_eq!(pdata.vel[0], DVec3::new(1.0, 0.5, 0.0));
        assert_eq!(pdata.pos[0], DVec3::new(0.5, 0.25, 0.0));
    }
}
