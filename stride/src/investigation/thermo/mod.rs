use crate::core::state::{ParticleData, SystemDefinition};
use crate::error::{Result, UpdaterError};

/// Aggregate kinetic quantities of one group at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThermoSample {
    /// Kinetic temperature `2 KE / (dof k_B)`. Zero when `dof == 0`.
    pub temperature: f64,
    pub dof: usize,
    pub translational_dof: usize,
    pub rotational_dof: usize,
    pub translational_kinetic_energy: f64,
    pub rotational_kinetic_energy: f64,
}

impl ThermoSample {
    pub fn kinetic_energy(&self) -> f64 {
        self.translational_kinetic_energy + self.rotational_kinetic_energy
    }
}

/// Computes kinetic temperature and degrees of freedom over a group.
///
/// Translational dof are `D * N - D`: the center-of-mass motion is
/// removed. Each principal axis with a nonzero moment of inertia adds one
/// rotational dof; in 2D only rotation about z counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermoStatistics {
    dimensions: usize,
    boltzmann: f64,
}

impl ThermoStatistics {
    pub fn new(sysdef: &SystemDefinition) -> Self {
        Self {
            dimensions: sysdef.dimensions as usize,
            boltzmann: 1.0,
        }
    }

    /// Use a Boltzmann constant other than 1 (temperatures in energy units).
    pub fn with_boltzmann(mut self, k_b: f64) -> Self {
        self.boltzmann = k_b;
        self
    }

    /// One pass over `members`.
    ///
    /// Callers must not pass an empty group; that is a contract violation
    /// and fails with `InvalidState`.
    pub fn compute(&self, pdata: &ParticleData, members: &[usize]) -> Result<ThermoSample> {
        if members.is_empty() {
            return Err(UpdaterError::InvalidState(
                "kinetic temperature requested for an empty group".into(),
            ));
        }

        let d = self.dimensions;
        // Rotational axes that can carry a dof: z alone in 2D.
        let first_rot_axis = if d == 2 { 2 } else { 0 };

        let mut trans_ke = 0.0;
        let mut rot_ke = 0.0;
        let mut rot_dof = 0usize;

        for &i in members {
            let v = pdata.vel[i].to_array();
            let m = pdata.mass[i];
            trans_ke += 0.5 * m * v[..d].iter().map(|c| c * c).sum::<f64>();

            let inertia = pdata.inertia[i].to_array();
            let ang_mom = pdata.ang_mom[i].to_array();
            for k in first_rot_axis..3 {
                if inertia[k] > 0.0 {
                    // 1/2 I w^2 with w = L / I.
                    rot_ke += 0.5 * ang_mom[k] * ang_mom[k] / inertia[k];
                    rot_dof += 1;
                }
            }
        }

        let trans_dof = (d * members.len()).saturating_sub(d);
        let dof = trans_dof + rot_dof;
        let ke = trans_ke + rot_ke;
        let temperature = if dof == 0 {
            0.0
        } else {
            2.0 * ke / (dof as f64 * self.boltzmann)
        };

        Ok(ThermoSample {
            temperature,
            dof,
            translational_dof: trans_dof,
            rotational_dof: rot_dof,
            translational_kinetic_energy: trans_ke,
            rotational_kinetic_energy: rot_ke,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;

    fn sysdef(d: u32) -> SystemDefinition {
        SystemDefinition::new(d).unwrap()
    }

    #[test]
    fn empty_group_is_a_contract_violation() {
        let thermo = ThermoStatistics::new(&sysdef(3));
        let pdata = ParticleData::new(4);
        assert!(matches!(
            thermo.compute(&pdata, &[]),
            Err(UpdaterError::InvalidState(_))
        ));
    }

    #[test]
    fn translational_temperature_in_3d() {
        let thermo = ThermoStatistics::new(&sysdef(3));
        let mut pdata = ParticleData::new(2);
        pdata.vel[0] = DVec3::new(1.0, 0.0, 0.0);
        pdata.vel[1] = DVec3::new(-1.0, 0.0, 0.0);
        pdata.mass[1] = 2.0;

        let sample = thermo.compute(&pdata, &[0, 1]).unwrap();
        // KE = 0.5 + 1.0, dof = 3 * 2 - 3
        assert_eq!(sample.dof, 3);
        assert_relative_eq!(sample.kinetic_energy(), 1.5);
        assert_relative_eq!(sample.temperature, 1.0);
    }

    #[test]
    fn two_dimensions_ignore_z_motion() {
        let thermo = ThermoStatistics::new(&sysdef(2));
        let mut pdata = ParticleData::new(3);
        for v in &mut pdata.vel {
            *v = DVec3::new(1.0, 1.0, 5.0);
        }
        let sample = thermo.compute(&pdata, &[0, 1, 2]).unwrap();
        assert_eq!(sample.translational_dof, 4);
        assert_relative_eq!(sample.translational_kinetic_energy, 3.0);
    }

    #[test]
    fn rotational_dof_follow_nonzero_inertia() {
        let thermo = ThermoStatistics::new(&sysdef(3));
        let mut pdata = ParticleData::new(2);
        pdata.inertia[0] = DVec3::new(2.0, 2.0, 0.0);
        pdata.ang_mom[0] = DVec3::new(2.0, 0.0, 7.0);

        let sample = thermo.compute(&pdata, &[0, 1]).unwrap();
        assert_eq!(sample.rotational_dof, 2);
        // Only the x axis spins: L^2 / (2 I) = 4 / 4
        assert_relative_eq!(sample.rotational_kinetic_energy, 1.0);
        assert_eq!(sample.dof, 5);
    }

    #[test]
    fn single_point_particle_has_no_temperature() {
        let thermo = ThermoStatistics::new(&sysdef(3));
        let mut pdata = ParticleData::new(1);
        pdata.vel[0] = DVec3::ONE;
        let sample = thermo.compute(&pdata, &[0]).unwrap();
        assert_eq!(sample.dof, 0);
        assert_eq!(sample.temperature, 0.0);
    }

    #[test]
    fn boltzmann_constant_scales_temperature() {
        let thermo = ThermoStatistics::new(&sysdef(3)).with_boltzmann(0.5);
        let mut pdata = ParticleData::new(2);
        pdata.vel[0] = DVec3::X;
        pdata.vel[1] = -DVec3::X;
        let sample = thermo.compute(&pdata, &[0, 1]).unwrap();
        assert_relative_eq!(sample.temperature, 2.0 / 3.0 * 2.0);
    }
}
