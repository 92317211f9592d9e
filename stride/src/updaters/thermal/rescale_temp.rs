use crate::config::UpdaterConfig;
use crate::core::group::ParticleGroup;
use crate::core::math::Variant;
use crate::core::state::{ParticleData, SystemDefinition};
use crate::error::{Result, UpdaterError};
use crate::investigation::thermo::{ThermoSample, ThermoStatistics};
use crate::updaters::registry::{ParamUpdate, Schedule, Updater};

/// Rescales velocities and angular momenta so the group's kinetic
/// temperature matches a set point.
///
/// Every firing performs a full reduction over the group (one pass for the
/// thermo sample, one pass to scale), so cost is O(|group|) per firing and
/// runs serially. Fire it sparingly on large systems.
#[derive(Debug, Clone)]
pub struct RescaleTemperature {
    kt: Variant,
    group: ParticleGroup,
    thermo: ThermoStatistics,
    schedule: Schedule,
}

impl RescaleTemperature {
    pub fn new(
        sysdef: &SystemDefinition,
        group: ParticleGroup,
        kt: Variant,
        schedule: Schedule,
    ) -> Result<Self> {
        check_set_point(&kt)?;
        Ok(Self {
            kt,
            group,
            thermo: ThermoStatistics::new(sysdef),
            schedule,
        })
    }

    pub fn kt(&self) -> &Variant {
        &self.kt
    }

    pub fn group(&self) -> &ParticleGroup {
        &self.group
    }

    /// Replaces the set point from the next firing on.
    pub fn set_kt(&mut self, kt: Variant) -> Result<()> {
        check_set_point(&kt)?;
        self.kt = kt;
        Ok(())
    }
}

/// A negative set point has no velocity scaling that reaches it. Linear
/// variants never leave the range of their control values, so checking
/// those is enough.
fn check_set_point(kt: &Variant) -> Result<()> {
    let valid = |v: f64| v.is_finite() && v >= 0.0;
    let ok = match kt {
        Variant::Constant(v) => valid(*v),
        Variant::Linear(interp) => interp.points().iter().all(|&(_, v)| valid(v)),
    };
    if ok {
        Ok(())
    } else {
        Err(UpdaterError::Configuration(format!(
            "temperature set point must be finite and >= 0, got {kt:?}"
        )))
    }
}

/// `sqrt(kT / T)`, or `DegenerateState` when the current temperature leaves
/// the scaling undefined.
pub(crate) fn scale_factor(target: f64, sample: &ThermoSample) -> Result<f64> {
    if !(sample.temperature > 0.0) {
        return Err(UpdaterError::DegenerateState(format!(
            "cannot rescale from temperature {} ({} dof)",
            sample.temperature, sample.dof
        )));
    }
    Ok((target / sample.temperature).sqrt())
}

impl Updater for RescaleTemperature {
    fn kind(&self) -> &'static str {
        "rescale_temp"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    fn apply(&mut self, timestep: u64, pdata: &mut ParticleData) -> Result<()> {
        let target = self.kt.evaluate(timestep);
        let members = self.group.resolve(pdata)?;
        if members.is_empty() {
            return Ok(());
        }

        let sample = self.thermo.compute(pdata, &members)?;
        let lambda = match scale_factor(target, &sample) {
            Ok(lambda) => lambda,
            Err(UpdaterError::DegenerateState(reason)) => {
                tracing::debug!(target: "updaters", timestep, %reason, "skipping temperature rescale");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        for &i in &members {
            pdata.vel[i] *= lambda;
            pdata.ang_mom[i] *= lambda;
        }
        tracing::trace!(
            target: "updaters",
            timestep,
            from = sample.temperature,
            to = target,
            lambda,
            "temperature rescaled"
        );
        Ok(())
    }

    fn metadata(&self) -> UpdaterConfig {
        UpdaterConfig::RescaleTemp {
            kt: Some(self.kt.clone()),
            group: Some(self.group.clone()),
            schedule: self.schedule,
        }
    }

    fn set_params(&mut self, update: ParamUpdate) -> Result<()> {
        match update {
            ParamUpdate::Temperature(kt) => self.set_kt(kt),
            other => Err(UpdaterError::Configuration(format!(
                "rescale_temp does not accept {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;

    fn system() -> SystemDefinition {
        SystemDefinition::new(3).unwrap()
    }

    fn moving_pair() -> ParticleData {
        let mut pdata = ParticleData::new(2);
        pdata.vel[0] = DVec3::new(1.0, 0.0, 0.0);
        pdata.vel[1] = DVec3::new(-1.0, 0.0, 0.0);
        pdata
    }

    #[test]
    fn reaches_the_set_point() {
        let sysdef = system();
        let mut rescale = RescaleTemperature::new(
            &sysdef,
            ParticleGroup::all(),
            Variant::constant(2.0),
            Schedule::every_step(),
        )
        .unwrap();
        let mut pdata = moving_pair();
        rescale.apply(0, &mut pdata).unwrap();

        let thermo = ThermoStatistics::new(&sysdef);
        let sample = thermo.compute(&pdata, &[0, 1]).unwrap();
        assert_relative_eq!(sample.temperature, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn follows_a_linear_set_point() {
        let sysdef = system();
        let kt = Variant::linear(vec![(0, 4.0), (100, 1.0)]).unwrap();
        let mut rescale =
            RescaleTemperature::new(&sysdef, ParticleGroup::all(), kt, Schedule::every_step())
                .unwrap();
        let mut pdata = moving_pair();
        rescale.apply(50, &mut pdata).unwrap();
        let sample = ThermoStatistics::new(&sysdef).compute(&pdata, &[0, 1]).unwrap();
        assert_relative_eq!(sample.temperature, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn zero_temperature_is_left_alone() {
        let sysdef = system();
        let mut rescale = RescaleTemperature::new(
            &sysdef,
            ParticleGroup::all(),
            Variant::constant(1.0),
            Schedule::every_step(),
        )
        .unwrap();
        let mut pdata = ParticleData::new(4);
        let before = pdata.clone();
        rescale.apply(0, &mut pdata).unwrap();
        assert_eq!(pdata, before);
    }

    #[test]
    fn negative_set_point_is_rejected() {
        let sysdef = system();
        assert!(RescaleTemperature::new(
            &sysdef,
            ParticleGroup::all(),
            Variant::constant(-1.0),
            Schedule::every_step(),
        )
        .is_err());
        let mut rescale = RescaleTemperature::new(
            &sysdef,
            ParticleGroup::all(),
            Variant::constant(1.0),
            Schedule::every_step(),
        )
        .unwrap();
        assert!(rescale
            .set_kt(Variant::linear(vec![(0, 1.0), (10, -2.0)]).unwrap())
            .is_err());
        assert_eq!(rescale.kt(), &Variant::constant(1.0));
    }

    #[test]
    fn scale_factor_flags_degenerate_samples() {
        let sample = ThermoSample::default();
        assert!(matches!(
            scale_factor(1.0, &sample),
            Err(UpdaterError::DegenerateState(_))
        ));
    }
}
