use crate::config::RunConfig;
use crate::core::solve::{Integrator, SymplecticEuler};
use crate::core::state::{ParticleData, SystemDefinition};
use crate::error::Result;
use crate::updaters::{Updater, UpdaterRegistry};

/// Owns the particle state and drives integrator and updaters.
///
/// Each step runs the integrator, then every updater scheduled on the
/// current timestep in registration order, then advances the timestep.
pub struct Simulation {
    pub sysdef: SystemDefinition,
    pub pdata: ParticleData,
    pub updaters: UpdaterRegistry,
    integrator: Box<dyn Integrator>,
    timestep: u64,
    dt: f64,
}

/// Counts gathered over one call to [`Simulation::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub firings: usize,
}

impl Simulation {
    pub fn new(
        sysdef: SystemDefinition,
        pdata: ParticleData,
        integrator: impl Integrator + 'static,
        dt: f64,
    ) -> Result<Self> {
        sysdef.validate()?;
        pdata.validate()?;
        Ok(Self {
            sysdef,
            pdata,
            updaters: UpdaterRegistry::new(),
            integrator: Box::new(integrator),
            timestep: 0,
            dt,
        })
    }

    /// Builds particles and updaters from a run file. Updaters are registered
    /// at timestep 0 in the order listed.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let pdata = config.particles.build(&config.system)?;
        let mut sim = Self::new(config.system.clone(), pdata, SymplecticEuler, config.dt)?;
        for named in &config.updaters {
            let updater = named.config.build(&sim.sysdef)?;
            sim.updaters.add_boxed(named.name.clone(), updater, sim.timestep)?;
        }
        Ok(sim)
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Registers `updater` at the current timestep.
    pub fn add_updater(
        &mut self,
        name: impl Into<String>,
        updater: impl Updater + 'static,
    ) -> Result<()> {
        self.updaters.add(name, updater, self.timestep)
    }

    /// One step. Returns how many updaters fired.
    pub fn step(&mut self) -> Result<usize> {
        self.integrator.step(&mut self.pdata, self.dt);
        let fired = self.updaters.update(self.timestep, &mut self.pdata)?;
        self.timestep += 1;
        Ok(fired)
    }

    pub fn run(&mut self, steps: u64) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for _ in 0..steps {
            summary.firings += self.step()?;
            summary.steps += 1;
        }
        tracing::debug!(
            target: "simulation",
            steps,
            firings = summary.firings,
            timestep = self.timestep,
            "run finished"
        );
        Ok(summary)
    }
}
