pub mod core;

use anyhow::{Context, Result};
use self::core::EngineConfig;
use stride::config::{NamedUpdater, RunConfig};
use stride::investigation::thermo::ThermoStatistics;
use stride::simulation::Simulation;

pub struct EngineApp {
    config: EngineConfig,
}

impl EngineApp {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            target: "engine",
            app = %self.config.app_name,
            run_file = %self.config.run_file.display(),
            "Engine starting"
        );

        let source = std::fs::read_to_string(&self.config.run_file)
            .with_context(|| format!("reading {}", self.config.run_file.display()))?;
        let run = RunConfig::from_ron_str(&source)
            .with_context(|| format!("parsing {}", self.config.run_file.display()))?;
        let mut sim = Simulation::from_config(&run).context("building simulation")?;
        tracing::info!(
            target: "engine",
            particles = sim.pdata.len(),
            dimensions = sim.sysdef.dimensions,
            updaters = sim.updaters.len(),
            steps = run.steps,
            "simulation ready"
        );

        let chunk = if self.config.report_every == 0 {
            run.steps
        } else {
            self.config.report_every
        };
        let mut remaining = run.steps;
        let mut firings = 0;
        while remaining > 0 {
            let n = chunk.min(remaining);
            firings += sim.run(n)?.firings;
            remaining -= n;
            self.report(&sim)?;
        }

        tracing::info!(target: "engine", firings, timestep = sim.timestep(), "run complete");

        if let Some(path) = &self.config.checkpoint {
            let snapshot = RunConfig {
                updaters: sim
                    .updaters
                    .metadata()
                    .into_iter()
                    .map(|(name, config)| NamedUpdater { name, config })
                    .collect(),
                ..run
            };
            std::fs::write(path, snapshot.to_ron_string()?)
                .with_context(|| format!("writing checkpoint {}", path.display()))?;
            tracing::info!(target: "engine", path = %path.display(), "configuration checkpoint written");
        }

        tracing::info!(target: "engine", "Engine shutdown complete");
        Ok(())
    }

    fn report(&self, sim: &Simulation) -> Result<()> {
        if sim.pdata.is_empty() {
            return Ok(());
        }
        let members: Vec<usize> = (0..sim.pdata.len()).collect();
        let sample = ThermoStatistics::new(&sim.sysdef).compute(&sim.pdata, &members)?;
        let (momentum, _) = sim.pdata.momentum();
        tracing::info!(
            target: "engine",
            timestep = sim.timestep(),
            temperature = sample.temperature,
            kinetic_energy = sample.kinetic_energy(),
            momentum = momentum.length(),
            "progress"
        );
        Ok(())
    }
}
