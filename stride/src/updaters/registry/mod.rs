use crate::config::UpdaterConfig;
use crate::core::geometry::Ellipsoid;
use crate::core::math::Variant;
use crate::core::state::ParticleData;
use crate::error::{Result, UpdaterError};

pub mod schedule;
pub use schedule::{Schedule, should_fire};

/// Something that mutates particle state at scheduled points of the run.
///
/// Updaters run after the integrator on the steps their [`Schedule`]
/// selects. They get exclusive access to the particle data for the duration
/// of one `apply` call and keep nothing from it afterwards.
pub trait Updater {
    /// Kind of updater, used in logs.
    fn kind(&self) -> &'static str;

    fn schedule(&self) -> Schedule;

    /// Performs one firing.
    ///
    /// Every precondition is checked before the first particle is touched,
    /// so an `Err` means the state was left as it was.
    fn apply(&mut self, timestep: u64, pdata: &mut ParticleData) -> Result<()>;

    /// Current configuration by value, for checkpoints and logs.
    fn metadata(&self) -> UpdaterConfig;

    /// Reconfigure. Takes effect on the next firing.
    fn set_params(&mut self, update: ParamUpdate) -> Result<()> {
        Err(UpdaterError::Configuration(format!(
            "{} has no parameter matching {update:?}",
            self.kind()
        )))
    }
}

/// Runtime reconfiguration requests.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamUpdate {
    Temperature(Variant),
    Ellipsoid(Ellipsoid),
}

struct Entry {
    name: String,
    updater: Box<dyn Updater>,
    registered_at: u64,
}

/// Ordered set of active updaters.
///
/// Updaters firing on the same step run in registration order, each seeing
/// the state left by the ones before it.
#[derive(Default)]
pub struct UpdaterRegistry {
    entries: Vec<Entry>,
}

impl UpdaterRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers `updater` under `name` at `timestep`. Names are unique.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        updater: impl Updater + 'static,
        timestep: u64,
    ) -> Result<()> {
        self.add_boxed(name, Box::new(updater), timestep)
    }

    pub fn add_boxed(
        &mut self,
        name: impl Into<String>,
        updater: Box<dyn Updater>,
        timestep: u64,
    ) -> Result<()> {
        let name = name.into();
        if self.entries.iter().any(|e| e.name == name) {
            return Err(UpdaterError::Configuration(format!(
                "an updater named '{name}' is already registered"
            )));
        }
        let schedule = updater.schedule();
        tracing::info!(
            target: "updaters",
            %name,
            kind = updater.kind(),
            period = schedule.period(),
            phase = schedule.phase(),
            first = ?schedule.first_firing(timestep),
            "updater registered"
        );
        self.entries.push(Entry {
            name,
            updater,
            registered_at: timestep,
        });
        Ok(())
    }

    /// Removes and returns the updater registered under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Updater>> {
        let idx = self.entries.iter().position(|e| e.name == name)?;
        let entry = self.entries.remove(idx);
        tracing::info!(target: "updaters", name, kind = entry.updater.kind(), "updater removed");
        Some(entry.updater)
    }

    pub fn set_params(&mut self, name: &str, update: ParamUpdate) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| {
                UpdaterError::Configuration(format!("no updater named '{name}'"))
            })?;
        entry.updater.set_params(update)
    }

    /// Runs every updater scheduled on `timestep`, in registration order.
    /// Returns how many fired.
    pub fn update(&mut self, timestep: u64, pdata: &mut ParticleData) -> Result<usize> {
        let mut fired = 0;
        for entry in &mut self.entries {
            if !entry.updater.schedule().should_fire(timestep, entry.registered_at) {
                continue;
            }
            tracing::trace!(target: "updaters", name = %entry.name, timestep, "firing");
            entry.updater.apply(timestep, pdata)?;
            fired += 1;
        }
        Ok(fired)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// `(name, configuration)` of every updater, in registration order.
    pub fn metadata(&self) -> Vec<(String, UpdaterConfig)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.updater.metadata()))
            .collect()
    }
}
