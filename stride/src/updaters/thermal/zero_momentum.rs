use crate::config::UpdaterConfig;
use crate::core::state::ParticleData;
use crate::error::Result;
use crate::updaters::registry::{Schedule, Updater};

/// Removes the center-of-mass velocity so total linear momentum is zero.
///
/// Always acts on every particle: zeroing the momentum of a subset would
/// only move it into the rest of the system.
#[derive(Debug, Clone)]
pub struct ZeroMomentum {
    schedule: Schedule,
}

impl ZeroMomentum {
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }
}

impl Updater for ZeroMomentum {
    fn kind(&self) -> &'static str {
        "zero_momentum"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    fn apply(&mut self, timestep: u64, pdata: &mut ParticleData) -> Result<()> {
        if pdata.is_empty() {
            return Ok(());
        }
        let (momentum, total_mass) = pdata.momentum();
        let v_com = momentum / total_mass;
        for v in &mut pdata.vel {
            *v -= v_com;
        }
        tracing::trace!(target: "updaters", timestep, removed = %v_com, "momentum zeroed");
        Ok(())
    }

    fn metadata(&self) -> UpdaterConfig {
        UpdaterConfig::ZeroMomentum {
            schedule: self.schedule,
        }
    }
}
