use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdaterError};

/// When an updater fires.
///
/// `phase == -1` anchors the schedule to the step the updater was
/// registered on. `phase >= 0` anchors it to the period grid: the first
/// firing is the first multiple of `period` at or after registration, plus
/// `phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleDef", into = "ScheduleDef")]
pub struct Schedule {
    period: u64,
    phase: i64,
}

#[derive(Serialize, Deserialize)]
struct ScheduleDef {
    #[serde(default = "default_period")]
    period: u64,
    #[serde(default)]
    phase: i64,
}

fn default_period() -> u64 {
    1
}

impl TryFrom<ScheduleDef> for Schedule {
    type Error = UpdaterError;

    fn try_from(def: ScheduleDef) -> Result<Self> {
        Self::new(def.period, def.phase)
    }
}

impl From<Schedule> for ScheduleDef {
    fn from(schedule: Schedule) -> Self {
        Self {
            period: schedule.period,
            phase: schedule.phase,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::every_step()
    }
}

impl Schedule {
    pub fn new(period: u64, phase: i64) -> Result<Self> {
        if period == 0 {
            return Err(UpdaterError::Configuration("period must be >= 1".into()));
        }
        if phase < -1 {
            return Err(UpdaterError::Configuration(format!(
                "phase must be -1 or >= 0, got {phase}"
            )));
        }
        Ok(Self { period, phase })
    }

    pub fn every_step() -> Self {
        Self {
            period: 1,
            phase: 0,
        }
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn phase(&self) -> i64 {
        self.phase
    }

    /// First step on which an updater registered at `registered_at` fires.
    /// `None` when that step is past `u64::MAX`, i.e. never.
    pub fn first_firing(&self, registered_at: u64) -> Option<u64> {
        if self.phase < 0 {
            return Some(registered_at);
        }
        registered_at
            .div_ceil(self.period)
            .checked_mul(self.period)?
            .checked_add(self.phase as u64)
    }

    /// Whether an updater registered at `registered_at` fires on `timestep`.
    pub fn should_fire(&self, timestep: u64, registered_at: u64) -> bool {
        self.first_firing(registered_at)
            .is_some_and(|first| timestep >= first && (timestep - first) % self.period == 0)
    }
}

/// Free-function form of [`Schedule::should_fire`].
pub fn should_fire(timestep: u64, schedule: &Schedule, registered_at: u64) -> bool {
    schedule.should_fire(timestep, registered_at)
}
