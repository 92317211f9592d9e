use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdaterError};

/// A scalar set point that may change with the timestep.
///
/// Written in RON either as `Constant(1.2)` or as
/// `Linear([(0, 4.0), (1000000, 1.0)])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    Constant(f64),
    Linear(LinearInterp),
}

impl Variant {
    pub fn constant(value: f64) -> Self {
        Variant::Constant(value)
    }

    pub fn linear(points: Vec<(u64, f64)>) -> Result<Self> {
        LinearInterp::new(points).map(Variant::Linear)
    }

    /// Value at `timestep`.
    pub fn evaluate(&self, timestep: u64) -> f64 {
        match self {
            Variant::Constant(value) => *value,
            Variant::Linear(interp) => interp.evaluate(timestep),
        }
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Constant(value)
    }
}

/// Piecewise-linear interpolation between `(timestep, value)` control points.
///
/// Points are non-empty and non-decreasing in timestep. Outside the covered
/// range the nearest end value is held. Two points on the same timestep make
/// a step: the later one applies from that timestep on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(u64, f64)>", into = "Vec<(u64, f64)>")]
pub struct LinearInterp {
    points: Vec<(u64, f64)>,
}

impl LinearInterp {
    pub fn new(points: Vec<(u64, f64)>) -> Result<Self> {
        if points.is_empty() {
            return Err(UpdaterError::Configuration(
                "linear variant needs at least one control point".into(),
            ));
        }
        if let Some(w) = points.windows(2).find(|w| w[1].0 < w[0].0) {
            return Err(UpdaterError::Configuration(format!(
                "linear variant timesteps must be non-decreasing, found {} after {}",
                w[1].0, w[0].0
            )));
        }
        if let Some((t, v)) = points.iter().find(|(_, v)| !v.is_finite()) {
            return Err(UpdaterError::Configuration(format!(
                "linear variant has non-finite value {v} at timestep {t}"
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(u64, f64)] {
        &self.points
    }

    pub fn evaluate(&self, timestep: u64) -> f64 {
        // First control point strictly after `timestep`.
        let upper = self.points.partition_point(|&(t, _)| t <= timestep);
        if upper == 0 {
            return self.points[0].1;
        }
        if upper == self.points.len() {
            return self.points[upper - 1].1;
        }
        let (t0, v0) = self.points[upper - 1];
        let (t1, v1) = self.points[upper];
        // t1 > timestep >= t0, so the span is never zero here.
        let frac = (timestep - t0) as f64 / (t1 - t0) as f64;
        v0 + (v1 - v0) * frac
    }
}

impl TryFrom<Vec<(u64, f64)>> for LinearInterp {
    type Error = UpdaterError;

    fn try_from(points: Vec<(u64, f64)>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<LinearInterp> for Vec<(u64, f64)> {
    fn from(interp: LinearInterp) -> Self {
        interp.points
    }
}
