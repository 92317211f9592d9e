//! RON run files and per-updater configuration.
//!
//! The same [`UpdaterConfig`] values that build updaters are what
//! [`Updater::metadata`] hands back, so a checkpointed configuration can be
//! fed straight into a new run.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::geometry::Ellipsoid;
use crate::core::group::ParticleGroup;
use crate::core::math::Variant;
use crate::core::state::{ParticleData, SystemDefinition};
use crate::error::{Result, UpdaterError};
use crate::updaters::{
    ConstrainToEllipsoid, Enforce2D, RescaleTemperature, Schedule, Updater, ZeroMomentum,
};

/// Configuration of one updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdaterConfig {
    /// Velocity rescaling thermostat. `group` defaults to every particle.
    RescaleTemp {
        #[serde(rename = "kT", default)]
        kt: Option<Variant>,
        #[serde(default)]
        group: Option<ParticleGroup>,
        #[serde(default)]
        schedule: Schedule,
    },
    ZeroMomentum {
        #[serde(default)]
        schedule: Schedule,
    },
    Enforce2D,
    ConstraintEllipsoid(EllipsoidConfig),
}

/// Ellipsoid constraint parameters. Give either `r` for a sphere or all of
/// `rx`, `ry`, `rz`; `r` wins when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipsoidConfig {
    #[serde(default)]
    pub group: Option<ParticleGroup>,
    #[serde(rename = "P", default)]
    pub center: [f64; 3],
    #[serde(default)]
    pub r: Option<f64>,
    #[serde(default)]
    pub rx: Option<f64>,
    #[serde(default)]
    pub ry: Option<f64>,
    #[serde(default)]
    pub rz: Option<f64>,
}

impl EllipsoidConfig {
    pub fn from_parts(group: &ParticleGroup, ellipsoid: &Ellipsoid) -> Self {
        let radii = ellipsoid.radii();
        Self {
            group: Some(group.clone()),
            center: ellipsoid.center().to_array(),
            r: None,
            rx: Some(radii.x),
            ry: Some(radii.y),
            rz: Some(radii.z),
        }
    }

    pub fn ellipsoid(&self) -> Result<Ellipsoid> {
        let center = DVec3::from_array(self.center);
        if let Some(r) = self.r {
            return Ellipsoid::sphere(center, r);
        }
        match (self.rx, self.ry, self.rz) {
            (None, None, None) => Err(UpdaterError::MissingParameter(
                "no radii were defined for constraint_ellipsoid".into(),
            )),
            (Some(rx), Some(ry), Some(rz)) => Ellipsoid::new(center, rx, ry, rz),
            (rx, ry, rz) => {
                let missing: Vec<&str> = [("rx", rx), ("ry", ry), ("rz", rz)]
                    .iter()
                    .filter(|(_, v)| v.is_none())
                    .map(|(name, _)| *name)
                    .collect();
                Err(UpdaterError::MissingParameter(format!(
                    "constraint_ellipsoid is missing {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

impl UpdaterConfig {
    /// Builds the updater for `sysdef`. Every required parameter is checked
    /// here, before the updater can run.
    pub fn build(&self, sysdef: &SystemDefinition) -> Result<Box<dyn Updater>> {
        let updater: Box<dyn Updater> = match self {
            UpdaterConfig::RescaleTemp {
                kt,
                group,
                schedule,
            } => {
                let kt = kt.clone().ok_or_else(|| {
                    UpdaterError::MissingParameter("rescale_temp needs a kT set point".into())
                })?;
                let group = group.clone().unwrap_or_else(ParticleGroup::all);
                Box::new(RescaleTemperature::new(sysdef, group, kt, *schedule)?)
            }
            UpdaterConfig::ZeroMomentum { schedule } => Box::new(ZeroMomentum::new(*schedule)),
            UpdaterConfig::Enforce2D => Box::new(Enforce2D::new(sysdef)?),
            UpdaterConfig::ConstraintEllipsoid(config) => {
                let group = config.group.clone().ok_or_else(|| {
                    UpdaterError::MissingParameter("constraint_ellipsoid needs a group".into())
                })?;
                let ellipsoid = config.ellipsoid()?;
                Box::new(ConstrainToEllipsoid::new(sysdef, group, ellipsoid)?)
            }
        };
        Ok(updater)
    }
}

/// An updater with the name it is registered under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUpdater {
    pub name: String,
    pub config: UpdaterConfig,
}

/// One particle of an explicit particle list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleConfig {
    pub pos: [f64; 3],
    #[serde(default)]
    pub vel: [f64; 3],
    #[serde(default = "unit_mass")]
    pub mass: f64,
    #[serde(default)]
    pub inertia: [f64; 3],
    #[serde(default)]
    pub ang_mom: [f64; 3],
}

fn unit_mass() -> f64 {
    1.0
}

/// Initial particle layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParticleSpec {
    Explicit(Vec<ParticleConfig>),
    /// `count` unit-mass particles on a square (2D) or cubic (3D) lattice
    /// centred on the origin, with a deterministic spread of velocities of
    /// magnitude up to `speed`.
    Lattice { count: usize, spacing: f64, speed: f64 },
}

impl ParticleSpec {
    pub fn build(&self, sysdef: &SystemDefinition) -> Result<ParticleData> {
        let mut pdata = ParticleData::default();
        match self {
            ParticleSpec::Explicit(particles) => {
                for p in particles {
                    let i = pdata.push(
                        DVec3::from_array(p.pos),
                        DVec3::from_array(p.vel),
                        p.mass,
                    );
                    pdata.inertia[i] = DVec3::from_array(p.inertia);
                    pdata.ang_mom[i] = DVec3::from_array(p.ang_mom);
                }
            }
            ParticleSpec::Lattice {
                count,
                spacing,
                speed,
            } => {
                let d = sysdef.dimensions;
                let side = (*count as f64).powf(1.0 / d as f64).ceil().max(1.0) as usize;
                let half = (side as f64 - 1.0) * spacing / 2.0;
                for i in 0..*count {
                    let col = i % side;
                    let row = (i / side) % side;
                    let layer = if d == 3 { i / (side * side) } else { 0 };
                    let pos = DVec3::new(
                        col as f64 * spacing - half,
                        row as f64 * spacing - half,
                        if d == 3 { layer as f64 * spacing - half } else { 0.0 },
                    );
                    // Golden-angle directions give an even, reproducible spread.
                    let theta = i as f64 * 2.399_963_229_728_653;
                    let z = if d == 3 { ((i % 7) as f64 / 3.0) - 1.0 } else { 0.0 };
                    let vel = DVec3::new(theta.cos(), theta.sin(), z)
                        * speed
                        * ((i % 5) as f64 + 1.0)
                        / 5.0;
                    pdata.push(pos, vel, 1.0);
                }
            }
        }
        pdata.validate()?;
        Ok(pdata)
    }
}

/// A complete run: system, initial particles and updaters in registration
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub system: SystemDefinition,
    pub particles: ParticleSpec,
    #[serde(default)]
    pub updaters: Vec<NamedUpdater>,
    pub steps: u64,
    #[serde(default = "default_dt")]
    pub dt: f64,
}

fn default_dt() -> f64 {
    0.005
}

impl RunConfig {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: RunConfig = ron::from_str(source)?;
        config.system.validate()?;
        if !(config.dt.is_finite() && config.dt > 0.0) {
            return Err(UpdaterError::Configuration(format!(
                "dt must be finite and > 0, got {}",
                config.dt
            )));
        }
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}
