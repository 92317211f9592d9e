use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdaterError};

/// Per-particle state of the system.
///
/// We use a Structure-of-Arrays (SoA) layout. Instead of a `Vec<Particle>`
/// we keep one `Vec` per field, all indexed by particle tag.
///
/// Updaters iterate over one or two fields at a time (velocity only for
/// Enforce2D, position and velocity for the ellipsoid constraint), so this
/// keeps their loops cache friendly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleData {
    /// Positions.
    pub pos: Vec<DVec3>,

    /// Velocities.
    pub vel: Vec<DVec3>,

    /// Accelerations left by the last force evaluation.
    pub accel: Vec<DVec3>,

    /// Angular momenta in the body frame.
    /// Only meaningful for particles with a nonzero moment of inertia.
    pub ang_mom: Vec<DVec3>,

    /// Masses. Must be finite and > 0.
    pub mass: Vec<f64>,

    /// Principal moments of inertia. Zero components mark axes that carry
    /// no rotational degree of freedom (point particles are all zero).
    pub inertia: Vec<DVec3>,
}

impl ParticleData {
    /// `n` point particles of unit mass at rest at the origin.
    pub fn new(n: usize) -> Self {
        Self {
            pos: vec![DVec3::ZERO; n],
            vel: vec![DVec3::ZERO; n],
            accel: vec![DVec3::ZERO; n],
            ang_mom: vec![DVec3::ZERO; n],
            mass: vec![1.0; n],
            inertia: vec![DVec3::ZERO; n],
        }
    }

    pub fn len(&self) -> usize {
        self.pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos.is_empty()
    }

    /// Append a point particle and return its tag.
    pub fn push(&mut self, pos: DVec3, vel: DVec3, mass: f64) -> usize {
        self.pos.push(pos);
        self.vel.push(vel);
        self.accel.push(DVec3::ZERO);
        self.ang_mom.push(DVec3::ZERO);
        self.mass.push(mass);
        self.inertia.push(DVec3::ZERO);
        self.pos.len() - 1
    }

    /// Resize the state container. New particles are unit-mass points at rest.
    pub fn resize(&mut self, n: usize) {
        self.pos.resize(n, DVec3::ZERO);
        self.vel.resize(n, DVec3::ZERO);
        self.accel.resize(n, DVec3::ZERO);
        self.ang_mom.resize(n, DVec3::ZERO);
        self.mass.resize(n, 1.0);
        self.inertia.resize(n, DVec3::ZERO);
    }

    /// Checks that every array has the same length and every mass is
    /// finite and positive.
    pub fn validate(&self) -> Result<()> {
        let n = self.pos.len();
        let lengths = [
            self.vel.len(),
            self.accel.len(),
            self.ang_mom.len(),
            self.mass.len(),
            self.inertia.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(UpdaterError::Configuration(format!(
                "particle arrays disagree in length: pos has {n}, others have {lengths:?}"
            )));
        }
        if let Some((i, m)) = self
            .mass
            .iter()
            .enumerate()
            .find(|(_, m)| !(m.is_finite() && **m > 0.0))
        {
            return Err(UpdaterError::Configuration(format!(
                "particle {i} has invalid mass {m}"
            )));
        }
        Ok(())
    }

    /// Total linear momentum and total mass over all particles.
    pub fn momentum(&self) -> (DVec3, f64) {
        self.vel
            .iter()
            .zip(&self.mass)
            .fold((DVec3::ZERO, 0.0), |(p, m_total), (v, &m)| {
                (p + *v * m, m_total + m)
            })
    }
}

/// Spatial domain decomposition across processes.
///
/// The decomposition itself lives outside this crate. Its presence is what
/// matters here: some updaters need every group member on one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDecomposition {
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
}

impl DomainDecomposition {
    pub fn ranks(&self) -> u32 {
        self.nx * self.ny * self.nz
    }
}

/// How per-particle loops are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    #[default]
    Serial,
    /// Data parallel over particles (rayon). Falls back to serial when the
    /// `parallel` feature is disabled.
    Parallel,
}

/// Facts about the run that are fixed when the simulation is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDefinition {
    pub dimensions: u32,
    #[serde(default)]
    pub decomposition: Option<DomainDecomposition>,
    #[serde(default)]
    pub execution: ExecutionMode,
}

impl SystemDefinition {
    pub fn new(dimensions: u32) -> Result<Self> {
        let sysdef = Self {
            dimensions,
            decomposition: None,
            execution: ExecutionMode::Serial,
        };
        sysdef.validate()?;
        Ok(sysdef)
    }

    pub fn with_decomposition(mut self, decomposition: DomainDecomposition) -> Self {
        self.decomposition = Some(decomposition);
        self
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dimensions == 2 || self.dimensions == 3) {
            return Err(UpdaterError::Configuration(format!(
                "dimensions must be 2 or 3, got {}",
                self.dimensions
            )));
        }
        Ok(())
    }

    /// True when particles are split across more than one rank.
    pub fn is_decomposed(&self) -> bool {
        self.decomposition.is_some_and(|d| d.ranks() > 1)
    }
}
