// Particle updaters: scheduled state mutations run between integrator steps.
pub mod core {
    pub mod geometry;
    pub mod group;
    pub mod math;
    pub mod solve;
    pub mod state;
}

pub mod investigation {
    pub mod thermo;
}

pub mod updaters;

pub mod config;
pub mod error;
pub mod simulation;

pub use error::{Result, UpdaterError};
