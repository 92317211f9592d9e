use crate::core::state::ExecutionMode;

pub mod constraint;
pub mod registry;
pub mod thermal;

pub use constraint::{ConstrainToEllipsoid, Enforce2D};
pub use registry::{ParamUpdate, Schedule, Updater, UpdaterRegistry};
pub use thermal::{RescaleTemperature, ZeroMomentum};

/// Whether per-particle kernels should run data parallel. Asking for
/// `Parallel` in a build without the `parallel` feature degrades to serial.
pub(crate) fn use_parallel(mode: ExecutionMode) -> bool {
    match mode {
        ExecutionMode::Serial => false,
        ExecutionMode::Parallel if cfg!(feature = "parallel") => true,
        ExecutionMode::Parallel => {
            tracing::warn!(
                target: "updaters",
                "parallel execution requested but the `parallel` feature is off, running serially"
            );
            false
        }
    }
}
