pub mod rescale_temp;
pub mod zero_momentum;

pub use rescale_temp::RescaleTemperature;
pub use zero_momentum::ZeroMomentum;
