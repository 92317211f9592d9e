pub mod variant;

pub use variant::{LinearInterp, Variant};
