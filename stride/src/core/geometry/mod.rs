pub mod ellipsoid;

pub use ellipsoid::{Ellipsoid, Projection};
