pub mod ellipsoid;
pub mod enforce2d;

pub use ellipsoid::ConstrainToEllipsoid;
pub use enforce2d::Enforce2D;
