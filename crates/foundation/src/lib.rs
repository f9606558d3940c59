pub mod bounds;
pub mod geo;
pub mod mercator;

// Foundation crate: small, well-tested geographic primitives only.
pub use bounds::*;
pub use geo::*;
pub use mercator::*;
