pub mod config;
pub mod map;
pub mod metrics;
pub mod multiplier;
pub mod render;
pub mod scheduler;
pub mod state;

pub use config::*;
pub use map::*;
pub use metrics::*;
pub use multiplier::*;
pub use render::*;
pub use scheduler::*;
pub use state::*;
