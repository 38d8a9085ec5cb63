pub mod types;
pub mod sim;

pub use types::{EntityId, Pose};
pub use sim::{Simulation, SimConfig};
