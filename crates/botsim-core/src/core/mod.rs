// core/mod.rs
//
// Unit conversion, shape and body compilation, joints and the fixed-step loop.
// Everything here talks to rapier through PhysicsWorld.

pub mod units;
pub mod physics;
pub mod shape;
pub mod body;
pub mod joint;
pub mod object;
pub mod scene;
pub mod time;

pub use physics::{PhysicsWorld, BodyDesc, BodyType};
pub use shape::{ShapeGeometry, compile_shape, shape_geometry};
pub use body::build_body;
pub use joint::JointHandle;
pub use object::{PhysicsObject, AuxJoint};
pub use scene::Container;
pub use time::{Stepper, StepTarget};
