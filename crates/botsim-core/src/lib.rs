pub mod api;
pub mod core;
pub mod components;
pub mod spec;
pub mod error;

// Re-export key types at crate root for convenience
pub use api::sim::{Simulation, SimConfig};
pub use api::types::{EntityId, Pose};
pub use components::entity::Entity;
pub use components::controller::{Controller, ControlContext};
pub use components::render::{RenderMirror, RenderBackend, HeadlessRenderer, NullMirror};
pub use core::physics::{PhysicsWorld, BodyDesc, BodyType};
pub use core::object::{PhysicsObject, AuxJoint};
pub use core::joint::JointHandle;
pub use core::scene::Container;
pub use core::time::{Stepper, StepTarget};
pub use error::{Result, SimError};
pub use spec::{
    EntitySpec, BodyKind, BodyPhysicsSpec, JointKind, JointSpec,
    EntityShapeSpec, ShapeKind, ShapePhysicsSpec, FixtureMaterial,
};
