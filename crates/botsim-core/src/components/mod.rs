pub mod entity;
pub mod render;
pub mod controller;

pub use entity::Entity;
pub use render::{RenderMirror, RenderBackend, NullMirror, HeadlessRenderer};
pub use controller::{Controller, ControlContext};
