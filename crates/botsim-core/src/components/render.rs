//! Seam between the simulation and whatever draws it.
//!
//! The core never inspects a mirror; it only tells it when the body pose
//! changed and when frames and ticks happen.

use crate::api::types::{EntityId, Pose};
use crate::spec::EntitySpec;

/// Drawable counterpart of one entity.
pub trait RenderMirror {
    /// The body pose changed outside a physics step; re-derive the transform now.
    fn sync(&mut self, pose: Pose);

    /// Called once per rendered frame.
    fn update(&mut self, _dt_secs: f32) {}

    /// Called after every physics tick with the post-integration pose.
    fn after_physics_step(&mut self, _pose: Pose, _dt_secs: f32) {}

    /// Release drawing resources. Called once, when the entity is destroyed.
    fn destroy(&mut self) {}
}

/// The global render collection: builds mirrors and tracks which are shown.
pub trait RenderBackend {
    fn create_mirror(&mut self, id: EntityId, spec: &EntitySpec) -> Box<dyn RenderMirror>;
    fn register(&mut self, id: EntityId);
    fn unregister(&mut self, id: EntityId);
}

/// Mirror that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMirror;

impl RenderMirror for NullMirror {
    fn sync(&mut self, _pose: Pose) {}
}

/// Backend for running without a display: null mirrors, registration order kept.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    registered: Vec<EntityId>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered entities in registration order.
    pub fn registered(&self) -> &[EntityId] {
        &self.registered
    }
}

impl RenderBackend for HeadlessRenderer {
    fn create_mirror(&mut self, _id: EntityId, _spec: &EntitySpec) -> Box<dyn RenderMirror> {
        Box::new(NullMirror)
    }

    fn register(&mut self, id: EntityId) {
        if !self.registered.contains(&id) {
            self.registered.push(id);
        }
    }

    fn unregister(&mut self, id: EntityId) {
        self.registered.retain(|r| *r != id);
    }
}
