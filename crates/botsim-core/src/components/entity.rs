use glam::Vec2;

use crate::api::types::{EntityId, Pose};
use crate::components::controller::{ControlContext, Controller};
use crate::components::render::RenderMirror;
use crate::core::joint::JointHandle;
use crate::core::object::PhysicsObject;
use crate::core::physics::PhysicsWorld;
use crate::core::scene::Container;

/// One simulated object: a rigid body, its render mirror, and the ids of the
/// child entities it owns.
///
/// The parent link is a plain id used for lookups; ownership only flows
/// downward through `children`.
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// Label copied from the spec, for lookups.
    pub label: Option<String>,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Container,
    /// Joint to the parent, if the engine accepted one.
    pub(crate) joint: Option<JointHandle>,
    physics: PhysicsObject,
    render: Box<dyn RenderMirror>,
    controller: Option<Box<dyn Controller>>,
}

impl Entity {
    pub fn new(id: EntityId, physics: PhysicsObject, render: Box<dyn RenderMirror>) -> Self {
        Self {
            id,
            label: None,
            parent: None,
            children: Container::new(),
            joint: None,
            physics,
            render,
            controller: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        self.children.children()
    }

    pub fn joint(&self) -> Option<JointHandle> {
        self.joint
    }

    pub fn physics(&self) -> &PhysicsObject {
        &self.physics
    }

    pub(crate) fn physics_mut(&mut self) -> &mut PhysicsObject {
        &mut self.physics
    }

    pub fn set_controller(&mut self, controller: Box<dyn Controller>) {
        self.controller = Some(controller);
    }

    // -- Pose --

    pub fn pose(&self, world: &PhysicsWorld) -> Pose {
        Pose::new(self.physics.position(world), self.physics.angle(world))
    }

    pub fn position(&self, world: &PhysicsWorld) -> Vec2 {
        self.physics.position(world)
    }

    pub fn angle(&self, world: &PhysicsWorld) -> f32 {
        self.physics.angle(world)
    }

    /// Move the body and resync the mirror before returning.
    pub fn set_position(&mut self, world: &mut PhysicsWorld, pos: Vec2) {
        self.physics.set_position(world, pos);
        self.sync(world);
    }

    /// Rotate the body and resync the mirror before returning.
    pub fn set_angle(&mut self, world: &mut PhysicsWorld, angle: f32) {
        self.physics.set_angle(world, angle);
        self.sync(world);
    }

    pub(crate) fn sync(&mut self, world: &PhysicsWorld) {
        let pose = self.pose(world);
        self.render.sync(pose);
    }

    pub fn apply_force(&self, world: &mut PhysicsWorld, force: Vec2, point: Option<Vec2>) {
        self.physics.apply_force(world, force, point);
    }

    pub fn apply_impulse(&self, world: &mut PhysicsWorld, impulse: Vec2, point: Option<Vec2>) {
        self.physics.apply_impulse(world, impulse, point);
    }

    // -- Lifecycle hooks (this entity only; the simulation walks children) --

    pub(crate) fn before_physics_step(&mut self, world: &mut PhysicsWorld, dt_secs: f32) {
        if let Some(controller) = self.controller.as_mut() {
            let mut ctx = ControlContext {
                id: self.id,
                physics: &mut self.physics,
                world,
            };
            controller.before_physics_step(&mut ctx, dt_secs);
        }
    }

    pub(crate) fn after_physics_step(&mut self, world: &mut PhysicsWorld, dt_secs: f32) {
        if let Some(controller) = self.controller.as_mut() {
            let mut ctx = ControlContext {
                id: self.id,
                physics: &mut self.physics,
                world: &mut *world,
            };
            controller.after_physics_step(&mut ctx, dt_secs);
        }
        let pose = self.pose(world);
        self.render.after_physics_step(pose, dt_secs);
    }

    pub(crate) fn update(&mut self, world: &mut PhysicsWorld, dt_secs: f32) {
        self.render.update(dt_secs);
        if let Some(controller) = self.controller.as_mut() {
            let mut ctx = ControlContext {
                id: self.id,
                physics: &mut self.physics,
                world,
            };
            controller.update(&mut ctx, dt_secs);
        }
    }

    /// Release the mirror and remove the body from the world.
    pub(crate) fn destroy(mut self, world: &mut PhysicsWorld) {
        self.render.destroy();
        self.physics.destroy(world);
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("body", &self.physics.body())
            .finish()
    }
}
